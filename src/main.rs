use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use serenity_relay::api::ApiServerBuilder;
use serenity_relay::{Config, RelayClient, SubmitTurn, TurnOrchestrator, language, providers};

/// Serenity - a supportive voice companion relay
#[derive(Parser)]
#[command(name = "serenity", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay server (default)
    Serve {
        /// Port to listen on
        #[arg(long, env = "SERENITY_PORT")]
        port: Option<u16>,

        /// Directory with a web UI to serve
        #[arg(long, env = "SERENITY_STATIC_DIR")]
        static_dir: Option<PathBuf>,
    },
    /// Talk to a relay through the microphone
    Talk {
        /// Relay server URL
        #[arg(long, env = "SERENITY_SERVER_URL")]
        server: Option<String>,

        /// Language to speak (e.g. hi-IN)
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Send one typed message to a relay
    Ask {
        /// What to say
        text: String,

        /// Relay server URL
        #[arg(long, env = "SERENITY_SERVER_URL")]
        server: Option<String>,

        /// Language of the reply (e.g. en-IN)
        #[arg(short, long)]
        language: Option<String>,

        /// Write the spoken reply (WAV) to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// List supported languages
    Languages,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,serenity_relay=info",
        1 => "info,serenity_relay=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = cli.command.unwrap_or(Command::Serve {
        port: None,
        static_dir: None,
    });

    match command {
        Command::Serve { port, static_dir } => serve(port, static_dir).await,
        Command::Talk { server, language } => talk(server, language).await,
        Command::Ask {
            text,
            server,
            language,
            save,
        } => ask(&text, server, language, save).await,
        Command::Languages => {
            for lang in language::LANGUAGES {
                println!("{:<6} {}", lang.code, lang.name);
            }
            Ok(())
        }
    }
}

/// Run the relay server until interrupted
async fn serve(port: Option<u16>, static_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let config = Config::load();
    tracing::debug!(?config, "loaded configuration");

    let port = port.unwrap_or(config.api_server.port);
    let static_dir = static_dir.or_else(|| config.api_server.static_dir.clone());

    tracing::info!(port, "starting serenity relay");

    let orchestrator = TurnOrchestrator::from_config(&config)?;
    ApiServerBuilder::new(orchestrator, port)
        .static_dir(static_dir)
        .build()
        .run()
        .await?;

    Ok(())
}

/// Resolve the relay URL and language for client commands
fn client_settings(
    config: &Config,
    server: Option<String>,
    language: Option<String>,
) -> anyhow::Result<(String, String)> {
    let server = server.unwrap_or_else(|| config.client.server_url.clone());
    let language = language.unwrap_or_else(|| config.client.language.clone());

    let Some(lang) = language::find(&language) else {
        anyhow::bail!("unsupported language: {language} (see `serenity languages`)");
    };

    Ok((server, lang.code.to_string()))
}

/// Submit a single text turn
async fn ask(
    text: &str,
    server: Option<String>,
    language: Option<String>,
    save: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = Config::load();
    let (server, language) = client_settings(&config, server, language)?;

    let client = RelayClient::new(providers::http_client(config.http_timeout)?, &server);
    let reply = client.submit_text(text, &language).await?;

    println!("you: {}", reply.user_text);
    println!("serenity: {}", reply.agent_text);

    match (reply.audio, save) {
        (Some(audio), Some(path)) => {
            tokio::fs::write(&path, &audio).await?;
            println!("(spoken reply saved to {})", path.display());
        }
        (None, Some(_)) => println!("(no spoken reply this time)"),
        _ => {}
    }

    Ok(())
}

#[cfg(not(feature = "audio"))]
#[allow(clippy::unused_async)]
async fn talk(_server: Option<String>, _language: Option<String>) -> anyhow::Result<()> {
    anyhow::bail!("this build has no audio support; rebuild with `--features audio`")
}

/// Interactive microphone session
#[cfg(feature = "audio")]
#[allow(clippy::future_not_send)]
async fn talk(server: Option<String>, language: Option<String>) -> anyhow::Result<()> {
    use serenity_relay::session::{SessionController, StopSignal};
    use serenity_relay::voice::{AudioCapture, AudioPlayback};
    use tokio::io::{AsyncBufReadExt, BufReader};

    let config = Config::load();
    let (server, language) = client_settings(&config, server, language)?;

    let client = RelayClient::new(providers::http_client(config.http_timeout)?, &server);
    let mut session = SessionController::new(client, AudioCapture::new()?, AudioPlayback::new()?);
    session.select_language(&language)?;

    println!("Connected to {server} ({language})");
    println!("Enter: start recording, Enter again: send, c + Enter: cancel");
    println!("Type a message to send it as text, /lang <code> to switch, /quit to leave\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();

        let outcome = match line {
            "/quit" => break,
            "" => {
                println!("recording... (up to 25 s)");
                let stop = async {
                    match lines.next_line().await {
                        Ok(Some(l)) if l.trim() == "c" => StopSignal::Cancel,
                        Ok(Some(_)) => StopSignal::Submit,
                        _ => StopSignal::Cancel,
                    }
                };
                session.record_turn(stop).await
            }
            cmd if cmd.starts_with("/lang") => {
                let code = cmd.trim_start_matches("/lang").trim();
                match session.select_language(code) {
                    Ok(()) => println!("language: {}", session.language()),
                    Err(e) => println!("! {e}"),
                }
                continue;
            }
            text => session.submit_text(text).await.map(Some),
        };

        match outcome {
            Ok(Some(reply)) => {
                println!("you: {}", reply.user_text);
                println!("serenity: {}\n", reply.agent_text);
            }
            Ok(None) => println!("cancelled\n"),
            Err(e) => {
                println!("! {e}\n");
                if session.state() == serenity_relay::SessionState::Error {
                    session.acknowledge()?;
                }
            }
        }

        if let Some(notice) = session.take_notice() {
            println!("({notice})\n");
        }
    }

    Ok(())
}
