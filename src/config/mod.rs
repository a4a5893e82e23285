//! Configuration management for the Serenity relay
//!
//! Values resolve as env > TOML file > default.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::language::{self, CLIENT_DEFAULT_LANGUAGE, DEFAULT_LANGUAGE};

use self::file::RelayConfigFile;

/// Default Sarvam API base URL (transcription and synthesis)
pub const DEFAULT_SARVAM_BASE_URL: &str = "https://api.sarvam.ai";

/// Default Groq OpenAI-compatible API base URL
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default transcription model
pub const DEFAULT_STT_MODEL: &str = "saarika:v2.5";

/// Default completion model
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";

/// Default synthesis speaker
pub const DEFAULT_TTS_SPEAKER: &str = "anushka";

/// Sampling temperature balancing coherence against variation
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Reply length cap; keeps spoken answers short
pub const DEFAULT_MAX_TOKENS: u32 = 150;

/// Default API server port
pub const DEFAULT_PORT: u16 = 3000;

/// Default overall timeout for upstream HTTP requests
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Relay configuration
#[derive(Debug)]
pub struct Config {
    /// HTTP API server configuration
    pub api_server: ApiServerConfig,

    /// Upstream credentials
    pub api_keys: ApiKeys,

    /// Transcription and synthesis configuration
    pub speech: SpeechConfig,

    /// Completion configuration
    pub llm: LlmConfig,

    /// Interactive client configuration
    pub client: ClientConfig,

    /// Overall timeout applied to every upstream HTTP request
    pub http_timeout: Duration,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,
}

/// API keys for upstream services
///
/// Either key may be absent at startup; requests fail fast until both are set.
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// Sarvam subscription key (transcription and synthesis)
    pub sarvam: Option<SecretString>,

    /// Groq API key (completion)
    pub groq: Option<SecretString>,
}

impl ApiKeys {
    /// Names of the env vars whose keys are missing
    #[must_use]
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.sarvam.is_none() {
            missing.push("SARVAM_API_KEY");
        }
        if self.groq.is_none() {
            missing.push("GROQ_API_KEY");
        }
        missing
    }
}

/// Transcription and synthesis configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Speech API base URL
    pub base_url: String,

    /// Transcription model
    pub stt_model: String,

    /// Synthesis speaker voice
    pub tts_speaker: String,

    /// Locale assumed when none is detected or requested
    pub default_language: String,
}

/// Completion configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum reply length in tokens
    pub max_tokens: u32,
}

/// Interactive client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay server URL
    pub server_url: String,

    /// Initially selected language
    pub language: String,
}

impl Config {
    /// Load configuration from the environment and the standard TOML file
    #[must_use]
    pub fn load() -> Self {
        Self::from_sources(|key| std::env::var(key).ok(), file::load_config_file())
    }

    /// Resolve configuration from an env lookup and a parsed config file
    ///
    /// Blank env values count as unset.
    pub fn from_sources<F>(lookup: F, fc: RelayConfigFile) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_keys = ApiKeys {
            sarvam: env("SARVAM_API_KEY")
                .or(fc.api_keys.sarvam)
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from),
            groq: env("GROQ_API_KEY")
                .or(fc.api_keys.groq)
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from),
        };

        let port = env("SERENITY_PORT")
            .or_else(|| env("PORT"))
            .and_then(|s| s.parse().ok())
            .or(fc.server.port)
            .unwrap_or(DEFAULT_PORT);
        let api_server = ApiServerConfig {
            port,
            static_dir: env("SERENITY_STATIC_DIR")
                .or(fc.server.static_dir)
                .map(PathBuf::from),
        };

        let default_language = env("SERENITY_DEFAULT_LANGUAGE")
            .or(fc.speech.default_language)
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        if !language::is_supported(&default_language) {
            tracing::warn!(
                language = %default_language,
                "default language is not in the supported list"
            );
        }

        let speech = SpeechConfig {
            base_url: trim_base_url(
                env("SARVAM_BASE_URL")
                    .or(fc.speech.base_url)
                    .unwrap_or_else(|| DEFAULT_SARVAM_BASE_URL.to_string()),
            ),
            stt_model: env("SERENITY_STT_MODEL")
                .or(fc.speech.stt_model)
                .unwrap_or_else(|| DEFAULT_STT_MODEL.to_string()),
            tts_speaker: env("SERENITY_TTS_SPEAKER")
                .or(fc.speech.tts_speaker)
                .unwrap_or_else(|| DEFAULT_TTS_SPEAKER.to_string()),
            default_language,
        };

        let llm = LlmConfig {
            base_url: trim_base_url(
                env("GROQ_BASE_URL")
                    .or(fc.llm.base_url)
                    .unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string()),
            ),
            model: env("SERENITY_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            temperature: fc.llm.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: fc.llm.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        };

        let client = ClientConfig {
            server_url: trim_base_url(
                env("SERENITY_SERVER_URL")
                    .or(fc.client.server_url)
                    .unwrap_or_else(|| format!("http://localhost:{port}")),
            ),
            language: fc
                .client
                .language
                .unwrap_or_else(|| CLIENT_DEFAULT_LANGUAGE.to_string()),
        };

        let http_timeout = Duration::from_secs(
            env("SERENITY_HTTP_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .or(fc.server.http_timeout_secs)
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        );

        Self {
            api_server,
            api_keys,
            speech,
            llm,
            client,
            http_timeout,
        }
    }
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(env_from(&[]), RelayConfigFile::default());

        assert_eq!(config.api_server.port, DEFAULT_PORT);
        assert_eq!(config.speech.stt_model, "saarika:v2.5");
        assert_eq!(config.speech.tts_speaker, "anushka");
        assert_eq!(config.speech.default_language, "en-IN");
        assert_eq!(config.llm.model, "llama-3.3-70b-versatile");
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.llm.max_tokens, 150);
        assert_eq!(config.client.language, "hi-IN");
        assert_eq!(config.client.server_url, "http://localhost:3000");
        assert_eq!(
            config.api_keys.missing(),
            vec!["SARVAM_API_KEY", "GROQ_API_KEY"]
        );
    }

    #[test]
    fn test_env_overrides_file() {
        let fc: RelayConfigFile = toml::from_str(
            r#"
            [server]
            port = 4000

            [api_keys]
            sarvam = "from-file"
            groq = "groq-file"

            [llm]
            model = "file-model"
            "#,
        )
        .unwrap();

        let config = Config::from_sources(
            env_from(&[
                ("SARVAM_API_KEY", "from-env"),
                ("SERENITY_PORT", "5000"),
                ("GROQ_BASE_URL", "http://127.0.0.1:9999/"),
            ]),
            fc,
        );

        assert_eq!(config.api_server.port, 5000);
        assert_eq!(config.llm.model, "file-model");
        assert_eq!(config.llm.base_url, "http://127.0.0.1:9999");
        let sarvam = config.api_keys.sarvam.as_ref().unwrap();
        assert_eq!(sarvam.expose_secret(), "from-env");
        assert!(config.api_keys.missing().is_empty());
    }

    #[test]
    fn test_blank_keys_count_as_missing() {
        let config = Config::from_sources(
            env_from(&[("SARVAM_API_KEY", "  "), ("GROQ_API_KEY", "gsk_test")]),
            RelayConfigFile::default(),
        );

        assert_eq!(config.api_keys.missing(), vec!["SARVAM_API_KEY"]);
    }
}
