//! Conversational turn orchestration
//!
//! One turn is a straight chain of awaits:
//!
//! ```text
//! audio? ──► Transcribe ──► user text ──► Complete ──► reply ──► Synthesize ──► audio?
//! text? ───────────────────────┘
//! ```
//!
//! Transcription and completion failures end the turn. Synthesis failures
//! only cost the turn its audio: text always wins over audio.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::config::Config;
use crate::language;
use crate::persona::Persona;
use crate::providers::{
    self, AudioInput, Complete, CompletionError, GroqChat, SarvamSynthesizer, SarvamTranscriber,
    Synthesize, Transcribe, TranscriptionError,
};

/// Input for one turn
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    /// Recorded speech; takes precedence over `text` when present
    pub audio: Option<AudioInput>,

    /// Typed input, used when no audio was supplied
    pub text: Option<String>,

    /// Language the caller expects to speak
    pub preferred_language: Option<String>,
}

impl TurnRequest {
    /// A turn driven by recorded speech
    #[must_use]
    pub fn from_audio(audio: AudioInput) -> Self {
        Self {
            audio: Some(audio),
            ..Self::default()
        }
    }

    /// A turn driven by typed text
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Attach a language hint
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.preferred_language = Some(language.into());
        self
    }

    const fn input_kind(&self) -> &'static str {
        if self.audio.is_some() { "audio" } else { "text" }
    }
}

/// Outcome of a completed turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnResult {
    /// What the user said or typed
    pub user_text: String,

    /// The assistant's reply
    pub agent_text: String,

    /// Encoded spoken reply; `None` when synthesis failed or produced nothing
    pub audio: Option<Vec<u8>>,

    /// Language the reply was synthesized in
    pub language: String,
}

/// Reasons a turn can fail
#[derive(Debug, Error)]
pub enum TurnError {
    /// Upstream credentials are not configured
    #[error("API keys not configured: {}", .0.join(", "))]
    Configuration(Vec<&'static str>),

    /// Neither audio nor text produced usable input
    #[error("no input provided")]
    InputMissing,

    /// Speech could not be transcribed
    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    /// No reply could be generated
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

/// The three upstream capabilities a configured orchestrator holds
#[derive(Clone)]
pub struct Upstreams {
    pub transcriber: Arc<dyn Transcribe>,
    pub completer: Arc<dyn Complete>,
    pub synthesizer: Arc<dyn Synthesize>,
}

#[derive(Clone)]
enum Backends {
    Ready(Upstreams),
    Unconfigured(Vec<&'static str>),
}

/// Sequences transcription, completion and synthesis for one turn
#[derive(Clone)]
pub struct TurnOrchestrator {
    backends: Backends,
    persona: Persona,
    default_language: String,
}

impl TurnOrchestrator {
    /// Create an orchestrator over the given upstreams
    #[must_use]
    pub fn new(upstreams: Upstreams) -> Self {
        Self {
            backends: Backends::Ready(upstreams),
            persona: Persona::serenity(),
            default_language: language::DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Create an orchestrator that rejects every turn for missing credentials
    #[must_use]
    pub fn unconfigured(missing: Vec<&'static str>) -> Self {
        Self {
            backends: Backends::Unconfigured(missing),
            persona: Persona::serenity(),
            default_language: language::DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Build the production orchestrator (Sarvam + Groq) from configuration
    ///
    /// Missing credentials do not fail startup; they fail each turn instead.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let orchestrator = match (&config.api_keys.sarvam, &config.api_keys.groq) {
            (Some(sarvam_key), Some(groq_key)) => {
                let client = providers::http_client(config.http_timeout)?;
                let transcriber = SarvamTranscriber::new(
                    client.clone(),
                    config.speech.base_url.clone(),
                    SecretString::from(sarvam_key.expose_secret().to_owned()),
                    config.speech.stt_model.clone(),
                );
                let synthesizer = SarvamSynthesizer::new(
                    client.clone(),
                    config.speech.base_url.clone(),
                    SecretString::from(sarvam_key.expose_secret().to_owned()),
                    config.speech.tts_speaker.clone(),
                );
                let completer = GroqChat::new(
                    client,
                    SecretString::from(groq_key.expose_secret().to_owned()),
                    &config.llm,
                );

                Self::new(Upstreams {
                    transcriber: Arc::new(transcriber),
                    completer: Arc::new(completer),
                    synthesizer: Arc::new(synthesizer),
                })
            }
            _ => {
                let missing = config.api_keys.missing();
                tracing::warn!(
                    missing = ?missing,
                    "upstream API keys missing, turns will be rejected"
                );
                Self::unconfigured(missing)
            }
        };

        Ok(orchestrator.with_default_language(config.speech.default_language.clone()))
    }

    /// Override the language assumed when none is detected or requested
    #[must_use]
    pub fn with_default_language(mut self, language: String) -> Self {
        self.default_language = language;
        self
    }

    /// Whether upstream credentials are configured
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        matches!(self.backends, Backends::Ready(_))
    }

    /// Names of missing credentials (empty when configured)
    #[must_use]
    pub fn missing_credentials(&self) -> &[&'static str] {
        match &self.backends {
            Backends::Ready(_) => &[],
            Backends::Unconfigured(missing) => missing,
        }
    }

    /// Run one turn
    ///
    /// # Errors
    ///
    /// - [`TurnError::Configuration`] before any upstream call when credentials are missing
    /// - [`TurnError::Transcription`] when the audio cannot be transcribed
    /// - [`TurnError::InputMissing`] when no non-blank text results
    /// - [`TurnError::Completion`] when no reply can be generated
    pub async fn run(&self, request: TurnRequest) -> Result<TurnResult, TurnError> {
        let upstreams = match &self.backends {
            Backends::Ready(upstreams) => upstreams,
            Backends::Unconfigured(missing) => {
                tracing::error!(missing = ?missing, "API keys not configured");
                return Err(TurnError::Configuration(missing.clone()));
            }
        };

        let turn_id = uuid::Uuid::new_v4();
        let input = request.input_kind();
        tracing::info!(%turn_id, input, persona = %self.persona.name, "turn started");

        let hint = language::normalize_hint(request.preferred_language.as_deref());

        let (user_text, language) = match request.audio {
            Some(audio) => {
                let transcript = upstreams.transcriber.transcribe(&audio).await?;
                let language = transcript.language_code.or(hint).unwrap_or_else(|| {
                    tracing::debug!(%turn_id, "no language detected, using default");
                    self.default_language.clone()
                });
                (transcript.text, language)
            }
            None => (
                request.text.unwrap_or_default(),
                hint.unwrap_or_else(|| self.default_language.clone()),
            ),
        };

        if user_text.trim().is_empty() {
            tracing::info!(%turn_id, input, "turn has no usable input");
            return Err(TurnError::InputMissing);
        }

        let agent_text = upstreams
            .completer
            .complete(&self.persona.system_prompt, &user_text)
            .await?
            .unwrap_or_else(|| {
                tracing::warn!(%turn_id, "completion had no content, using fallback reply");
                self.persona.fallback_reply.clone()
            });

        let audio = match upstreams.synthesizer.synthesize(&agent_text, &language).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!(%turn_id, error = %e, "synthesis failed, replying with text only");
                None
            }
        };

        tracing::info!(
            %turn_id,
            language = %language,
            has_audio = audio.is_some(),
            "turn complete"
        );

        Ok(TurnResult {
            user_text,
            agent_text,
            audio,
            language,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::providers::{SynthesisError, Transcript};

    #[derive(Default)]
    struct Calls {
        transcribe: Mutex<usize>,
        complete: Mutex<Vec<(String, String)>>,
        synthesize: Mutex<Vec<(String, String)>>,
    }

    struct FixedStt(Arc<Calls>, Option<&'static str>);

    #[async_trait]
    impl Transcribe for FixedStt {
        async fn transcribe(&self, _audio: &AudioInput) -> Result<Transcript, TranscriptionError> {
            *self.0.transcribe.lock().unwrap() += 1;
            Ok(Transcript {
                text: "  spaced out  ".to_string(),
                language_code: self.1.map(str::to_string),
            })
        }
    }

    struct EchoLlm(Arc<Calls>, bool);

    #[async_trait]
    impl Complete for EchoLlm {
        async fn complete(
            &self,
            system_prompt: &str,
            user_message: &str,
        ) -> Result<Option<String>, CompletionError> {
            self.0
                .complete
                .lock()
                .unwrap()
                .push((system_prompt.to_string(), user_message.to_string()));
            Ok(self.1.then(|| format!("you said {user_message}")))
        }
    }

    struct Tts(Arc<Calls>, bool);

    #[async_trait]
    impl Synthesize for Tts {
        async fn synthesize(
            &self,
            text: &str,
            language: &str,
        ) -> Result<Option<Vec<u8>>, SynthesisError> {
            self.0
                .synthesize
                .lock()
                .unwrap()
                .push((text.to_string(), language.to_string()));
            if self.1 {
                Ok(Some(vec![7, 7, 7]))
            } else {
                Err(SynthesisError::Transport("connection reset".to_string()))
            }
        }
    }

    fn orchestrator(
        calls: &Arc<Calls>,
        language: Option<&'static str>,
        has_content: bool,
        tts_ok: bool,
    ) -> TurnOrchestrator {
        TurnOrchestrator::new(Upstreams {
            transcriber: Arc::new(FixedStt(calls.clone(), language)),
            completer: Arc::new(EchoLlm(calls.clone(), has_content)),
            synthesizer: Arc::new(Tts(calls.clone(), tts_ok)),
        })
    }

    #[tokio::test]
    async fn test_transcript_is_kept_verbatim() {
        let calls = Arc::new(Calls::default());
        let result = orchestrator(&calls, Some("ta-IN"), true, true)
            .run(TurnRequest::from_audio(AudioInput::wav(vec![1])))
            .await
            .unwrap();

        assert_eq!(result.user_text, "  spaced out  ");
        assert_eq!(result.language, "ta-IN");
        assert_eq!(
            calls.synthesize.lock().unwrap()[0],
            ("you said   spaced out  ".to_string(), "ta-IN".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_detected_language_uses_hint_then_default() {
        let calls = Arc::new(Calls::default());
        let orch = orchestrator(&calls, None, true, true);

        let hinted = orch
            .run(TurnRequest::from_audio(AudioInput::wav(vec![1])).with_language("bn-in"))
            .await
            .unwrap();
        assert_eq!(hinted.language, "bn-IN");

        let defaulted = orch
            .run(TurnRequest::from_audio(AudioInput::wav(vec![1])))
            .await
            .unwrap();
        assert_eq!(defaulted.language, "en-IN");
    }

    #[tokio::test]
    async fn test_audio_wins_over_text() {
        let calls = Arc::new(Calls::default());
        let request = TurnRequest {
            audio: Some(AudioInput::wav(vec![1])),
            text: Some("typed".to_string()),
            preferred_language: None,
        };

        let result = orchestrator(&calls, Some("en-IN"), true, true)
            .run(request)
            .await
            .unwrap();

        assert_eq!(result.user_text, "  spaced out  ");
        assert_eq!(*calls.transcribe.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_blank_text_is_input_missing() {
        let calls = Arc::new(Calls::default());
        let err = orchestrator(&calls, None, true, true)
            .run(TurnRequest::from_text("   "))
            .await
            .unwrap_err();

        assert!(matches!(err, TurnError::InputMissing));
        assert!(calls.complete.lock().unwrap().is_empty());
        assert!(calls.synthesize.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_completion_uses_fallback_reply() {
        let calls = Arc::new(Calls::default());
        let result = orchestrator(&calls, None, false, true)
            .run(TurnRequest::from_text("hello"))
            .await
            .unwrap();

        assert_eq!(result.agent_text, "I'm listening. Please go on.");
        assert_eq!(
            calls.complete.lock().unwrap()[0].0,
            crate::persona::SERENITY_SYSTEM_PROMPT
        );
    }

    #[tokio::test]
    async fn test_synthesis_failure_keeps_text() {
        let calls = Arc::new(Calls::default());
        let result = orchestrator(&calls, None, true, false)
            .run(TurnRequest::from_text("hello").with_language("hi-IN"))
            .await
            .unwrap();

        assert_eq!(result.agent_text, "you said hello");
        assert!(result.audio.is_none());
        assert_eq!(result.language, "hi-IN");
    }

    #[tokio::test]
    async fn test_unconfigured_rejects_before_reading_input() {
        let orch = TurnOrchestrator::unconfigured(vec!["GROQ_API_KEY"]);
        assert!(!orch.is_configured());
        assert_eq!(orch.missing_credentials(), ["GROQ_API_KEY"]);

        let err = orch.run(TurnRequest::default()).await.unwrap_err();
        assert!(matches!(err, TurnError::Configuration(_)));
        assert_eq!(err.to_string(), "API keys not configured: GROQ_API_KEY");
    }
}
