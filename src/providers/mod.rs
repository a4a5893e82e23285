//! Upstream service adapters
//!
//! Each turn crosses three external services: transcription, completion and
//! synthesis. They are expressed as the capability traits [`Transcribe`],
//! [`Complete`] and [`Synthesize`] so the orchestrator can be driven by
//! deterministic fixtures in tests.
//!
//! Available providers:
//! - Sarvam for transcription and synthesis
//! - Groq (OpenAI-compatible chat completions) for replies

mod groq;
mod sarvam;

pub use groq::GroqChat;
pub use sarvam::{SarvamSynthesizer, SarvamTranscriber};

use async_trait::async_trait;
use thiserror::Error;

/// An encoded audio clip uploaded for transcription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInput {
    /// Encoded audio bytes (WAV, `WebM`, ...)
    pub data: Vec<u8>,

    /// Declared media type, e.g. `audio/wav`
    pub mime_type: String,

    /// File name forwarded with the upload
    pub file_name: String,
}

impl AudioInput {
    /// Media type assumed when the uploader declares none
    pub const DEFAULT_MIME_TYPE: &'static str = "audio/wav";

    /// File name assumed when the uploader provides none
    pub const DEFAULT_FILE_NAME: &'static str = "audio.wav";

    /// Wrap WAV bytes with the default media type and file name
    #[must_use]
    pub fn wav(data: Vec<u8>) -> Self {
        Self {
            data,
            mime_type: Self::DEFAULT_MIME_TYPE.to_string(),
            file_name: Self::DEFAULT_FILE_NAME.to_string(),
        }
    }
}

/// Result of a transcription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    /// Recognized text
    pub text: String,

    /// Language detected by the service, if it reported one
    pub language_code: Option<String>,
}

/// Transcription failures
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// The service answered with a non-success status
    #[error("transcription service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The request never produced a usable response
    #[error("transcription request failed: {0}")]
    Transport(String),
}

/// Completion failures
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The service answered with a non-success status
    #[error("completion service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The request never produced a usable response
    #[error("completion request failed: {0}")]
    Transport(String),
}

/// Synthesis failures
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The service answered with a non-success status
    #[error("synthesis service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The request never produced a usable response
    #[error("synthesis request failed: {0}")]
    Transport(String),

    /// The service returned audio that could not be decoded
    #[error("invalid synthesized audio: {0}")]
    InvalidAudio(String),
}

/// Converts recorded speech to text
#[async_trait]
pub trait Transcribe: Send + Sync {
    /// Transcribe one clip
    ///
    /// # Errors
    ///
    /// Returns error if the service rejects the clip or cannot be reached
    async fn transcribe(&self, audio: &AudioInput) -> Result<Transcript, TranscriptionError>;
}

/// Produces a single reply from a system prompt and one user message
#[async_trait]
pub trait Complete: Send + Sync {
    /// Generate a reply
    ///
    /// Returns `Ok(None)` when the service answered successfully but without
    /// any content.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-success response
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<Option<String>, CompletionError>;
}

/// Converts reply text to encoded speech
#[async_trait]
pub trait Synthesize: Send + Sync {
    /// Synthesize `text` spoken in `language`
    ///
    /// Returns `Ok(None)` when the service produced no clip.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a non-success response or
    /// undecodable audio
    async fn synthesize(
        &self,
        text: &str,
        language: &str,
    ) -> Result<Option<Vec<u8>>, SynthesisError>;
}

/// Build the shared HTTP client used by the adapters
///
/// # Errors
///
/// Returns error if the TLS backend cannot be initialized
pub fn http_client(timeout: std::time::Duration) -> crate::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(crate::Error::from)
}
