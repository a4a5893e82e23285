//! Sarvam speech services (speech-to-text and text-to-speech)

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{
    AudioInput, Synthesize, SynthesisError, Transcribe, Transcript, TranscriptionError,
};

/// Header carrying the Sarvam subscription key
const API_KEY_HEADER: &str = "api-subscription-key";

/// Response from the speech-to-text endpoint
#[derive(Deserialize)]
struct SttResponse {
    transcript: String,
    #[serde(default)]
    language_code: Option<String>,
}

/// Request body for the text-to-speech endpoint
#[derive(Serialize)]
struct TtsRequest<'a> {
    inputs: [&'a str; 1],
    target_language_code: &'a str,
    speaker: &'a str,
}

/// Response from the text-to-speech endpoint
#[derive(Deserialize)]
struct TtsResponse {
    #[serde(default)]
    audios: Vec<String>,
}

/// Transcribes speech with Sarvam
pub struct SarvamTranscriber {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl SarvamTranscriber {
    /// Create a new transcriber
    #[must_use]
    pub fn new(client: Client, base_url: String, api_key: SecretString, model: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Transcribe for SarvamTranscriber {
    async fn transcribe(&self, audio: &AudioInput) -> Result<Transcript, TranscriptionError> {
        tracing::debug!(
            audio_bytes = audio.data.len(),
            mime_type = %audio.mime_type,
            model = %self.model,
            "starting Sarvam transcription"
        );

        let part = reqwest::multipart::Part::bytes(audio.data.clone())
            .file_name(audio.file_name.clone())
            .mime_str(&audio.mime_type)
            .map_err(|e| TranscriptionError::Transport(format!("invalid media type: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(format!("{}/speech-to-text", self.base_url))
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Sarvam STT request failed");
                TranscriptionError::Transport(e.to_string())
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Sarvam STT error");
            return Err(TranscriptionError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let result: SttResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Sarvam STT response");
            TranscriptionError::Transport(format!("invalid response: {e}"))
        })?;

        tracing::debug!(
            transcript = %result.transcript,
            language = ?result.language_code,
            "transcription complete"
        );

        Ok(Transcript {
            text: result.transcript,
            language_code: result.language_code.filter(|code| !code.trim().is_empty()),
        })
    }
}

/// Synthesizes speech with Sarvam
pub struct SarvamSynthesizer {
    client: Client,
    base_url: String,
    api_key: SecretString,
    speaker: String,
}

impl SarvamSynthesizer {
    /// Create a new synthesizer speaking with `speaker`
    #[must_use]
    pub fn new(client: Client, base_url: String, api_key: SecretString, speaker: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            speaker,
        }
    }
}

#[async_trait]
impl Synthesize for SarvamSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        language: &str,
    ) -> Result<Option<Vec<u8>>, SynthesisError> {
        let request = TtsRequest {
            inputs: [text],
            target_language_code: language,
            speaker: &self.speaker,
        };

        let response = self
            .client
            .post(format!("{}/text-to-speech", self.base_url))
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| SynthesisError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let result: TtsResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::Transport(format!("invalid response: {e}")))?;

        let Some(clip) = result.audios.into_iter().next().filter(|a| !a.is_empty()) else {
            tracing::warn!(language, "Sarvam TTS returned no audio");
            return Ok(None);
        };

        let audio = base64::engine::general_purpose::STANDARD
            .decode(clip.as_bytes())
            .map_err(|e| SynthesisError::InvalidAudio(e.to_string()))?;

        tracing::debug!(audio_bytes = audio.len(), language, "synthesis complete");
        Ok(Some(audio))
    }
}
