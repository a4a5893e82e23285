//! HTTP client for a running relay server

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;

use crate::{Error, Result};

/// What the relay sent back for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    pub user_text: String,
    pub agent_text: String,
    /// Decoded spoken reply, if synthesis succeeded
    pub audio: Option<Vec<u8>>,
}

/// Submits one turn to a relay
#[async_trait]
pub trait SubmitTurn: Send + Sync {
    /// Submit a recorded WAV clip
    async fn submit_audio(&self, wav: Vec<u8>, language: &str) -> Result<TurnReply>;

    /// Submit typed text
    async fn submit_text(&self, text: &str, language: &str) -> Result<TurnReply>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatBody {
    user_text: String,
    agent_text: String,
    #[serde(default)]
    audio_base64: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Talks to `POST /api/chat` on a relay server
pub struct RelayClient {
    client: Client,
    base_url: String,
}

impl RelayClient {
    /// Create a client for the relay at `base_url`
    #[must_use]
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post(&self, form: reqwest::multipart::Form) -> Result<TurnReply> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(status = %status, "relay responded");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or(text);
            return Err(Error::Relay(format!("{status}: {message}")));
        }

        let body: ChatBody = response.json().await?;
        let audio = body
            .audio_base64
            .filter(|a| !a.is_empty())
            .map(|a| base64::engine::general_purpose::STANDARD.decode(a))
            .transpose()?;

        Ok(TurnReply {
            user_text: body.user_text,
            agent_text: body.agent_text,
            audio,
        })
    }
}

#[async_trait]
impl SubmitTurn for RelayClient {
    async fn submit_audio(&self, wav: Vec<u8>, language: &str) -> Result<TurnReply> {
        tracing::debug!(audio_bytes = wav.len(), language, "submitting recording");

        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("recording.wav")
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new()
            .part("audio", part)
            .text("language", language.to_string());

        self.post(form).await
    }

    async fn submit_text(&self, text: &str, language: &str) -> Result<TurnReply> {
        let form = reqwest::multipart::Form::new()
            .text("text", text.to_string())
            .text("language", language.to_string());

        self.post(form).await
    }
}
