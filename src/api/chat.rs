//! Conversational turn endpoint
//!
//! `POST /api/chat` accepts a multipart form with an optional `audio` file,
//! an optional `text` field and an optional `language` hint.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use base64::Engine;
use serde::Serialize;

use super::ApiState;
use crate::providers::{AudioInput, TranscriptionError};
use crate::turn::{TurnError, TurnRequest, TurnResult};

/// Build chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new().route("/", post(chat)).with_state(state)
}

/// Turn response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub user_text: String,
    pub agent_text: String,
    /// Base64-encoded spoken reply; `null` when synthesis failed
    pub audio_base64: Option<String>,
}

impl From<TurnResult> for ChatResponse {
    fn from(result: TurnResult) -> Self {
        Self {
            user_text: result.user_text,
            agent_text: result.agent_text,
            audio_base64: result
                .audio
                .map(|a| base64::engine::general_purpose::STANDARD.encode(a)),
        }
    }
}

/// Run one conversational turn
async fn chat(
    State(state): State<Arc<ApiState>>,
    multipart: Multipart,
) -> Result<Json<ChatResponse>, ChatError> {
    // Credentials are checked before the body is read
    if !state.orchestrator.is_configured() {
        let missing = state.orchestrator.missing_credentials().to_vec();
        return Err(TurnError::Configuration(missing).into());
    }

    let request = read_turn_request(multipart).await?;
    let result = state.orchestrator.run(request).await?;

    Ok(Json(result.into()))
}

/// Collect the turn fields from the multipart body
///
/// Zero-length audio parts count as absent. Unknown fields are ignored.
async fn read_turn_request(mut multipart: Multipart) -> Result<TurnRequest, ChatError> {
    let mut request = TurnRequest::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("audio") => {
                let mime_type = field
                    .content_type()
                    .filter(|ct| !ct.is_empty())
                    .unwrap_or(AudioInput::DEFAULT_MIME_TYPE)
                    .to_string();
                let file_name = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .unwrap_or(AudioInput::DEFAULT_FILE_NAME)
                    .to_string();
                let data = field.bytes().await?;

                if data.is_empty() {
                    tracing::debug!("ignoring empty audio part");
                    continue;
                }

                tracing::debug!(audio_bytes = data.len(), %mime_type, "received audio");
                request.audio = Some(AudioInput {
                    data: data.to_vec(),
                    mime_type,
                    file_name,
                });
            }
            Some("text") => request.text = Some(field.text().await?),
            Some("language") => request.preferred_language = Some(field.text().await?),
            other => {
                tracing::debug!(field = ?other, "ignoring unknown form field");
            }
        }
    }

    Ok(request)
}

/// Chat API errors
#[derive(Debug)]
pub enum ChatError {
    /// The turn failed
    Turn(TurnError),
    /// The multipart body could not be read
    BadForm(MultipartError),
}

impl From<TurnError> for ChatError {
    fn from(e: TurnError) -> Self {
        Self::Turn(e)
    }
}

impl From<MultipartError> for ChatError {
    fn from(e: MultipartError) -> Self {
        Self::BadForm(e)
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, message) = match self {
            Self::BadForm(e) => {
                tracing::warn!(error = %e, "malformed chat form");
                (StatusCode::BAD_REQUEST, format!("Invalid form data: {}", e.body_text()))
            }
            Self::Turn(TurnError::Configuration(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "API keys not configured".to_string(),
            ),
            Self::Turn(TurnError::InputMissing) => {
                (StatusCode::BAD_REQUEST, "No input provided".to_string())
            }
            Self::Turn(TurnError::Transcription(TranscriptionError::Upstream { status, body })) => {
                match StatusCode::from_u16(status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                {
                    Some(status) => (status, format!("Transcription failed: {body}")),
                    None => internal_error(&format!("transcription returned {status}: {body}")),
                }
            }
            Self::Turn(TurnError::Transcription(e @ TranscriptionError::Transport(_))) => {
                internal_error(&e)
            }
            Self::Turn(TurnError::Completion(e)) => internal_error(&e),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Log the cause and hide it behind a generic 500
fn internal_error(cause: &dyn std::fmt::Display) -> (StatusCode, String) {
    tracing::error!(error = %cause, "turn failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error".to_string(),
    )
}
