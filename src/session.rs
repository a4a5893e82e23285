//! Client session controller
//!
//! Drives the capture → submit → playback loop for one interactive user.
//!
//! ```text
//!            StartRecording            StopRecording
//!   Idle ────────────────────► Recording ─────────────► Submitting
//!    ▲  ▲        Cancel            │                        │
//!    │  └──────────────────────────┘                        │
//!    │                    Completed                         │
//!    └──────────────────────────────────────────────────────┘
//!
//!   any ──Failed──► Error ──Acknowledge / StartRecording / SubmitText──►
//! ```
//!
//! Only one turn is ever in flight: starts are rejected while `Submitting`.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::client::{SubmitTurn, TurnReply};
use crate::language;
use crate::voice::{CaptureGuard, Microphone, Speaker, play_blocking, samples_to_wav};

/// Hard limit on one recording (the transcription service caps input at 30 s)
pub const MAX_RECORDING: Duration = Duration::from_secs(25);

/// Where the session is in its turn cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Submitting,
    Error,
}

/// Inputs that move the session between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    StartRecording,
    StopRecording,
    Cancel,
    SubmitText,
    Completed,
    Failed,
    Acknowledge,
}

impl SessionState {
    /// Transition table; `None` for illegal moves
    #[must_use]
    pub const fn next(self, event: SessionEvent) -> Option<Self> {
        use SessionEvent as E;

        match (self, event) {
            (Self::Idle | Self::Error, E::StartRecording) => Some(Self::Recording),
            (Self::Idle | Self::Error, E::SubmitText) | (Self::Recording, E::StopRecording) => {
                Some(Self::Submitting)
            }
            (Self::Recording, E::Cancel)
            | (Self::Submitting, E::Completed)
            | (Self::Error, E::Acknowledge) => Some(Self::Idle),
            (_, E::Failed) => Some(Self::Error),
            _ => None,
        }
    }

    /// Whether the selected language may be changed
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Idle | Self::Error)
    }
}

/// Who said a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Agent,
}

impl Role {
    /// Display label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "you",
            Self::Agent => "serenity",
        }
    }
}

/// One entry of the conversation history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

/// How the caller ended a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    /// Stop and submit what was captured
    Submit,
    /// Discard the capture
    Cancel,
}

/// Session controller errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {event:?} while {state:?}")]
    InvalidTransition {
        state: SessionState,
        event: SessionEvent,
    },

    #[error("cannot change language while {0:?}")]
    Busy(SessionState),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("nothing to send")]
    EmptyInput,

    #[error("nothing was recorded")]
    EmptyRecording,

    #[error("could not access microphone: {0}")]
    Microphone(#[source] crate::Error),

    #[error("could not encode recording: {0}")]
    Encoding(#[source] crate::Error),

    #[error("failed to process request: {0}")]
    Turn(#[source] crate::Error),
}

/// Runs turns for one interactive user
pub struct SessionController<C, M, S> {
    client: C,
    mic: M,
    speaker: S,
    state: SessionState,
    language: String,
    history: Vec<Message>,
    last_error: Option<String>,
    notice: Option<String>,
    max_recording: Duration,
}

impl<C, M, S> SessionController<C, M, S>
where
    C: SubmitTurn,
    M: Microphone,
    S: Speaker,
{
    /// Create an idle session
    pub fn new(client: C, mic: M, speaker: S) -> Self {
        Self {
            client,
            mic,
            speaker,
            state: SessionState::Idle,
            language: language::CLIENT_DEFAULT_LANGUAGE.to_string(),
            history: Vec::new(),
            last_error: None,
            notice: None,
            max_recording: MAX_RECORDING,
        }
    }

    /// Override the recording limit
    #[must_use]
    pub fn with_max_recording(mut self, limit: Duration) -> Self {
        self.max_recording = limit;
        self
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Conversation so far, oldest first
    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Message for the failure that put the session in `Error`
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Take the pending non-fatal notice (e.g. playback failed)
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    /// Select the language sent with each turn
    ///
    /// # Errors
    ///
    /// Fails while a turn is in progress or for an unknown code
    pub fn select_language(&mut self, code: &str) -> Result<(), SessionError> {
        if !self.state.is_settled() {
            return Err(SessionError::Busy(self.state));
        }

        let lang = language::find(code)
            .ok_or_else(|| SessionError::UnsupportedLanguage(code.to_string()))?;
        self.language = lang.code.to_string();
        tracing::debug!(language = %self.language, "language selected");
        Ok(())
    }

    /// Dismiss the current error
    ///
    /// # Errors
    ///
    /// Fails unless the session is in `Error`
    pub fn acknowledge(&mut self) -> Result<(), SessionError> {
        self.transition(SessionEvent::Acknowledge)
    }

    /// Abandon whatever turn was in progress and return to `Idle`
    ///
    /// Needed after a `record_turn` or `submit_text` future was dropped
    /// mid-turn, which leaves the state at `Recording` or `Submitting`.
    pub fn reset(&mut self) {
        self.mic.stop();
        if self.state != SessionState::Idle {
            tracing::debug!(from = ?self.state, "session reset");
        }
        self.state = SessionState::Idle;
        self.last_error = None;
    }

    /// Record until `stop` resolves or the time limit passes, then submit
    ///
    /// The microphone is released on every path out of this call, including
    /// the returned future being dropped; in that case the state is left
    /// mid-turn until [`reset`](Self::reset). Returns `Ok(None)` when the
    /// recording was cancelled; nothing is sent in that case.
    ///
    /// # Errors
    ///
    /// Fails on an illegal start, which leaves the state untouched, or on a
    /// microphone or turn failure, which moves the session to `Error`.
    #[allow(clippy::future_not_send)]
    pub async fn record_turn<F>(&mut self, stop: F) -> Result<Option<TurnReply>, SessionError>
    where
        F: Future<Output = StopSignal>,
    {
        self.transition(SessionEvent::StartRecording)?;
        tracing::info!(language = %self.language, "recording");

        let captured = capture(&mut self.mic, stop, self.max_recording).await;

        let samples = match captured {
            Ok(Some(samples)) => samples,
            Ok(None) => {
                self.transition(SessionEvent::Cancel)?;
                tracing::info!("recording cancelled");
                return Ok(None);
            }
            Err(e) => return Err(self.fail(SessionError::Microphone(e))),
        };

        self.transition(SessionEvent::StopRecording)?;

        if samples.is_empty() {
            return Err(self.fail(SessionError::EmptyRecording));
        }

        let wav = match samples_to_wav(&samples, self.mic.sample_rate()) {
            Ok(wav) => wav,
            Err(e) => return Err(self.fail(SessionError::Encoding(e))),
        };

        let reply = self.client.submit_audio(wav, &self.language).await;
        self.finish(reply).map(Some)
    }

    /// Submit typed text as one turn
    ///
    /// # Errors
    ///
    /// Fails for blank text, an illegal start or a failed turn
    #[allow(clippy::future_not_send)]
    pub async fn submit_text(&mut self, text: &str) -> Result<TurnReply, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyInput);
        }

        self.transition(SessionEvent::SubmitText)?;
        let reply = self.client.submit_text(text, &self.language).await;
        self.finish(reply)
    }

    fn finish(&mut self, reply: crate::Result<TurnReply>) -> Result<TurnReply, SessionError> {
        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => return Err(self.fail(SessionError::Turn(e))),
        };

        self.history.push(Message {
            role: Role::User,
            text: reply.user_text.clone(),
        });
        self.history.push(Message {
            role: Role::Agent,
            text: reply.agent_text.clone(),
        });

        if let Some(audio) = &reply.audio
            && let Err(e) = play_blocking(&mut self.speaker, audio)
        {
            tracing::warn!(error = %e, "playback failed");
            self.notice = Some(format!("Could not play the spoken reply: {e}"));
        }

        self.transition(SessionEvent::Completed)?;
        Ok(reply)
    }

    fn transition(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        let next = self
            .state
            .next(event)
            .ok_or(SessionError::InvalidTransition {
                state: self.state,
                event,
            })?;

        tracing::debug!(from = ?self.state, to = ?next, ?event, "session transition");

        if self.state == SessionState::Error && next != SessionState::Error {
            self.last_error = None;
        }
        self.state = next;
        Ok(())
    }

    fn fail(&mut self, err: SessionError) -> SessionError {
        tracing::error!(error = %err, "turn failed");
        self.last_error = Some(err.to_string());
        self.state = SessionState::Error;
        err
    }
}

/// Capture until stopped or timed out; `None` when cancelled
async fn capture<M, F>(
    mic: &mut M,
    stop: F,
    limit: Duration,
) -> crate::Result<Option<Vec<f32>>>
where
    M: Microphone,
    F: Future<Output = StopSignal>,
{
    let guard = CaptureGuard::start(mic)?;

    let signal = tokio::select! {
        signal = stop => signal,
        () = tokio::time::sleep(limit) => {
            tracing::info!(limit_secs = limit.as_secs(), "recording limit reached");
            StopSignal::Submit
        }
    };

    Ok(match signal {
        StopSignal::Submit => Some(guard.finish()),
        StopSignal::Cancel => None,
    })
}
