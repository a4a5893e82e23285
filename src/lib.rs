//! Serenity Relay - voice relay for a supportive conversational assistant
//!
//! One conversational turn flows through three hosted services:
//! - Speech-to-text (Sarvam)
//! - Chat completion with the fixed Serenity persona (Groq)
//! - Text-to-speech (Sarvam)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Session Controller                  │
//! │   Microphone  │  Relay client  │  Speaker           │
//! └────────────────────┬────────────────────────────────┘
//!                      │  POST /api/chat
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Relay Server                      │
//! │   API  │  Turn Orchestrator                         │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Upstreams                        │
//! │   Sarvam STT  │  Groq LLM  │  Sarvam TTS            │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod language;
pub mod persona;
pub mod providers;
pub mod session;
pub mod turn;
pub mod voice;

pub use client::{RelayClient, SubmitTurn, TurnReply};
pub use config::Config;
pub use error::{Error, Result};
pub use persona::Persona;
pub use providers::{Complete, Synthesize, Transcribe};
pub use session::{SessionController, SessionError, SessionState};
pub use turn::{TurnError, TurnOrchestrator, TurnRequest, TurnResult, Upstreams};
