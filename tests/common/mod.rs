//! Shared test utilities

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, header};
use serenity_relay::api::ApiServerBuilder;
use serenity_relay::providers::{
    AudioInput, Complete, CompletionError, Synthesize, SynthesisError, Transcribe, Transcript,
    TranscriptionError,
};
use serenity_relay::{TurnOrchestrator, Upstreams};

pub const BOUNDARY: &str = "serenity-test-boundary";

/// How a fixture upstream behaves
#[derive(Clone)]
pub enum Fixture<T> {
    Ok(T),
    /// Fail with an upstream status and body
    Status(u16, &'static str),
}

/// Upstream call counters
#[derive(Default)]
pub struct Calls {
    pub transcribe: AtomicUsize,
    pub complete: AtomicUsize,
    pub synthesize: AtomicUsize,
}

impl Calls {
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.transcribe.load(Ordering::SeqCst),
            self.complete.load(Ordering::SeqCst),
            self.synthesize.load(Ordering::SeqCst),
        )
    }
}

pub struct FixtureTranscriber {
    calls: Arc<Calls>,
    result: Fixture<(&'static str, Option<&'static str>)>,
}

#[async_trait]
impl Transcribe for FixtureTranscriber {
    async fn transcribe(&self, _audio: &AudioInput) -> Result<Transcript, TranscriptionError> {
        self.calls.transcribe.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Fixture::Ok((text, language)) => Ok(Transcript {
                text: (*text).to_string(),
                language_code: language.map(str::to_string),
            }),
            Fixture::Status(status, body) => Err(TranscriptionError::Upstream {
                status: *status,
                body: (*body).to_string(),
            }),
        }
    }
}

pub struct FixtureCompleter {
    calls: Arc<Calls>,
    result: Fixture<Option<&'static str>>,
}

#[async_trait]
impl Complete for FixtureCompleter {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_message: &str,
    ) -> Result<Option<String>, CompletionError> {
        self.calls.complete.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Fixture::Ok(reply) => Ok(reply.map(str::to_string)),
            Fixture::Status(status, body) => Err(CompletionError::Upstream {
                status: *status,
                body: (*body).to_string(),
            }),
        }
    }
}

pub struct FixtureSynthesizer {
    calls: Arc<Calls>,
    result: Fixture<&'static [u8]>,
}

#[async_trait]
impl Synthesize for FixtureSynthesizer {
    async fn synthesize(
        &self,
        _text: &str,
        _language: &str,
    ) -> Result<Option<Vec<u8>>, SynthesisError> {
        self.calls.synthesize.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Fixture::Ok(audio) => Ok(Some(audio.to_vec())),
            Fixture::Status(status, body) => Err(SynthesisError::Upstream {
                status: *status,
                body: (*body).to_string(),
            }),
        }
    }
}

/// Builder for a fixture-backed orchestrator
pub struct Upstream {
    pub transcript: Fixture<(&'static str, Option<&'static str>)>,
    pub reply: Fixture<Option<&'static str>>,
    pub speech: Fixture<&'static [u8]>,
}

impl Default for Upstream {
    fn default() -> Self {
        Self {
            transcript: Fixture::Ok(("I feel anxious today", Some("en-IN"))),
            reply: Fixture::Ok(Some("I'm sorry to hear that. Can you tell me more?")),
            speech: Fixture::Ok(&b"RIFF\x24\x00\x00\x00WAVE"[..]),
        }
    }
}

impl Upstream {
    pub fn orchestrator(self) -> (TurnOrchestrator, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let upstreams = Upstreams {
            transcriber: Arc::new(FixtureTranscriber {
                calls: Arc::clone(&calls),
                result: self.transcript,
            }),
            completer: Arc::new(FixtureCompleter {
                calls: Arc::clone(&calls),
                result: self.reply,
            }),
            synthesizer: Arc::new(FixtureSynthesizer {
                calls: Arc::clone(&calls),
                result: self.speech,
            }),
        };
        (TurnOrchestrator::new(upstreams), calls)
    }

    pub fn router(self) -> (axum::Router, Arc<Calls>) {
        let (orchestrator, calls) = self.orchestrator();
        (build_router(orchestrator), calls)
    }
}

/// Build the full API router around an orchestrator
pub fn build_router(orchestrator: TurnOrchestrator) -> axum::Router {
    ApiServerBuilder::new(orchestrator, 0).build().router()
}

/// One part of a multipart form
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

/// Encode a multipart/form-data body
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, mime, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"clip.wav\"\r\nContent-Type: {mime}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// A `POST /api/chat` request with the given form parts
pub fn chat_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// Read a response body as JSON
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A short WAV fixture
pub fn wav_fixture() -> Vec<u8> {
    serenity_relay::voice::samples_to_wav(&[0.1; 1600], 16000).unwrap()
}
