//! Full relay against mocked Sarvam and Groq services

use axum::http::StatusCode;
use serenity_relay::config::file::RelayConfigFile;
use serenity_relay::{Config, TurnOrchestrator};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{Part, build_router, chat_request, json_body, wav_fixture};

fn config_for(server: &MockServer) -> Config {
    config_with_sarvam_at(server, &server.uri())
}

fn config_with_sarvam_at(server: &MockServer, sarvam_url: &str) -> Config {
    let groq_url = server.uri();
    Config::from_sources(
        |key| match key {
            "SARVAM_API_KEY" => Some("sk_test".to_string()),
            "GROQ_API_KEY" => Some("gsk_test".to_string()),
            "SARVAM_BASE_URL" => Some(sarvam_url.to_string()),
            "GROQ_BASE_URL" => Some(groq_url.clone()),
            _ => None,
        },
        RelayConfigFile::default(),
    )
}

/// Fail the test if any completion request is made
async fn forbid_completion(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

async fn mount_completion(server: &MockServer, reply: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer gsk_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": reply } }]
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_spoken_turn_through_real_adapters() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/speech-to-text"))
        .and(header("api-subscription-key", "sk_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "transcript": "I feel anxious today",
            "language_code": "en-IN"
        })))
        .expect(1)
        .mount(&server)
        .await;

    mount_completion(&server, "I'm sorry to hear that. Can you tell me more?").await;

    Mock::given(method("POST"))
        .and(path("/text-to-speech"))
        .and(body_partial_json(serde_json::json!({
            "inputs": ["I'm sorry to hear that. Can you tell me more?"],
            "target_language_code": "en-IN"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "audios": ["UklGRg=="]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = TurnOrchestrator::from_config(&config_for(&server)).unwrap();
    assert!(orchestrator.is_configured());
    let wav = wav_fixture();

    let response = build_router(orchestrator)
        .oneshot(chat_request(&[Part::File("audio", "audio/wav", &wav)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["userText"], "I feel anxious today");
    assert_eq!(
        json["agentText"],
        "I'm sorry to hear that. Can you tell me more?"
    );
    assert_eq!(json["audioBase64"], "UklGRg==");
}

#[tokio::test]
async fn test_synthesis_outage_still_returns_text() {
    let server = MockServer::start().await;

    mount_completion(&server, "Hello. I'm here for you.").await;

    Mock::given(method("POST"))
        .and(path("/text-to-speech"))
        .respond_with(ResponseTemplate::new(503).set_body_string("service unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = TurnOrchestrator::from_config(&config_for(&server)).unwrap();

    let response = build_router(orchestrator)
        .oneshot(chat_request(&[Part::Text("text", "hello")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["agentText"], "Hello. I'm here for you.");
    assert!(json["audioBase64"].is_null());
}

#[tokio::test]
async fn test_transcription_status_is_passed_through() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/speech-to-text"))
        .respond_with(ResponseTemplate::new(422).set_body_string("unsupported audio format"))
        .expect(1)
        .mount(&server)
        .await;
    forbid_completion(&server).await;

    let orchestrator = TurnOrchestrator::from_config(&config_for(&server)).unwrap();

    let response = build_router(orchestrator)
        .oneshot(chat_request(&[Part::File("audio", "audio/webm", &b"not audio"[..])]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = json_body(response).await;
    assert_eq!(
        json["error"],
        "Transcription failed: unsupported audio format"
    );
}

#[tokio::test]
async fn test_unreadable_transcription_response_is_generic_500() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/speech-to-text"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops"))
        .expect(1)
        .mount(&server)
        .await;
    forbid_completion(&server).await;

    let orchestrator = TurnOrchestrator::from_config(&config_for(&server)).unwrap();
    let wav = wav_fixture();

    let response = build_router(orchestrator)
        .oneshot(chat_request(&[Part::File("audio", "audio/wav", &wav)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Internal Server Error");
}

#[tokio::test]
async fn test_unreachable_transcription_service_is_generic_500() {
    let server = MockServer::start().await;
    forbid_completion(&server).await;

    let config = config_with_sarvam_at(&server, "http://127.0.0.1:1");
    let orchestrator = TurnOrchestrator::from_config(&config).unwrap();
    let wav = wav_fixture();

    let response = build_router(orchestrator)
        .oneshot(chat_request(&[Part::File("audio", "audio/wav", &wav)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Internal Server Error");
}
