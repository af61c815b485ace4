//! Integration tests for the gateway HTTP API

use decor_studio::gateway::{Gateway, FALLBACK_IMAGE_URL};
use decor_studio::llm::{SimProvider, SimScenario, SIM_IMAGE_PNG};
use decor_studio::storage::LocalStore;
use decor_studio::transport::http::{serve, AppState};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Start a server on an ephemeral port and return its base URL
async fn spawn_with(listener: TcpListener, state: AppState, generated: Option<PathBuf>) -> String {
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = serve(listener, Arc::new(state), generated).await;
    });
    format!("http://{}", addr)
}

async fn spawn(scenario: SimScenario) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gateway = Gateway::new(Arc::new(SimProvider::new().with_scenario(scenario)));
    spawn_with(listener, AppState::new(gateway), None).await
}

async fn post(base: &str, path: &str, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{}{}", base, path))
        .json(&body)
        .send()
        .await
        .expect("request failed");
    let status = response.status().as_u16();
    (status, response.json().await.expect("JSON body"))
}

#[tokio::test]
async fn test_chat_round_trip() {
    let base = spawn(SimScenario::Normal).await;
    let (status, body) = post(
        &base,
        "/api/chat",
        json!({
            "history": [{"id": "init", "role": "assistant", "content": "Welcome", "timestamp": 0}],
            "userMessage": "Where should the sofa go?",
            "context": {"style": "Boho", "params": {"roomType": "Living Room", "area": 30}}
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["reply"], "Design note: Where should the sofa go?");
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_chat_provider_failure_still_answers() {
    let base = spawn(SimScenario::Failure).await;
    let (status, body) = post(&base, "/api/chat", json!({"userMessage": "Hi"})).await;
    assert_eq!(status, 200);
    assert!(!body["reply"].as_str().unwrap().is_empty());
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_empty_body_uses_defaults() {
    let base = spawn(SimScenario::Normal).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/suggestions", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["suggestions"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_invalid_json_is_rejected() {
    let base = spawn(SimScenario::Normal).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"error": "Invalid JSON"}));
}

#[tokio::test]
async fn test_loosely_typed_bodies_are_accepted() {
    let base = spawn(SimScenario::Normal).await;
    let (status, body) = post(
        &base,
        "/api/chat",
        json!({
            "history": [
                {"content": "Welcome"},
                {"role": "system", "content": "Be brief"}
            ],
            "userMessage": "Which rug fits?",
            "context": {"style": null, "params": {"area": null, "roomType": "Sala de Estar"}}
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["reply"], "Design note: Which rug fits?");

    let (status, body) = post(
        &base,
        "/api/suggestions",
        json!({"style": null, "params": {"area": "big", "budget": 3, "colors": null}}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["suggestions"].as_array().unwrap().len(), 3);

    let (status, body) = post(
        &base,
        "/api/sample-room",
        json!({"roomType": "Sala de Estar"}),
    )
    .await;
    assert_eq!(status, 200);
    assert!(body["imageUrl"].is_string());
}

#[tokio::test]
async fn test_method_not_allowed() {
    let base = spawn(SimScenario::Normal).await;
    for path in ["/api/chat", "/api/suggestions", "/api/image", "/api/sample-room"] {
        let response = reqwest::get(format!("{}{}", base, path)).await.unwrap();
        assert_eq!(response.status().as_u16(), 405, "{path}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"error": "Method not allowed"}));
    }
}

#[tokio::test]
async fn test_unknown_path() {
    let base = spawn(SimScenario::Normal).await;
    let response = reqwest::get(format!("{}/api/nothing", base)).await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"error": "Not found"}));
}

#[tokio::test]
async fn test_missing_credentials() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = spawn_with(
        listener,
        AppState::unconfigured("GEMINI_API_KEY is missing"),
        None,
    )
    .await;

    let (status, body) = post(&base, "/api/image", json!({"style": "Boho"})).await;
    assert_eq!(status, 500);
    assert_eq!(body, json!({"error": "GEMINI_API_KEY is missing"}));

    let health: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["configured"], false);
}

#[tokio::test]
async fn test_health() {
    let base = spawn(SimScenario::Normal).await;
    let health: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["provider"], "sim");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_image_inline_without_store() {
    let base = spawn(SimScenario::Normal).await;
    let (status, body) = post(
        &base,
        "/api/image",
        json!({"originalUrl": "https://i.imgur.com/ZvIli2u.jpg", "style": "Industrial"}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(
        body["imageUrl"],
        format!("data:image/png;base64,{}", SIM_IMAGE_PNG)
    );
    assert_eq!(body["originalUrl"], "https://i.imgur.com/ZvIli2u.jpg");
    assert!(body["prompt"].is_string());
}

#[tokio::test]
async fn test_image_quota_exceeded() {
    let base = spawn(SimScenario::QuotaExceeded).await;
    let (status, body) = post(&base, "/api/image", json!({"style": "Boho"})).await;

    assert_eq!(status, 200);
    assert_eq!(body["imageUrl"], FALLBACK_IMAGE_URL);
    assert_eq!(body["quotaExceeded"], true);
    assert!(body["prompt"].is_null());
    assert!(body["error"].is_string());
    assert!(body["errorDetail"].is_string());
}

#[tokio::test]
async fn test_generated_images_are_served() {
    let dir = tempfile::tempdir().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store = LocalStore::new(dir.path(), format!("http://{}/generated", addr));
    let gateway = Gateway::new(Arc::new(SimProvider::new())).with_store(Some(Arc::new(store)));
    let base = spawn_with(
        listener,
        AppState::new(gateway),
        Some(dir.path().to_path_buf()),
    )
    .await;

    let (status, body) = post(&base, "/api/sample-room", json!({"roomType": "Bedroom"})).await;
    assert_eq!(status, 200);
    let url = body["imageUrl"].as_str().unwrap();
    assert!(url.starts_with(&format!("{}/generated/ai-proposal-", base)));

    let bytes = reqwest::get(url).await.unwrap().bytes().await.unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
}

#[tokio::test]
async fn test_cors_preflight() {
    let base = spawn(SimScenario::Normal).await;
    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("{}/api/chat", base))
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
