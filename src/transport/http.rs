//! HTTP server for the design gateway API

use crate::config::Config;
use crate::gateway::{
    ChatReply, ChatRequest, Gateway, ImageReply, ImageRequest, SampleRoomReply,
    SampleRoomRequest, SuggestionsReply, SuggestionsRequest,
};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

/// Shared application state
pub struct AppState {
    /// The gateway, or why it could not be built
    gateway: Result<Gateway, String>,
}

impl AppState {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway: Ok(gateway),
        }
    }

    /// State for a server whose provider is misconfigured
    ///
    /// The server still starts; every API call answers 500 with `error`.
    pub fn unconfigured(error: impl Into<String>) -> Self {
        Self {
            gateway: Err(error.into()),
        }
    }

    pub fn from_config(config: &Config, default_local_base: &str) -> Self {
        match Gateway::from_config(config, default_local_base) {
            Ok(gateway) => Self::new(gateway),
            Err(e) => {
                tracing::error!("AI provider is not configured: {:#}", e);
                Self::unconfigured(e.to_string())
            }
        }
    }

    fn gateway(&self) -> Result<&Gateway, Response> {
        self.gateway
            .as_ref()
            .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))
    }
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    build: String,
    provider: Option<String>,
    configured: bool,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Decode an optional JSON body
///
/// Only malformed JSON is rejected. An empty body, `null` or a value that is
/// not an object means all defaults; bad fields fall back one by one.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid JSON"))?;
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::debug!("Ignoring request body of unexpected shape: {}", e);
        T::default()
    }))
}

/// Build the API router
///
/// `generated_dir` is served under `/generated` for the local image store.
pub fn router(state: Arc<AppState>, generated_dir: Option<PathBuf>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_check).fallback(method_not_allowed))
        .route("/api/chat", post(handle_chat).fallback(method_not_allowed))
        .route(
            "/api/suggestions",
            post(handle_suggestions).fallback(method_not_allowed),
        )
        .route("/api/image", post(handle_image).fallback(method_not_allowed))
        .route(
            "/api/sample-room",
            post(handle_sample_room).fallback(method_not_allowed),
        )
        .fallback(not_found);

    if let Some(dir) = generated_dir {
        tracing::info!("Serving generated images from {}", dir.display());
        app = app.nest_service("/generated", ServeDir::new(dir));
    }

    app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
    .with_state(state)
}

/// Serve the API on an already bound listener until ctrl-c
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    generated_dir: Option<PathBuf>,
) -> Result<()> {
    axum::serve(listener, router(state, generated_dir))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Run the HTTP server
pub async fn run_http_server(config: Config) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let public_host = if host == "0.0.0.0" { "localhost" } else { host.as_str() };
    let default_local_base = format!("http://{}:{}/generated", public_host, port);

    let state = Arc::new(AppState::from_config(&config, &default_local_base));
    let generated_dir = match (&config.storage.bucket_name, &config.storage.local_dir) {
        (None, Some(dir)) => Some(dir.clone()),
        _ => None,
    };

    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;
    tracing::info!("HTTP server listening on {}", listener.local_addr()?);

    serve(listener, state, generated_dir).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let provider = state
        .gateway
        .as_ref()
        .ok()
        .map(|gateway| gateway.provider_name().to_string());
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: env!("DECOR_GIT_HASH").to_string(),
        configured: provider.is_some(),
        provider,
    })
}

async fn handle_chat(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ChatReply>, Response> {
    let gateway = state.gateway()?;
    let request: ChatRequest = parse_body(&body)?;
    tracing::debug!(history = request.history.len(), "POST /api/chat");
    Ok(Json(gateway.chat(&request).await))
}

async fn handle_suggestions(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SuggestionsReply>, Response> {
    let gateway = state.gateway()?;
    let request: SuggestionsRequest = parse_body(&body)?;
    tracing::debug!(style = %request.style, "POST /api/suggestions");
    Ok(Json(gateway.suggestions(&request).await))
}

async fn handle_image(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ImageReply>, Response> {
    let gateway = state.gateway()?;
    let request: ImageRequest = parse_body(&body)?;
    tracing::debug!(style = %request.style, "POST /api/image");
    Ok(Json(gateway.image(&request).await))
}

async fn handle_sample_room(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SampleRoomReply>, Response> {
    let gateway = state.gateway()?;
    let request: SampleRoomRequest = parse_body(&body)?;
    tracing::debug!(room = %request.room_type, "POST /api/sample-room");
    Ok(Json(gateway.sample_room(&request).await))
}

async fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::DesignContext;
    use crate::session::{ChatRole, RoomType};

    #[test]
    fn test_parse_body_defaults() {
        let request = parse_body::<ChatRequest>(&Bytes::from_static(b"")).ok();
        assert_eq!(request, Some(ChatRequest::default()));
        let request = parse_body::<ChatRequest>(&Bytes::from_static(b" null ")).ok();
        assert_eq!(request, Some(ChatRequest::default()));
    }

    #[test]
    fn test_parse_body_rejects_bad_json() {
        let response = parse_body::<ChatRequest>(&Bytes::from_static(b"{oops")).unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_parse_body_tolerates_loose_fields() {
        let request = parse_body::<ChatRequest>(&Bytes::from_static(
            br#"{
                "history": [
                    {"content": "no role"},
                    {"role": "system", "content": "be nice"},
                    {"role": "Assistant", "content": "Hello"},
                    7
                ],
                "userMessage": "Which rug?",
                "context": {"style": null, "params": {"area": null, "roomType": "Sala de Estar"}}
            }"#,
        ))
        .unwrap();

        let roles: Vec<_> = request.history.iter().map(|entry| entry.role).collect();
        assert_eq!(roles, [ChatRole::User, ChatRole::User, ChatRole::Assistant]);
        assert_eq!(request.history[1].content, "be nice");
        assert_eq!(request.user_message, "Which rug?");
        assert_eq!(request.context, DesignContext::default());
    }

    #[test]
    fn test_parse_body_falls_back_per_field() {
        let request = parse_body::<SampleRoomRequest>(&Bytes::from_static(
            br#"{"roomType": "Garage"}"#,
        ))
        .unwrap();
        assert_eq!(request.room_type, RoomType::LivingRoom);

        let request = parse_body::<ImageRequest>(&Bytes::from_static(
            br#"{"originalUrl": 42, "style": "  ", "params": "big"}"#,
        ))
        .unwrap();
        assert_eq!(request, ImageRequest::default());

        let request = parse_body::<SuggestionsRequest>(&Bytes::from_static(b"[1, 2]")).unwrap();
        assert_eq!(request, SuggestionsRequest::default());
    }

    #[test]
    fn test_unconfigured_state() {
        let state = AppState::unconfigured("GEMINI_API_KEY is missing");
        let response = state.gateway().err().unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
