//! Provider and bucket clients against a local stand-in HTTP server

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use decor_studio::gateway::{Gateway, ImageRequest, FALLBACK_IMAGE_URL};
use decor_studio::llm::{
    is_quota_error, GeminiProvider, ImagePrompt, InlineImage, LlmProvider, OpenAiProvider,
    SIM_IMAGE_PNG,
};
use decor_studio::storage::{BucketStore, ImageStore};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// One request as the stand-in server saw it
#[derive(Debug, Clone)]
struct Recorded {
    uri: String,
    authorization: Option<String>,
    body: Vec<u8>,
}

impl Recorded {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

type Reply = fn(&str) -> (StatusCode, String);

#[derive(Clone)]
struct Upstream {
    requests: Arc<Mutex<Vec<Recorded>>>,
    reply: Reply,
}

impl Upstream {
    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn respond(
    State(upstream): State<Upstream>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let uri = uri.to_string();
    upstream.requests.lock().unwrap().push(Recorded {
        uri: uri.clone(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body: body.to_vec(),
    });
    let (status, body) = (upstream.reply)(&uri);
    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

/// Serve `reply` on an ephemeral port; returns the base URL and the request log
async fn upstream(reply: Reply) -> (String, Upstream) {
    let upstream = Upstream {
        requests: Arc::new(Mutex::new(Vec::new())),
        reply,
    };
    let app = Router::new().fallback(respond).with_state(upstream.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}", addr), upstream)
}

fn png() -> InlineImage {
    InlineImage::new("image/png", SIM_IMAGE_PNG)
}

fn gemini_image_body() -> String {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [
                    {"text": "Here is the room"},
                    {"inlineData": {"mimeType": "image/png", "data": SIM_IMAGE_PNG}}
                ]
            }
        }]
    })
    .to_string()
}

fn gemini_text_body(text: &str) -> String {
    json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]}).to_string()
}

const GEMINI_QUOTA: &str =
    r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;

#[tokio::test]
async fn test_bucket_upload_sends_bytes_with_token() {
    let (base, upstream) = upstream(|_| (StatusCode::OK, "{}".to_string())).await;
    let store = BucketStore::new("rooms", "https://cdn.example.com/rooms/")
        .with_token(Some("secret".to_string()))
        .with_upload_base(format!("{}/upload/", base));

    let url = store.put(&png()).await.unwrap();
    let name = url
        .strip_prefix("https://cdn.example.com/rooms/")
        .unwrap()
        .to_string();
    assert!(name.starts_with("ai-proposal-") && name.ends_with(".png"));

    let requests = upstream.requests();
    assert_eq!(requests.len(), 1);
    let upload = &requests[0];
    assert!(upload.uri.starts_with("/upload/rooms/o?uploadType=media"));
    assert!(upload.uri.contains("predefinedAcl=publicRead"));
    assert!(upload.uri.ends_with(&format!("name={}", name)));
    assert_eq!(upload.authorization.as_deref(), Some("Bearer secret"));
    assert_eq!(&upload.body[1..4], b"PNG");
}

#[tokio::test]
async fn test_bucket_upload_without_token_is_anonymous() {
    let (base, upstream) = upstream(|_| (StatusCode::OK, "{}".to_string())).await;
    let store = BucketStore::new("rooms", "https://cdn.example.com/rooms").with_upload_base(base);

    store.put(&png()).await.unwrap();
    assert!(upstream.requests()[0].authorization.is_none());
}

#[tokio::test]
async fn test_bucket_rejection_is_an_error() {
    let (base, _) = upstream(|_| {
        (
            StatusCode::FORBIDDEN,
            r#"{"error":{"message":"Access denied"}}"#.to_string(),
        )
    })
    .await;
    let store = BucketStore::new("rooms", "https://cdn.example.com/rooms").with_upload_base(base);

    let err = store.put(&png()).await.unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Bucket upload rejected (403"), "{message}");
    assert!(message.contains("Access denied"));
}

#[tokio::test]
async fn test_gemini_image_request_and_reply() {
    let (base, upstream) = upstream(|_| (StatusCode::OK, gemini_image_body())).await;
    let provider = GeminiProvider::with_api_key("test-key").with_base_url(&base);

    let image = provider
        .generate_image(&ImagePrompt::new("Scandinavian living room"))
        .await
        .unwrap();
    assert_eq!(image.mime_type, "image/png");
    assert_eq!(image.data, SIM_IMAGE_PNG);

    let request = &upstream.requests()[0];
    assert_eq!(
        request.uri,
        "/gemini-2.5-flash-image:generateContent?key=test-key"
    );
    let body = request.json();
    assert_eq!(body["contents"][0]["parts"][0]["text"], "Scandinavian living room");
    assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "1:1");
}

#[tokio::test]
async fn test_gemini_quota_is_recognised() {
    let (base, _) = upstream(|_| (StatusCode::TOO_MANY_REQUESTS, GEMINI_QUOTA.to_string())).await;
    let provider = GeminiProvider::with_api_key("test-key").with_base_url(base);

    let err = provider
        .generate_image(&ImagePrompt::new("a room"))
        .await
        .unwrap_err();
    assert!(is_quota_error(&err), "{err:#}");
}

#[tokio::test]
async fn test_openai_quota_versus_rate_limit() {
    let (base, quota_upstream) = upstream(|_| {
        (
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"type":"insufficient_quota","message":"Billing hard limit reached"}}"#
                .to_string(),
        )
    })
    .await;
    let provider = OpenAiProvider::with_api_key("test-key").with_base_url(&base);
    let err = provider
        .generate_image(&ImagePrompt::new("a room"))
        .await
        .unwrap_err();
    assert!(is_quota_error(&err), "{err:#}");

    let request = &quota_upstream.requests()[0];
    assert_eq!(request.uri, "/images/generations");
    assert_eq!(request.authorization.as_deref(), Some("Bearer test-key"));
    assert_eq!(request.json()["model"], "gpt-image-1");

    let (base, _) = upstream(|_| {
        (
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"type":"requests","message":"Rate limit reached"}}"#.to_string(),
        )
    })
    .await;
    let provider = OpenAiProvider::with_api_key("test-key").with_base_url(base);
    let err = provider
        .generate_image(&ImagePrompt::new("a room"))
        .await
        .unwrap_err();
    assert!(!is_quota_error(&err), "{err:#}");
}

#[tokio::test]
async fn test_gateway_stores_gemini_image_in_bucket() {
    let (base, upstream) = upstream(|uri| {
        if uri.contains("flash-image:generateContent") {
            (StatusCode::OK, gemini_image_body())
        } else if uri.contains(":generateContent") {
            (StatusCode::OK, gemini_text_body("A bright Boho living room"))
        } else {
            (StatusCode::OK, "{}".to_string())
        }
    })
    .await;
    let provider = GeminiProvider::with_api_key("test-key").with_base_url(&base);
    let store: Arc<dyn ImageStore> = Arc::new(
        BucketStore::new("rooms", "https://cdn.example.com/rooms").with_upload_base(&base),
    );
    let gateway = Gateway::new(Arc::new(provider)).with_store(Some(store));

    let reply = gateway
        .image(&ImageRequest {
            original_url: Some(png().to_data_uri()),
            style: "Boho".to_string(),
            params: None,
        })
        .await;
    assert!(reply.error.is_none(), "{reply:?}");
    assert!(reply
        .image_url
        .starts_with("https://cdn.example.com/rooms/ai-proposal-"));
    assert_eq!(reply.prompt.as_deref(), Some("A bright Boho living room"));

    let requests = upstream.requests();
    assert_eq!(requests.len(), 3);
    let render = requests[1].json();
    assert_eq!(render["contents"][0]["parts"][0]["inlineData"]["data"], SIM_IMAGE_PNG);
    assert_eq!(render["generationConfig"]["imageConfig"]["aspectRatio"], "16:9");
    assert!(requests[2].uri.starts_with("/rooms/o?"));
}

#[tokio::test]
async fn test_gateway_reports_gemini_quota() {
    let (base, _) = upstream(|uri| {
        if uri.contains("flash-image:generateContent") {
            (StatusCode::TOO_MANY_REQUESTS, GEMINI_QUOTA.to_string())
        } else {
            (StatusCode::OK, gemini_text_body("A calm bedroom"))
        }
    })
    .await;
    let provider = GeminiProvider::with_api_key("test-key").with_base_url(base);
    let gateway = Gateway::new(Arc::new(provider));

    let reply = gateway.image(&ImageRequest::default()).await;
    assert!(reply.quota_exceeded);
    assert_eq!(reply.image_url, FALLBACK_IMAGE_URL);
    assert_eq!(reply.error.as_deref(), Some("Quota exceeded (fallback)"));
}
