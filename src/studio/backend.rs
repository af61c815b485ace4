//! Where the Studio sends its AI requests

use crate::gateway::{
    ChatReply, ChatRequest, Gateway, ImageReply, ImageRequest, SampleRoomReply,
    SampleRoomRequest, SuggestionsReply, SuggestionsRequest,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

/// Request/response surface of the provider gateway
///
/// Implemented in-process by [`Gateway`] and over HTTP by [`HttpBackend`].
/// An `Err` means the gateway itself could not be reached; provider
/// failures arrive as fallback payloads.
#[async_trait]
pub trait DesignBackend: Send + Sync {
    async fn request_chat(&self, request: &ChatRequest) -> Result<ChatReply>;

    async fn request_suggestions(&self, request: &SuggestionsRequest) -> Result<SuggestionsReply>;

    async fn request_image(&self, request: &ImageRequest) -> Result<ImageReply>;

    async fn request_sample_room(&self, request: &SampleRoomRequest) -> Result<SampleRoomReply>;
}

#[async_trait]
impl DesignBackend for Gateway {
    async fn request_chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        Ok(self.chat(request).await)
    }

    async fn request_suggestions(&self, request: &SuggestionsRequest) -> Result<SuggestionsReply> {
        Ok(self.suggestions(request).await)
    }

    async fn request_image(&self, request: &ImageRequest) -> Result<ImageReply> {
        Ok(self.image(request).await)
    }

    async fn request_sample_room(&self, request: &SampleRoomRequest) -> Result<SampleRoomReply> {
        Ok(self.sample_room(request).await)
    }
}

/// Client for a running `decor serve` instance
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("Invalid server URL: {}", base_url))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.base_url.join(path)?;
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("API error {}: {}", status.as_u16(), text);
        }

        response
            .json()
            .await
            .with_context(|| format!("Invalid response from {}", url))
    }
}

#[async_trait]
impl DesignBackend for HttpBackend {
    async fn request_chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.post("api/chat", request).await
    }

    async fn request_suggestions(&self, request: &SuggestionsRequest) -> Result<SuggestionsReply> {
        self.post("api/suggestions", request).await
    }

    async fn request_image(&self, request: &ImageRequest) -> Result<ImageReply> {
        self.post("api/image", request).await
    }

    async fn request_sample_room(&self, request: &SampleRoomRequest) -> Result<SampleRoomReply> {
        self.post("api/sample-room", request).await
    }
}
