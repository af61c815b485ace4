//! OpenAI provider implementation
//!
//! SECURITY: API keys are ONLY sent to official OpenAI endpoints (or to an
//! explicitly configured base URL).

use super::{
    AspectRatio, ImagePrompt, InlineImage, LlmError, LlmProvider, LlmResponse, Message,
    TokenUsage,
};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;

/// Official OpenAI API endpoint - API key is ONLY sent here
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    image_model: String,
    max_tokens: usize,
}

impl OpenAiProvider {
    pub fn new() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is missing"))?;
        Ok(Self::with_api_key(api_key))
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: OPENAI_API_BASE.to_string(),
            model: "gpt-4o-mini".to_string(),
            image_model: "gpt-image-1".to_string(),
            max_tokens: 4096,
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_image_model(mut self, model: &str) -> Self {
        self.image_model = model.to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(LlmError::from_network_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_http_status(status, error_text).into());
        }

        let parsed = response.json::<Resp>().await.map_err(|e| {
            LlmError::Other(anyhow::anyhow!("Failed to parse OpenAI response: {}", e))
        })?;
        Ok(parsed)
    }

    /// Sizes each image model family accepts; dall-e-2 is square only
    fn image_size(&self, aspect_ratio: AspectRatio) -> &'static str {
        match aspect_ratio {
            AspectRatio::Square => "1024x1024",
            AspectRatio::Wide if self.image_model.starts_with("dall-e-2") => "1024x1024",
            AspectRatio::Wide if self.image_model.starts_with("dall-e") => "1792x1024",
            AspectRatio::Wide => "1536x1024",
        }
    }

    fn image_request<'a>(&'a self, request: &'a ImagePrompt) -> ImageGenerationRequest<'a> {
        // gpt-image models always answer in base64 and reject `response_format`
        let is_dalle = self.image_model.starts_with("dall-e");
        ImageGenerationRequest {
            model: &self.image_model,
            prompt: &request.prompt,
            n: 1,
            size: self.image_size(request.aspect_ratio),
            response_format: is_dalle.then_some("b64_json"),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, messages: &[Message]) -> Result<LlmResponse> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| ChatCompletionMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            max_tokens: self.max_tokens,
        };

        let response: ChatCompletionResponse = self.post("chat/completions", &request).await?;
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(LlmResponse {
            text,
            usage: response.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }

    async fn generate_image(&self, request: &ImagePrompt) -> Result<InlineImage> {
        if request.source.is_some() {
            // The generations endpoint is text-only; edits need multipart uploads.
            tracing::debug!("OpenAI image generation ignores the source photo");
        }

        let body = self.image_request(request);
        let response: ImageGenerationResponse = self.post("images/generations", &body).await?;
        response
            .data
            .into_iter()
            .find_map(|d| d.b64_json)
            .filter(|data| !data.is_empty())
            .map(|data| InlineImage::new("image/png", data))
            .ok_or_else(|| {
                LlmError::EmptyResponse(format!("No image data returned by {}", self.image_model))
                    .into()
            })
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionMessage<'a>>,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct ChatCompletionMessage<'a> {
    role: super::Role,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}
