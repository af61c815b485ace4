//! Google Gemini provider implementation
//!
//! SECURITY: API keys are ONLY sent to official Google endpoints (or to an
//! explicitly configured base URL).

use super::{
    ImagePrompt, InlineImage, LlmError, LlmProvider, LlmResponse, Message, Role, TokenUsage,
};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;

/// Official Google Gemini API endpoint
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    image_model: String,
    max_tokens: usize,
}

impl GeminiProvider {
    pub fn new() -> Result<Self> {
        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY is missing"))?;
        Ok(Self::with_api_key(api_key))
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: GEMINI_API_BASE.to_string(),
            model: "gemini-2.0-flash".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            max_tokens: 8192,
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

    fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<GeminiContent>) {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut contents = Vec::new();

        for msg in messages {
            let role = match msg.role {
                Role::System => {
                    system_parts.push(&msg.content);
                    continue;
                }
                Role::User => "user",
                Role::Assistant => "model",
            };
            contents.push(GeminiContent {
                role: role.to_string(),
                parts: vec![GeminiPart::Text {
                    text: msg.content.clone(),
                }],
            });
        }

        let system_instruction = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };
        (system_instruction, contents)
    }

    fn text_request(&self, messages: &[Message], json: bool) -> GeminiRequest {
        let (system_instruction, contents) = Self::convert_messages(messages);
        GeminiRequest {
            contents,
            system_instruction: system_instruction.map(|text| GeminiSystemInstruction {
                parts: vec![GeminiPart::Text { text }],
            }),
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: Some(self.max_tokens),
                temperature: Some(1.0),
                response_mime_type: json.then(|| "application/json".to_string()),
                ..Default::default()
            }),
        }
    }

    /// Image generation body; the 2.0 preview models take no `imageConfig`
    fn image_request(&self, request: &ImagePrompt) -> GeminiRequest {
        let mut parts = Vec::with_capacity(2);
        if let Some(source) = &request.source {
            parts.push(GeminiPart::InlineData {
                inline_data: GeminiBlob {
                    mime_type: source.mime_type.clone(),
                    data: source.data.clone(),
                },
            });
        }
        parts.push(GeminiPart::Text {
            text: request.prompt.clone(),
        });

        let image_config =
            (!self.image_model.starts_with("gemini-2.0")).then(|| GeminiImageConfig {
                aspect_ratio: request.aspect_ratio.as_str().to_string(),
            });
        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts,
            }],
            system_instruction: None,
            generation_config: Some(GeminiGenerationConfig {
                response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
                image_config,
                ..Default::default()
            }),
        }
    }

    async fn send_request(&self, model: &str, request: &GeminiRequest) -> Result<GeminiResponse> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(LlmError::from_network_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_http_status(status, error_text).into());
        }

        let parsed = response.json::<GeminiResponse>().await.map_err(|e| {
            LlmError::Other(anyhow::anyhow!("Failed to parse Gemini response: {}", e))
        })?;
        Ok(parsed)
    }

    async fn chat_inner(&self, messages: &[Message], json: bool) -> Result<LlmResponse> {
        let request = self.text_request(messages, json);
        let response = self.send_request(&self.model, &request).await?;
        tracing::debug!(model = %self.model, "Gemini text response received");

        Ok(LlmResponse {
            text: response.text(),
            usage: response.usage(),
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn chat(&self, messages: &[Message]) -> Result<LlmResponse> {
        self.chat_inner(messages, false).await
    }

    async fn chat_json(&self, messages: &[Message]) -> Result<LlmResponse> {
        self.chat_inner(messages, true).await
    }

    async fn generate_image(&self, request: &ImagePrompt) -> Result<InlineImage> {
        let body = self.image_request(request);
        let response = self.send_request(&self.image_model, &body).await?;
        response.first_image().ok_or_else(|| {
            LlmError::EmptyResponse(format!("No image data returned by {}", self.image_model))
                .into()
        })
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
    /// Parts this client does not use (thoughts, function calls, ...)
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiBlob {
    #[serde(default = "default_mime_type")]
    mime_type: String,
    data: String,
}

fn default_mime_type() -> String {
    "image/png".to_string()
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<GeminiImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    aspect_ratio: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

impl GeminiResponse {
    fn parts(&self) -> impl Iterator<Item = &GeminiPart> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|content| content.parts.iter())
    }

    fn text(&self) -> String {
        self.parts()
            .filter_map(|part| match part {
                GeminiPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    fn first_image(&self) -> Option<InlineImage> {
        self.parts().find_map(|part| match part {
            GeminiPart::InlineData { inline_data } if !inline_data.data.is_empty() => Some(
                InlineImage::new(inline_data.mime_type.clone(), inline_data.data.clone()),
            ),
            _ => None,
        })
    }

    fn usage(&self) -> Option<TokenUsage> {
        self.usage_metadata.as_ref().map(|u| TokenUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    /// Missing when the candidate was blocked
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}
