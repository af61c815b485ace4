//! Redesign image generation

use super::Gateway;
use crate::llm::{is_quota_error, AspectRatio, ImagePrompt, InlineImage, Message};
use crate::session::{catalog, lenient, ProjectParams, RoomType};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Shown in place of a proposal whenever generation fails
pub const FALLBACK_IMAGE_URL: &str = "https://placehold.co/800x600?text=AI+Proposal";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageRequest {
    /// Reference to the user's photo: URL, blob reference or `data:` URI
    #[serde(deserialize_with = "lenient::or_default")]
    pub original_url: Option<String>,
    #[serde(deserialize_with = "lenient::style")]
    pub style: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub params: Option<ProjectParams>,
}

impl Default for ImageRequest {
    fn default() -> Self {
        Self {
            original_url: None,
            style: catalog::default_style(),
            params: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageReply {
    pub image_url: String,
    /// Prompt the image model received; `null` on failure
    pub prompt: Option<String>,
    pub original_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub quota_exceeded: bool,
}

/// Result of one generation attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOutcome {
    Generated { image_url: String, prompt: String },
    QuotaExceeded { detail: String },
    Failed { detail: String },
}

impl ImageOutcome {
    fn from_error(err: &anyhow::Error) -> Self {
        let detail = format!("{:#}", err);
        if is_quota_error(err) {
            ImageOutcome::QuotaExceeded { detail }
        } else {
            ImageOutcome::Failed { detail }
        }
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, ImageOutcome::QuotaExceeded { .. })
    }
}

impl ImageReply {
    pub fn from_outcome(outcome: ImageOutcome, original_url: Option<String>) -> Self {
        match outcome {
            ImageOutcome::Generated { image_url, prompt } => Self {
                image_url,
                prompt: Some(prompt),
                original_url,
                ..Default::default()
            },
            ImageOutcome::QuotaExceeded { detail } => Self {
                image_url: FALLBACK_IMAGE_URL.to_string(),
                prompt: None,
                original_url,
                error: Some("Quota exceeded (fallback)".to_string()),
                error_detail: Some(detail),
                quota_exceeded: true,
            },
            ImageOutcome::Failed { detail } => Self {
                image_url: FALLBACK_IMAGE_URL.to_string(),
                prompt: None,
                original_url,
                error: Some("Failed to generate image (fallback)".to_string()),
                error_detail: Some(detail),
                quota_exceeded: false,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SampleRoomRequest {
    #[serde(deserialize_with = "lenient::label")]
    pub room_type: RoomType,
}

/// Generated sample photo; `image_url` is `None` when generation failed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SampleRoomReply {
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub quota_exceeded: bool,
}

fn redesign_prompt(request: &ImageRequest) -> String {
    let mut prompt = format!(
        "Write a single-sentence prompt for an image generation model. The image must be \
         a photorealistic redesign of the room in the reference photo in the {} interior \
         style. Keep the original architecture, layout, windows and perspective.",
        request.style
    );
    if let Some(params) = &request.params {
        prompt.push_str(&format!(
            " The room is a {} of about {} m2; use a {} color palette, a {} budget and a {} \
             level of boldness.",
            params.room_type,
            params.area_label(),
            params.palette(" and "),
            params.budget.label().to_lowercase(),
            params.boldness.label().to_lowercase(),
        ));
    }
    if let Some(url) = request.original_url.as_deref().filter(|u| !u.starts_with("data:")) {
        prompt.push_str(&format!(" Reference photo: {}.", url));
    }
    prompt.push_str(" Answer with the prompt only.");
    prompt
}

/// Image prompt used when the text model answers with nothing
fn default_image_prompt(request: &ImageRequest) -> String {
    format!(
        "Photorealistic interior redesign of this room in the {} style, same layout and \
         perspective, natural light, magazine quality.",
        request.style
    )
}

fn sample_room_prompt(room_type: RoomType) -> String {
    format!(
        "A high-quality photorealistic photograph of an empty or basically furnished {}, \
         natural lighting, neutral modern style, ready to be decorated. Wide angle, clean \
         architecture.",
        room_type.label().to_lowercase()
    )
}

impl Gateway {
    /// Two-step generation: ask the text model for a prompt, then render it
    pub async fn generate_image(&self, request: &ImageRequest) -> ImageOutcome {
        match self.try_generate_image(request).await {
            Ok((image_url, prompt)) => ImageOutcome::Generated { image_url, prompt },
            Err(e) => {
                tracing::error!("Image generation error: {:#}", e);
                ImageOutcome::from_error(&e)
            }
        }
    }

    async fn try_generate_image(&self, request: &ImageRequest) -> Result<(String, String)> {
        let response = self
            .provider
            .chat(&[Message::user(redesign_prompt(request))])
            .await
            .context("Prompt generation failed")?;
        let prompt = match response.text.trim() {
            "" => default_image_prompt(request),
            text => text.to_string(),
        };
        tracing::debug!(%prompt, "Generated image prompt");

        let source = request
            .original_url
            .as_deref()
            .and_then(InlineImage::from_data_uri)
            .filter(InlineImage::is_image);
        let image = self
            .provider
            .generate_image(
                &ImagePrompt::new(&prompt)
                    .with_source(source)
                    .with_aspect_ratio(AspectRatio::Wide),
            )
            .await
            .context("Image generation failed")?;

        Ok((self.deliver(image).await, prompt))
    }

    /// Redesign proposal for the HTTP surface
    pub async fn image(&self, request: &ImageRequest) -> ImageReply {
        let outcome = self.generate_image(request).await;
        ImageReply::from_outcome(outcome, request.original_url.clone())
    }

    /// Photo of an undecorated room to start a project from
    pub async fn sample_room(&self, request: &SampleRoomRequest) -> SampleRoomReply {
        let prompt = ImagePrompt::new(sample_room_prompt(request.room_type))
            .with_aspect_ratio(AspectRatio::Wide);
        match self.provider.generate_image(&prompt).await {
            Ok(image) => SampleRoomReply {
                image_url: Some(self.deliver(image).await),
                ..Default::default()
            },
            Err(e) => {
                tracing::error!("Sample room generation error: {:#}", e);
                let quota_exceeded = is_quota_error(&e);
                SampleRoomReply {
                    image_url: None,
                    error: Some(if quota_exceeded {
                        "Quota exceeded".to_string()
                    } else {
                        "Failed to generate sample room".to_string()
                    }),
                    quota_exceeded,
                }
            }
        }
    }
}
