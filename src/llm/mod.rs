//! LLM provider implementations

use crate::config::LlmConfig;

mod error;
mod gemini;
mod openai;
mod sim;
mod types;

pub use error::{is_quota_error, LlmError};
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use sim::{SimProvider, SimScenario, SIM_IMAGE_PNG};
pub use types::*;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Trait for generative AI providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Send a chat completion request
    async fn chat(&self, messages: &[Message]) -> Result<LlmResponse>;

    /// Send a chat completion request that must answer with JSON
    ///
    /// Providers with a native JSON mode should override this; the default
    /// relies on the prompt alone.
    async fn chat_json(&self, messages: &[Message]) -> Result<LlmResponse> {
        self.chat(messages).await
    }

    /// Generate exactly one image
    async fn generate_image(&self, request: &ImagePrompt) -> Result<InlineImage>;
}

/// Build the HTTP client shared by a provider
pub(crate) fn http_client(config: &LlmConfig) -> reqwest::Client {
    let mut builder = reqwest::Client::builder();
    if config.request_timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
    }
    builder.build().unwrap_or_else(|e| {
        tracing::warn!("Falling back to default HTTP client: {}", e);
        reqwest::Client::new()
    })
}

/// Create an LLM provider based on name
///
/// Fails when the provider is unknown or its API key is missing; the error
/// message names the missing variable.
pub fn create_provider(name: &str, config: &LlmConfig) -> Result<Box<dyn LlmProvider>> {
    match name.to_lowercase().as_str() {
        "gemini" | "google" => {
            let p = GeminiProvider::new()?
                .with_client(http_client(config))
                .with_model(&config.gemini.model)
                .with_image_model(&config.gemini.image_model)
                .with_max_tokens(config.gemini.max_tokens);
            Ok(Box::new(p))
        }
        "openai" | "gpt" => {
            let p = OpenAiProvider::new()?
                .with_client(http_client(config))
                .with_model(&config.openai.model)
                .with_image_model(&config.openai.image_model)
                .with_max_tokens(config.openai.max_tokens);
            Ok(Box::new(p))
        }
        "sim" | "test" => Ok(Box::new(SimProvider::new().with_scenario(SimScenario::from_env()))),
        _ => anyhow::bail!(
            "Unknown AI provider: {}. Supported: gemini, openai, sim",
            name
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider() {
        let err = create_provider("claude", &LlmConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unknown AI provider"));
    }

    #[test]
    fn test_sim_provider_needs_no_key() {
        let provider = create_provider("sim", &LlmConfig::default()).unwrap();
        assert_eq!(provider.name(), "sim");
    }
}
