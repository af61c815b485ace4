//! Provider gateway
//!
//! One-shot adapters between a design session and a generative AI provider.
//! Every operation returns a usable payload: provider failures are logged and
//! replaced by a static fallback, never propagated to the caller.

mod chat;
mod image;
mod suggestions;

pub use chat::{ChatReply, ChatRequest, DesignContext, HistoryEntry, CHAT_APOLOGY};
pub use image::{
    ImageOutcome, ImageReply, ImageRequest, SampleRoomReply, SampleRoomRequest,
    FALLBACK_IMAGE_URL,
};
pub use suggestions::{
    fallback_suggestions, normalize_suggestions, parse_suggestions, SuggestionsReply,
    SuggestionsRequest, PLACEHOLDER_TITLE, SUGGESTION_COUNT,
};

use crate::config::Config;
use crate::llm::{self, InlineImage, LlmProvider};
use crate::storage::{self, ImageStore};
use anyhow::Result;
use std::sync::Arc;

pub struct Gateway {
    provider: Arc<dyn LlmProvider>,
    store: Option<Arc<dyn ImageStore>>,
}

impl Gateway {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Option<Arc<dyn ImageStore>>) -> Self {
        self.store = store;
        self
    }

    /// Build the gateway for the configured provider and image store
    ///
    /// Fails only on configuration problems (unknown provider, missing key).
    pub fn from_config(config: &Config, default_local_base: &str) -> Result<Self> {
        let provider: Arc<dyn LlmProvider> =
            Arc::from(llm::create_provider(&config.llm.provider, &config.llm)?);
        tracing::info!("Using AI provider: {}", provider.name());
        Ok(Self::new(provider).with_store(storage::from_config(&config.storage, default_local_base)))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Turn generated bytes into a reference the client can display
    ///
    /// Stored images are referenced by URL; without a store, or when the
    /// upload fails, the image travels back as a `data:` URI.
    async fn deliver(&self, image: InlineImage) -> String {
        if let Some(store) = &self.store {
            match store.put(&image).await {
                Ok(url) => return url,
                Err(e) => tracing::warn!("Image upload failed, returning inline data: {:#}", e),
            }
        }
        image.to_data_uri()
    }
}
