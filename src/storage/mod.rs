//! Persistence of generated images
//!
//! Generated images are stored once and referenced by public URL so clients
//! do not have to carry multi-megabyte `data:` URIs around. Without a
//! configured store the gateway falls back to inline data URIs.

use crate::config::StorageConfig;
use crate::llm::InlineImage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Google Cloud Storage JSON API upload endpoint
const GCS_UPLOAD_BASE: &str = "https://storage.googleapis.com/upload/storage/v1/b";

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist an image and return its public URL
    async fn put(&self, image: &InlineImage) -> Result<String>;
}

/// Unique object name for a generated image
pub fn object_name(image: &InlineImage) -> String {
    format!(
        "ai-proposal-{}-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        &uuid::Uuid::new_v4().simple().to_string()[..8],
        image.extension()
    )
}

/// Public bucket on Google Cloud Storage
pub struct BucketStore {
    client: reqwest::Client,
    bucket: String,
    base_url: String,
    token: Option<String>,
    upload_base: String,
}

impl BucketStore {
    pub fn new(bucket: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bucket: bucket.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            upload_base: GCS_UPLOAD_BASE.to_string(),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_upload_base(mut self, upload_base: impl Into<String>) -> Self {
        self.upload_base = upload_base.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ImageStore for BucketStore {
    async fn put(&self, image: &InlineImage) -> Result<String> {
        let name = object_name(image);
        let bytes = image.decode()?;
        let url = format!(
            "{}/{}/o?uploadType=media&predefinedAcl=publicRead&name={}",
            self.upload_base, self.bucket, name
        );

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", image.mime_type.as_str())
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to upload {} to bucket {}", name, self.bucket))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Bucket upload rejected ({}): {}", status, body);
        }

        tracing::info!(bucket = %self.bucket, object = %name, "Stored generated image");
        Ok(format!("{}/{}", self.base_url, name))
    }
}

/// Directory on local disk, exposed by the HTTP server
pub struct LocalStore {
    dir: PathBuf,
    base_url: String,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

#[async_trait]
impl ImageStore for LocalStore {
    async fn put(&self, image: &InlineImage) -> Result<String> {
        let name = object_name(image);
        let bytes = image.decode()?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.dir.join(&name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!(path = %path.display(), "Stored generated image");
        Ok(format!("{}/{}", self.base_url, name))
    }
}

/// Build the configured store, if any
///
/// `default_local_base` is used for a local directory without an explicit
/// public URL (normally the server's own `/generated` route).
pub fn from_config(
    config: &StorageConfig,
    default_local_base: &str,
) -> Option<Arc<dyn ImageStore>> {
    if let (Some(bucket), Some(base_url)) =
        (config.bucket_name.clone(), config.bucket_base_url())
    {
        tracing::info!("Generated images go to bucket {}", bucket);
        return Some(Arc::new(
            BucketStore::new(bucket, base_url).with_token(config.bucket_token.clone()),
        ));
    }
    if let Some(dir) = &config.local_dir {
        let base_url = config
            .local_base_url
            .clone()
            .unwrap_or_else(|| default_local_base.to_string());
        tracing::info!("Generated images go to {}", dir.display());
        return Some(Arc::new(LocalStore::new(dir.clone(), base_url)));
    }
    None
}
