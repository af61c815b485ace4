//! Configuration management for decor-studio
//!
//! Settings come from `config.toml` in the platform config directory, then
//! from the process environment (`AI_PROVIDER`, `IMAGE_BUCKET_*`), which
//! always wins. API keys are never stored in the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Active provider: "gemini", "openai" or "sim"
    pub provider: String,
    /// Timeout applied to every provider request, in seconds (0 = client default)
    pub request_timeout_secs: u64,
    pub gemini: GeminiConfig,
    pub openai: OpenAiConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            request_timeout_secs: 0,
            gemini: GeminiConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub model: String,
    pub image_model: String,
    pub max_tokens: usize,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            max_tokens: 8192,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub model: String,
    pub image_model: String,
    pub max_tokens: usize,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            image_model: "gpt-image-1".to_string(),
            max_tokens: 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Where generated images are persisted
///
/// A bucket wins over a local directory; with neither, images travel back
/// inline as `data:` URIs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket_name: Option<String>,
    /// Public base URL of the bucket (default: `https://storage.googleapis.com/<bucket>`)
    pub bucket_base_url: Option<String>,
    /// Bearer token used for uploads. Usually provided via `IMAGE_BUCKET_TOKEN`.
    #[serde(skip_serializing)]
    pub bucket_token: Option<String>,
    /// Directory served by the HTTP server under `/generated`
    pub local_dir: Option<PathBuf>,
    /// Public base URL for files in `local_dir` (default derived from the server address)
    pub local_base_url: Option<String>,
}

impl StorageConfig {
    /// Public base URL of the configured bucket, if any
    pub fn bucket_base_url(&self) -> Option<String> {
        let bucket = self.bucket_name.as_deref()?;
        Some(
            self.bucket_base_url
                .clone()
                .unwrap_or_else(|| format!("https://storage.googleapis.com/{}", bucket)),
        )
    }
}

impl Config {
    /// Load configuration from default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load a configuration file, returning defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "decor-studio") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            Ok(PathBuf::from("config.toml"))
        }
    }

    /// Apply environment overrides using the given lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = get("AI_PROVIDER") {
            self.llm.provider = provider.trim().to_lowercase();
        }
        if let Some(bucket) = get("IMAGE_BUCKET_NAME").or_else(|| get("PUBLIC_IMAGE_BUCKET")) {
            self.storage.bucket_name = Some(bucket);
        }
        if let Some(base_url) = get("IMAGE_BUCKET_BASE_URL") {
            self.storage.bucket_base_url = Some(base_url.trim_end_matches('/').to_string());
        }
        if let Some(token) = get("IMAGE_BUCKET_TOKEN") {
            self.storage.bucket_token = Some(token);
        }
    }
}
