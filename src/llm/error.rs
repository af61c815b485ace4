//! Typed errors for LLM operations
//!
//! Lets the gateway tell quota exhaustion apart from every other provider
//! failure without string matching at the call site.

use thiserror::Error;

/// LLM operation errors with typed variants
///
/// - `Unauthorized` (401/403) - key rejected
/// - `QuotaExceeded` (429 with a quota/billing body) - the account ran dry
/// - `RateLimited` (429) - too many requests right now
/// - `BadRequest` (400) - malformed request
/// - `ServiceError` (5xx) - server-side issue
/// - `Network` - connection/timeout
/// - `EmptyResponse` - the model answered without the expected payload
/// - `Other` - catch-all
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl LlmError {
    /// Check if this error means the provider account has no quota left
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, LlmError::QuotaExceeded(_))
    }

    /// Check if this error is an auth issue
    pub fn is_auth_error(&self) -> bool {
        matches!(self, LlmError::Unauthorized(_))
    }

    /// Convert HTTP status code and error text into typed LlmError
    pub fn from_http_status(status: reqwest::StatusCode, error_text: String) -> Self {
        match status.as_u16() {
            401 | 403 => LlmError::Unauthorized(error_text),
            429 if mentions_quota(&error_text) => LlmError::QuotaExceeded(error_text),
            429 => LlmError::RateLimited(error_text),
            400 => LlmError::BadRequest(error_text),
            500..=599 => LlmError::ServiceError(error_text),
            _ => LlmError::Other(anyhow::anyhow!("HTTP {}: {}", status, error_text)),
        }
    }

    /// Convert network/connection errors into typed LlmError
    pub fn from_network_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Network(format!("Request timeout: {}", e))
        } else if e.is_connect() {
            LlmError::Network(format!("Connection failed: {}", e))
        } else if let Some(status) = e.status() {
            let error_text = e.to_string();
            Self::from_http_status(status, error_text)
        } else {
            LlmError::Other(e.into())
        }
    }
}

/// Gemini reports `RESOURCE_EXHAUSTED`, OpenAI `insufficient_quota`
fn mentions_quota(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("resource_exhausted")
        || lower.contains("insufficient_quota")
        || lower.contains("quota")
        || lower.contains("billing")
}

/// Whether an error chain carries a quota exhaustion from a provider
pub fn is_quota_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<LlmError>()
            .is_some_and(LlmError::is_quota_exceeded)
    })
}
