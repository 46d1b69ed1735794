//! hookedit remote API façade.
//!
//! Front-ends and the edit session depend on [`WebhookApi`]; the concrete
//! transport is either [`HttpApi`] (the application server's REST surface) or
//! [`MockApi`] (in-memory, for tests and offline demos).

#![forbid(unsafe_code)]

use std::time::Duration;

use hookedit_core::{FieldSelector, Patch, Webhook, WebhookIds};
use serde::{Deserialize, Serialize};

mod http;
mod mock;

pub use http::{update_body, HttpApi};
pub use mock::{MockApi, MockCall};

/// Remote API errors. Cloneable so a stored fetch failure can be re-surfaced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ApiError {
    #[error("not_found: {0}")]
    NotFound(String),
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("permission_denied: {0}")]
    PermissionDenied(String),
    #[error("remote: HTTP {status}: {body}")]
    Remote { status: u16, body: String },
    #[error("transport: {0}")]
    Transport(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("config: {0}")]
    Config(String),
}

impl ApiError {
    /// Classify a non-2xx response.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => ApiError::Unauthenticated(body),
            403 => ApiError::PermissionDenied(body),
            404 => ApiError::NotFound(body),
            _ => ApiError::Remote { status, body },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Remote read/update/delete of a single webhook.
#[async_trait::async_trait]
pub trait WebhookApi: Send + Sync {
    /// Fetch the webhook restricted to `selector` (identity is always returned).
    async fn get(&self, ids: &WebhookIds, selector: FieldSelector) -> ApiResult<Webhook>;

    /// Field-masked partial update; only the fields in `patch` are written.
    async fn update(&self, ids: &WebhookIds, patch: &Patch) -> ApiResult<()>;

    async fn delete(&self, ids: &WebhookIds) -> ApiResult<()>;
}

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for [`HttpApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Server root, e.g. `https://eu1.cloud.example.com`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), api_key: None, timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS) }
    }

    /// Read `HOOKEDIT_API_URL` (required), `HOOKEDIT_API_KEY` and `HOOKEDIT_TIMEOUT_SECS`.
    pub fn from_env() -> ApiResult<Self> {
        let base_url = std::env::var("HOOKEDIT_API_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ApiError::Config("HOOKEDIT_API_URL is not set".into()))?;
        let api_key = std::env::var("HOOKEDIT_API_KEY").ok().filter(|s| !s.is_empty());
        let timeout_secs = std::env::var("HOOKEDIT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Ok(Self { base_url, api_key, timeout: Duration::from_secs(timeout_secs) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_error_kinds() {
        assert_eq!(ApiError::from_status(404, "gone".into()), ApiError::NotFound("gone".into()));
        assert_eq!(ApiError::from_status(401, "x".into()), ApiError::Unauthenticated("x".into()));
        assert_eq!(ApiError::from_status(403, "x".into()), ApiError::PermissionDenied("x".into()));
        assert_eq!(
            ApiError::from_status(500, "boom".into()),
            ApiError::Remote { status: 500, body: "boom".into() }
        );
        assert!(ApiError::from_status(404, String::new()).is_not_found());
    }

    #[test]
    fn config_defaults_timeout() {
        let cfg = ApiConfig::new("http://localhost:1885");
        assert_eq!(cfg.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(cfg.api_key.is_none());
    }
}
