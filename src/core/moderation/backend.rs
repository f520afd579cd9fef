// Backend port - the HTTP API that supplies rules and receives logs.
//
// The trait lives in core, the reqwest implementation lives in infra.

use super::moderation_models::{ModerationReport, RulePayload};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The pre-shared key is not configured; the affected feature no-ops.
    #[error("Backend API key is not configured")]
    MissingApiKey,

    /// Transport-level failure (connect, timeout, body read).
    #[error("Request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("Backend returned {status} for {url}")]
    Status {
        status: u16,
        body: String,
        url: String,
    },
}

impl BackendError {
    pub fn http_status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn http_body(&self) -> Option<&str> {
        match self {
            BackendError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            BackendError::Status { url, .. } => Some(url),
            _ => None,
        }
    }
}

/// Outbound calls to the moderation backend.
#[async_trait]
pub trait ModerationBackend: Send + Sync {
    /// Fetch the enabled rule set.
    async fn fetch_rules(&self) -> Result<Vec<RulePayload>, BackendError>;

    /// Post one rule-execution report.
    async fn submit_report(&self, report: &ModerationReport) -> Result<(), BackendError>;

    /// Base URL, exposed for diagnostics.
    fn base_url(&self) -> &str;

    /// Length of the configured API key (0 when unset). The key itself is
    /// never exposed.
    fn api_key_len(&self) -> usize;
}
