// HTTP client for the moderation backend. It deliberately exposes only
// the two calls the core layer needs: pulling the enabled rule set and
// posting execution logs.

use crate::core::moderation::{BackendError, ModerationBackend, ModerationReport, RulePayload};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 5;

pub struct BackendApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl BackendApiClient {
    /// `api_key` may be absent; every call then fails fast with
    /// `MissingApiKey` and the caller decides how loudly to complain.
    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
        })
    }

    fn key(&self) -> Result<&str, BackendError> {
        self.api_key.as_deref().ok_or(BackendError::MissingApiKey)
    }

    async fn check_status(resp: reqwest::Response, url: &str) -> Result<reqwest::Response, BackendError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
            url: url.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RulesResponse {
    #[serde(default)]
    rules: Vec<RulePayload>,
}

#[async_trait]
impl ModerationBackend for BackendApiClient {
    async fn fetch_rules(&self) -> Result<Vec<RulePayload>, BackendError> {
        let key = self.key()?;
        let url = format!("{}/api/moderation/internal/rules", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(&[("enabled", "true")])
            .header("x-api-key", key)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let resp = Self::check_status(resp, &url).await?;
        let payload: RulesResponse = resp
            .json()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        Ok(payload.rules)
    }

    async fn submit_report(&self, report: &ModerationReport) -> Result<(), BackendError> {
        let key = self.key()?;
        let url = format!("{}/api/moderation/internal/logs", self.base_url);

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", key)
            .json(report)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        Self::check_status(resp, &url).await?;
        Ok(())
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key_len(&self) -> usize {
        self.api_key.as_deref().map(str::len).unwrap_or(0)
    }
}
