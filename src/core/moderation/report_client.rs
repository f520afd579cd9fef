// Reporting client - ships rule-execution logs to the backend.
//
// Reporting is strictly observational: a failed submission is counted and
// remembered for the debug endpoint, never surfaced to the moderation
// pipeline and never retried.

use super::backend::ModerationBackend;
use super::moderation_models::ModerationReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Cap on remembered failures; oldest entries fall off the back.
const MAX_RECENT_FAILURES: usize = 20;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFailure {
    pub timestamp: DateTime<Utc>,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Operator-facing snapshot. Exposes whether a key is configured and how
/// long it is, never the key itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportingDebugInfo {
    pub backend_url: String,
    pub api_key_configured: bool,
    pub api_key_length: usize,
    pub success_count: u64,
    pub failure_count: u64,
    pub recent_failures: Vec<ReportFailure>,
}

pub struct ReportingClient<B: ModerationBackend> {
    backend: Arc<B>,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    /// Newest first.
    recent_failures: Mutex<VecDeque<ReportFailure>>,
}

impl<B: ModerationBackend> ReportingClient<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            recent_failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Posts one report. Never returns an error; the caller has nothing
    /// useful to do with one.
    pub async fn submit(&self, report: &ModerationReport) {
        match self.backend.submit_report(report).await {
            Ok(()) => {
                self.success_count.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(rule_id = %report.rule_id, "Reported rule execution to backend");
            }
            Err(err) => {
                self.failure_count.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    rule_id = %report.rule_id,
                    error = %err,
                    status = ?err.http_status(),
                    "Failed to report rule execution to backend"
                );

                let failure = ReportFailure {
                    timestamp: Utc::now(),
                    error: err.to_string(),
                    status: err.http_status(),
                    body: err.http_body().map(|b| b.to_string()),
                    url: err.url().map(|u| u.to_string()),
                };

                let mut failures = self.recent_failures.lock().unwrap();
                failures.push_front(failure);
                failures.truncate(MAX_RECENT_FAILURES);
            }
        }
    }

    pub fn debug_snapshot(&self) -> ReportingDebugInfo {
        ReportingDebugInfo {
            backend_url: self.backend.base_url().to_string(),
            api_key_configured: self.backend.api_key_len() > 0,
            api_key_length: self.backend.api_key_len(),
            success_count: self.success_count.load(Ordering::Relaxed),
            failure_count: self.failure_count.load(Ordering::Relaxed),
            recent_failures: self
                .recent_failures
                .lock()
                .unwrap()
                .iter()
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::backend::BackendError;
    use crate::core::moderation::moderation_models::RulePayload;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;

    struct MockBackend {
        fail: AtomicBool,
        counter: AtomicU64,
    }

    impl MockBackend {
        fn new(fail: bool) -> Self {
            Self {
                fail: AtomicBool::new(fail),
                counter: AtomicU64::new(0),
            }
        }
    }

    #[async_trait]
    impl ModerationBackend for MockBackend {
        async fn fetch_rules(&self) -> Result<Vec<RulePayload>, BackendError> {
            Ok(vec![])
        }

        async fn submit_report(&self, _report: &ModerationReport) -> Result<(), BackendError> {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                Err(BackendError::Status {
                    status: 500,
                    body: format!("boom {n}"),
                    url: "http://backend.example/api/moderation/internal/logs".to_string(),
                })
            } else {
                Ok(())
            }
        }

        fn base_url(&self) -> &str {
            "http://backend.example"
        }

        fn api_key_len(&self) -> usize {
            12
        }
    }

    fn report() -> ModerationReport {
        ModerationReport {
            rule_id: "rule".to_string(),
            guild_id: "1".to_string(),
            target_user_id: "2".to_string(),
            target_user_tag: "user#0".to_string(),
            channel_id: "3".to_string(),
            message_id: "4".to_string(),
            message_content: "hi".to_string(),
            message_attachments: vec![],
            action_results: vec![],
            triggered_at: Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn success_increments_counter_only() {
        let client = ReportingClient::new(Arc::new(MockBackend::new(false)));
        client.submit(&report()).await;
        client.submit(&report()).await;

        let debug = client.debug_snapshot();
        assert_eq!(debug.success_count, 2);
        assert_eq!(debug.failure_count, 0);
        assert!(debug.recent_failures.is_empty());
    }

    #[tokio::test]
    async fn failures_are_capped_at_twenty_newest_first() {
        let client = ReportingClient::new(Arc::new(MockBackend::new(true)));
        for _ in 0..25 {
            client.submit(&report()).await;
        }

        let debug = client.debug_snapshot();
        assert_eq!(debug.failure_count, 25);
        assert_eq!(debug.recent_failures.len(), 20);
        // Newest submission (index 24) sits at the front.
        assert_eq!(debug.recent_failures[0].body.as_deref(), Some("boom 24"));
        assert_eq!(debug.recent_failures[19].body.as_deref(), Some("boom 5"));
        assert_eq!(debug.recent_failures[0].status, Some(500));
    }

    #[tokio::test]
    async fn debug_snapshot_exposes_key_length_not_value() {
        let client = ReportingClient::new(Arc::new(MockBackend::new(false)));
        let debug = client.debug_snapshot();

        assert_eq!(debug.backend_url, "http://backend.example");
        assert!(debug.api_key_configured);
        assert_eq!(debug.api_key_length, 12);

        let serialized = serde_json::to_string(&debug).unwrap();
        assert!(!serialized.contains("apiKey\":"), "no raw key field");
    }
}
