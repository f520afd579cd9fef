// Moderation orchestrator - the per-message entry point.
//
// Walks the cached rules in priority order, applies exemptions, evaluates
// triggers, executes actions and reports the outcome. Every active rule is
// evaluated independently and in full: a message can violate several rules
// at once and each produces its own action set and report.

use super::action_executor::{ActionExecutor, ModerationGateway};
use super::backend::ModerationBackend;
use super::moderation_models::{IncomingMessage, ModerationReport};
use super::report_client::ReportingClient;
use super::rule_cache::RuleCache;
use super::spam_tracker::SpamTracker;
use super::trigger_evaluator::TriggerEvaluator;
use std::sync::Arc;

pub struct ModerationService<G: ModerationGateway, B: ModerationBackend> {
    rules: Arc<RuleCache>,
    evaluator: TriggerEvaluator,
    executor: ActionExecutor<G>,
    reporter: Arc<ReportingClient<B>>,
}

impl<G: ModerationGateway, B: ModerationBackend> ModerationService<G, B> {
    pub fn new(
        rules: Arc<RuleCache>,
        spam: Arc<SpamTracker>,
        gateway: Arc<G>,
        reporter: Arc<ReportingClient<B>>,
    ) -> Self {
        Self {
            rules,
            evaluator: TriggerEvaluator::new(spam),
            executor: ActionExecutor::new(gateway),
            reporter,
        }
    }

    pub fn rule_cache(&self) -> &Arc<RuleCache> {
        &self.rules
    }

    /// Evaluates one incoming message against every active rule. Never
    /// fails: problems inside a single rule are logged and the remaining
    /// rules still run.
    pub async fn evaluate_message(&self, message: &IncomingMessage) {
        let rules = self.rules.all_rules();
        if rules.is_empty() {
            return;
        }

        for rule in rules {
            if TriggerEvaluator::is_exempt(message, &rule) {
                continue;
            }

            if !self
                .evaluator
                .evaluate(message, &rule.trigger, message.timestamp)
            {
                continue;
            }

            tracing::info!(
                rule_id = %rule.id,
                rule_name = %rule.name,
                user = %message.author_tag,
                "Moderation rule triggered"
            );

            let results = self.executor.execute_actions(message, &rule.actions).await;

            tracing::debug!(
                rule_id = %rule.id,
                actions = results.len(),
                "Reporting action results to backend"
            );
            let report = ModerationReport::new(message, &rule, results);
            self.reporter.submit(&report).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::action_executor::GatewayError;
    use crate::core::moderation::backend::BackendError;
    use crate::core::moderation::moderation_models::RulePayload;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingGateway {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ModerationGateway for RecordingGateway {
        async fn delete_message(&self, _: u64, _: u64) -> Result<(), GatewayError> {
            self.calls.lock().unwrap().push("delete".to_string());
            Ok(())
        }
        async fn timeout_member(
            &self,
            _: u64,
            _: u64,
            _: u64,
            _: &str,
        ) -> Result<(), GatewayError> {
            self.calls.lock().unwrap().push("timeout".to_string());
            Ok(())
        }
        async fn revoke_timeout(&self, _: u64, _: u64) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn ban_member(&self, _: u64, _: u64, _: &str) -> Result<(), GatewayError> {
            self.calls.lock().unwrap().push("ban".to_string());
            Ok(())
        }
        async fn revoke_ban(&self, _: u64, _: u64) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn kick_member(&self, _: u64, _: u64, _: &str) -> Result<(), GatewayError> {
            self.calls.lock().unwrap().push("kick".to_string());
            Ok(())
        }
        async fn send_dm(&self, _: u64, _: &str) -> Result<(), GatewayError> {
            self.calls.lock().unwrap().push("dm".to_string());
            Ok(())
        }
        async fn send_log_message(
            &self,
            _: u64,
            _: &IncomingMessage,
        ) -> Result<(), GatewayError> {
            self.calls.lock().unwrap().push("log".to_string());
            Ok(())
        }
        async fn add_role(&self, _: u64, _: u64, _: u64) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn remove_role(&self, _: u64, _: u64, _: u64) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    struct RecordingBackend {
        reports: Mutex<Vec<ModerationReport>>,
    }

    #[async_trait]
    impl ModerationBackend for RecordingBackend {
        async fn fetch_rules(&self) -> Result<Vec<RulePayload>, BackendError> {
            Ok(vec![])
        }
        async fn submit_report(&self, report: &ModerationReport) -> Result<(), BackendError> {
            self.reports.lock().unwrap().push(report.clone());
            Ok(())
        }
        fn base_url(&self) -> &str {
            "http://backend.example"
        }
        fn api_key_len(&self) -> usize {
            8
        }
    }

    struct Fixture {
        service: ModerationService<RecordingGateway, RecordingBackend>,
        gateway: Arc<RecordingGateway>,
        backend: Arc<RecordingBackend>,
    }

    fn fixture(rules: Vec<serde_json::Value>) -> Fixture {
        let cache = Arc::new(RuleCache::new());
        let payloads = rules
            .into_iter()
            .map(|rule| serde_json::from_value(rule).unwrap())
            .collect();
        cache.load_rules(payloads);

        let gateway = Arc::new(RecordingGateway {
            calls: Mutex::new(Vec::new()),
        });
        let backend = Arc::new(RecordingBackend {
            reports: Mutex::new(Vec::new()),
        });
        let reporter = Arc::new(ReportingClient::new(Arc::clone(&backend)));
        let service = ModerationService::new(
            cache,
            Arc::new(SpamTracker::new()),
            Arc::clone(&gateway),
            reporter,
        );
        Fixture {
            service,
            gateway,
            backend,
        }
    }

    fn keyword_rule(id: &str, keyword: &str, exempt_roles: Vec<&str>) -> serde_json::Value {
        json!({
            "id": id,
            "name": id,
            "priority": 0,
            "triggerType": "CUSTOM_KEYWORD",
            "triggerConfig": {"keywords": [keyword]},
            "exemptRoleIds": exempt_roles,
            "actions": [
                {"id": "a", "actionType": "DELETE_MESSAGE", "actionConfig": {}, "order": 0}
            ]
        })
    }

    fn incoming(content: &str, roles: Option<Vec<u64>>) -> IncomingMessage {
        IncomingMessage {
            message_id: 1,
            channel_id: 2,
            guild_id: Some(3),
            author_id: 4,
            author_tag: "user#0".to_string(),
            content: content.to_string(),
            attachments: vec![],
            distinct_mention_count: 0,
            member_role_ids: roles,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn triggered_rule_executes_actions_and_reports() {
        let fx = fixture(vec![keyword_rule("r1", "badword", vec![])]);
        fx.service
            .evaluate_message(&incoming("this has badword in it", Some(vec![])))
            .await;

        assert_eq!(fx.gateway.calls.lock().unwrap().as_slice(), ["delete"]);
        let reports = fx.backend.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].rule_id, "r1");
        assert_eq!(reports[0].action_results.len(), 1);
    }

    #[tokio::test]
    async fn clean_message_produces_nothing() {
        let fx = fixture(vec![keyword_rule("r1", "badword", vec![])]);
        fx.service
            .evaluate_message(&incoming("perfectly fine", Some(vec![])))
            .await;

        assert!(fx.gateway.calls.lock().unwrap().is_empty());
        assert!(fx.backend.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn exempt_role_skips_the_rule_entirely() {
        let fx = fixture(vec![keyword_rule("r1", "badword", vec!["77"])]);
        fx.service
            .evaluate_message(&incoming("badword", Some(vec![77])))
            .await;

        assert!(fx.gateway.calls.lock().unwrap().is_empty());
        assert!(fx.backend.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn multiple_violations_each_get_their_own_report() {
        let fx = fixture(vec![
            keyword_rule("kw", "badword", vec![]),
            json!({
                "id": "caps",
                "name": "caps",
                "priority": 5,
                "triggerType": "MESSAGE_CAPS_EXCESSIVE",
                "triggerConfig": {"maxPercentage": 50},
                "actions": [
                    {"id": "a", "actionType": "LOG_ONLY", "actionConfig": {}, "order": 0}
                ]
            }),
        ]);

        // All-caps and contains the keyword: both rules fire, no
        // short-circuit after the first match.
        fx.service
            .evaluate_message(&incoming("BADWORD EVERYWHERE", Some(vec![])))
            .await;

        let reports = fx.backend.reports.lock().unwrap();
        assert_eq!(reports.len(), 2);
        // Priority order: caps (5) evaluated before kw (0).
        assert_eq!(reports[0].rule_id, "caps");
        assert_eq!(reports[1].rule_id, "kw");
    }

    #[tokio::test]
    async fn empty_cache_is_a_no_op() {
        let fx = fixture(vec![]);
        fx.service
            .evaluate_message(&incoming("anything", Some(vec![])))
            .await;
        assert!(fx.backend.reports.lock().unwrap().is_empty());
    }
}
