// In-memory cache of active moderation rules.
//
// The cache is replaced wholesale on every sync: a new snapshot is built
// off to the side and swapped in under the write lock, so readers never
// observe a half-updated rule set.

use super::backend::ModerationBackend;
use super::moderation_models::{Rule, RulePayload};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

#[derive(Default)]
struct CacheSnapshot {
    /// Sorted by priority descending, then name ascending.
    rules: Vec<Arc<Rule>>,
    by_id: HashMap<String, Arc<Rule>>,
    last_synced_at: Option<DateTime<Utc>>,
}

/// Lightweight per-rule listing for the status endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSummary {
    pub id: String,
    pub name: String,
    pub trigger_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub rules_count: usize,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub rules: Vec<RuleSummary>,
}

pub struct RuleCache {
    inner: RwLock<CacheSnapshot>,
}

impl Default for RuleCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CacheSnapshot::default()),
        }
    }

    /// Replaces the whole cache with the given rule set. Disabled rules are
    /// dropped; the rest are ordered by priority (higher first) with ties
    /// broken by name. Returns the number of rules retained.
    pub fn load_rules(&self, payloads: Vec<RulePayload>) -> usize {
        let mut rules: Vec<Arc<Rule>> = payloads
            .into_iter()
            .map(Rule::from)
            .filter(|rule| rule.enabled)
            .map(Arc::new)
            .collect();

        rules.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.name.cmp(&b.name))
        });

        let by_id = rules
            .iter()
            .map(|rule| (rule.id.clone(), Arc::clone(rule)))
            .collect();

        let snapshot = CacheSnapshot {
            rules,
            by_id,
            last_synced_at: Some(Utc::now()),
        };

        let count = snapshot.rules.len();
        *self.inner.write().unwrap() = snapshot;

        tracing::info!(rules = count, "Loaded active moderation rules");
        count
    }

    /// Pulls rules from the backend with bounded retry and a fixed delay
    /// between attempts. On total failure the cache keeps its previous
    /// content; on a cold start that means moderation stays disabled until
    /// a manual sync arrives.
    pub async fn fetch_and_load(
        &self,
        backend: &dyn ModerationBackend,
        max_retries: u32,
        delay: Duration,
    ) {
        for attempt in 1..=max_retries {
            tracing::info!(attempt, max_retries, "Fetching moderation rules from backend");

            match backend.fetch_rules().await {
                Ok(payloads) => {
                    let count = self.load_rules(payloads);
                    tracing::info!(rules = count, "Successfully fetched and loaded rules");
                    return;
                }
                Err(err) => {
                    tracing::error!(
                        attempt,
                        max_retries,
                        error = %err,
                        status = ?err.http_status(),
                        url = ?err.url(),
                        "Rule fetch attempt failed"
                    );
                    if attempt < max_retries {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        tracing::warn!(
            "Failed to fetch moderation rules after all retries; \
             auto-moderation will NOT work until rules are synced manually"
        );
    }

    /// Prioritized read-only snapshot of the active rules.
    pub fn all_rules(&self) -> Vec<Arc<Rule>> {
        self.inner.read().unwrap().rules.clone()
    }

    #[allow(dead_code)]
    pub fn rules_by_trigger_type(&self, trigger_type: &str) -> Vec<Arc<Rule>> {
        self.inner
            .read()
            .unwrap()
            .rules
            .iter()
            .filter(|rule| rule.trigger.type_name() == trigger_type)
            .cloned()
            .collect()
    }

    #[allow(dead_code)]
    pub fn rule_by_id(&self, id: &str) -> Option<Arc<Rule>> {
        self.inner.read().unwrap().by_id.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().rules.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap() = CacheSnapshot::default();
        tracing::info!("Moderation rule cache cleared");
    }

    pub fn status(&self) -> CacheStatus {
        let snapshot = self.inner.read().unwrap();
        CacheStatus {
            rules_count: snapshot.rules.len(),
            last_synced_at: snapshot.last_synced_at,
            rules: snapshot
                .rules
                .iter()
                .map(|rule| RuleSummary {
                    id: rule.id.clone(),
                    name: rule.name.clone(),
                    trigger_type: rule.trigger.type_name().to_string(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(id: &str, name: &str, priority: i64, enabled: bool) -> RulePayload {
        serde_json::from_value(json!({
            "id": id,
            "name": name,
            "enabled": enabled,
            "priority": priority,
            "triggerType": "CUSTOM_KEYWORD",
            "triggerConfig": {"keywords": ["x"]},
            "actions": []
        }))
        .unwrap()
    }

    #[test]
    fn load_filters_disabled_and_sorts_by_priority_then_name() {
        let cache = RuleCache::new();
        cache.load_rules(vec![
            payload("a", "Beta", 1, true),
            payload("b", "Alpha", 1, true),
            payload("c", "Gamma", 5, true),
            payload("d", "Off", 100, false),
        ]);

        let rules = cache.all_rules();
        let names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Gamma", "Alpha", "Beta"]);
        assert!(cache.rule_by_id("d").is_none());
    }

    #[test]
    fn load_fully_replaces_previous_content() {
        let cache = RuleCache::new();
        cache.load_rules(vec![payload("old", "Old", 1, true)]);
        assert!(cache.rule_by_id("old").is_some());

        cache.load_rules(vec![payload("new", "New", 1, true)]);
        assert!(cache.rule_by_id("old").is_none());
        assert!(cache.rule_by_id("new").is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_then_empty_load_leaves_cache_empty() {
        let cache = RuleCache::new();
        cache.load_rules(vec![payload("a", "A", 1, true)]);

        cache.clear();
        assert!(cache.status().last_synced_at.is_none());

        cache.load_rules(vec![]);
        assert_eq!(cache.len(), 0);
        assert!(cache.all_rules().is_empty());
    }

    #[test]
    fn status_lists_id_name_and_trigger_type() {
        let cache = RuleCache::new();
        cache.load_rules(vec![payload("a", "A", 1, true)]);

        let status = cache.status();
        assert_eq!(status.rules_count, 1);
        assert!(status.last_synced_at.is_some());
        assert_eq!(status.rules[0].id, "a");
        assert_eq!(status.rules[0].trigger_type, "CUSTOM_KEYWORD");
    }

    #[test]
    fn lookup_by_trigger_type() {
        let cache = RuleCache::new();
        let mut spam = payload("s", "Spam", 1, true);
        spam.trigger_type = "MESSAGE_SPAM".to_string();
        cache.load_rules(vec![payload("k", "Keyword", 1, true), spam]);

        let spam_rules = cache.rules_by_trigger_type("MESSAGE_SPAM");
        assert_eq!(spam_rules.len(), 1);
        assert_eq!(spam_rules[0].id, "s");
    }
}
