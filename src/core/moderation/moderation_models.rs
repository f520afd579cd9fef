// Moderation domain models - rules, triggers, actions and reports.
//
// These are pure domain types with no Discord dependencies.
// The discord layer converts platform objects into `IncomingMessage` and
// the api layer converts backend payloads into `Rule` snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Default reason attached to punishments when the rule author gave none.
pub const DEFAULT_PUNISHMENT_REASON: &str = "Moderation rule violation";
/// Default notice for SEND_DM actions without a configured message.
pub const DEFAULT_DM_NOTICE: &str = "You violated a moderation rule.";

// ============================================================================
// WIRE PAYLOADS
// ============================================================================
// The backend speaks camelCase JSON with loosely-typed config maps. These
// payload types mirror that shape exactly; conversion into the typed domain
// enums happens in `Trigger::from_wire` / `ActionKind::from_wire`.

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePayload {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub priority: i64,
    pub trigger_type: String,
    #[serde(default)]
    pub trigger_config: Value,
    #[serde(default)]
    pub exempt_role_ids: Vec<String>,
    #[serde(default)]
    pub exempt_channel_ids: Vec<String>,
    pub actions: Vec<ActionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPayload {
    #[serde(default)]
    pub id: String,
    pub action_type: String,
    #[serde(default)]
    pub action_config: Value,
    #[serde(default)]
    pub order: i64,
}

// ============================================================================
// TRIGGERS
// ============================================================================

/// The condition half of a rule, one variant per trigger type with its
/// typed configuration. Unknown types are kept (with their wire name) so
/// evaluation can fail open instead of rejecting the whole rule set.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    AttachmentCount { max_attachments: u64 },
    MentionCount { max_mentions: u64 },
    Spam { time_window_secs: u64, min_messages: u64 },
    ExcessiveCaps { max_percentage: f64 },
    LinkSpam { max_links: u64 },
    EmojiSpam { max_emojis: u64 },
    Keyword { keywords: Vec<String>, case_sensitive: bool },
    Unknown(String),
}

fn config_u64(config: &Value, key: &str, default: u64) -> u64 {
    config.get(key).and_then(Value::as_u64).unwrap_or(default)
}

fn config_f64(config: &Value, key: &str, default: f64) -> f64 {
    config.get(key).and_then(Value::as_f64).unwrap_or(default)
}

fn config_bool(config: &Value, key: &str, default: bool) -> bool {
    config.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn config_string(config: &Value, key: &str) -> Option<String> {
    config
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

/// Discord snowflakes travel as strings on the wire.
fn config_snowflake(config: &Value, key: &str) -> Option<u64> {
    match config.get(key) {
        Some(Value::String(s)) => s.parse().ok(),
        Some(Value::Number(n)) => n.as_u64(),
        _ => None,
    }
}

impl Trigger {
    /// Builds a typed trigger from the wire type name and config map,
    /// applying the documented defaults for missing options.
    pub fn from_wire(trigger_type: &str, config: &Value) -> Self {
        match trigger_type {
            "MESSAGE_ATTACHMENTS_COUNT" => Trigger::AttachmentCount {
                max_attachments: config_u64(config, "maxAttachments", 3),
            },
            "MESSAGE_MENTIONS_COUNT" => Trigger::MentionCount {
                max_mentions: config_u64(config, "maxMentions", 5),
            },
            "MESSAGE_SPAM" => Trigger::Spam {
                time_window_secs: config_u64(config, "timeWindow", 5),
                min_messages: config_u64(config, "minMessages", 5),
            },
            "MESSAGE_CAPS_EXCESSIVE" => Trigger::ExcessiveCaps {
                max_percentage: config_f64(config, "maxPercentage", 70.0),
            },
            "MESSAGE_LINKS_SPAM" => Trigger::LinkSpam {
                max_links: config_u64(config, "maxLinks", 3),
            },
            "MESSAGE_EMOJI_SPAM" => Trigger::EmojiSpam {
                max_emojis: config_u64(config, "maxEmojis", 10),
            },
            "CUSTOM_KEYWORD" => Trigger::Keyword {
                keywords: config
                    .get("keywords")
                    .and_then(Value::as_array)
                    .map(|list| {
                        list.iter()
                            .filter_map(Value::as_str)
                            .map(|s| s.to_string())
                            .collect()
                    })
                    .unwrap_or_default(),
                case_sensitive: config_bool(config, "caseSensitive", false),
            },
            other => Trigger::Unknown(other.to_string()),
        }
    }

    /// The wire name this trigger came from.
    pub fn type_name(&self) -> &str {
        match self {
            Trigger::AttachmentCount { .. } => "MESSAGE_ATTACHMENTS_COUNT",
            Trigger::MentionCount { .. } => "MESSAGE_MENTIONS_COUNT",
            Trigger::Spam { .. } => "MESSAGE_SPAM",
            Trigger::ExcessiveCaps { .. } => "MESSAGE_CAPS_EXCESSIVE",
            Trigger::LinkSpam { .. } => "MESSAGE_LINKS_SPAM",
            Trigger::EmojiSpam { .. } => "MESSAGE_EMOJI_SPAM",
            Trigger::Keyword { .. } => "CUSTOM_KEYWORD",
            Trigger::Unknown(name) => name,
        }
    }
}

// ============================================================================
// ACTIONS
// ============================================================================

/// One effect to apply when a rule fires.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    DeleteMessage,
    Timeout {
        duration_secs: u64,
        reason: String,
        dm_message: Option<String>,
    },
    Ban {
        reason: String,
        dm_message: Option<String>,
    },
    Kick {
        reason: String,
    },
    SendDm {
        message: String,
    },
    SendLogMessage {
        channel_id: Option<u64>,
    },
    AddRole {
        role_id: Option<u64>,
    },
    RemoveRole {
        role_id: Option<u64>,
    },
    LogOnly,
    Unknown(String),
}

impl ActionKind {
    pub fn from_wire(action_type: &str, config: &Value) -> Self {
        let reason = || {
            config_string(config, "reason")
                .unwrap_or_else(|| DEFAULT_PUNISHMENT_REASON.to_string())
        };
        match action_type {
            "DELETE_MESSAGE" => ActionKind::DeleteMessage,
            "TIMEOUT" => ActionKind::Timeout {
                duration_secs: config_u64(config, "duration", 300),
                reason: reason(),
                dm_message: config_string(config, "dmMessage"),
            },
            "BAN" => ActionKind::Ban {
                reason: reason(),
                dm_message: config_string(config, "dmMessage"),
            },
            "KICK" => ActionKind::Kick { reason: reason() },
            "SEND_DM" => ActionKind::SendDm {
                message: config_string(config, "message")
                    .unwrap_or_else(|| DEFAULT_DM_NOTICE.to_string()),
            },
            "SEND_LOG_MESSAGE" => ActionKind::SendLogMessage {
                channel_id: config_snowflake(config, "channelId"),
            },
            "ADD_ROLE" => ActionKind::AddRole {
                role_id: config_snowflake(config, "roleId"),
            },
            "REMOVE_ROLE" => ActionKind::RemoveRole {
                role_id: config_snowflake(config, "roleId"),
            },
            "LOG_ONLY" => ActionKind::LogOnly,
            other => ActionKind::Unknown(other.to_string()),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            ActionKind::DeleteMessage => "DELETE_MESSAGE",
            ActionKind::Timeout { .. } => "TIMEOUT",
            ActionKind::Ban { .. } => "BAN",
            ActionKind::Kick { .. } => "KICK",
            ActionKind::SendDm { .. } => "SEND_DM",
            ActionKind::SendLogMessage { .. } => "SEND_LOG_MESSAGE",
            ActionKind::AddRole { .. } => "ADD_ROLE",
            ActionKind::RemoveRole { .. } => "REMOVE_ROLE",
            ActionKind::LogOnly => "LOG_ONLY",
            ActionKind::Unknown(name) => name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Action {
    pub id: String,
    pub kind: ActionKind,
    pub order: i64,
    /// Raw config as received - echoed back in action results so the
    /// backend sees exactly what was applied.
    pub config: Value,
}

impl From<ActionPayload> for Action {
    fn from(payload: ActionPayload) -> Self {
        let kind = ActionKind::from_wire(&payload.action_type, &payload.action_config);
        Action {
            id: payload.id,
            kind,
            order: payload.order,
            config: payload.action_config,
        }
    }
}

// ============================================================================
// RULES
// ============================================================================

/// An immutable rule snapshot as held by the cache.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub priority: i64,
    pub trigger: Trigger,
    pub exempt_role_ids: HashSet<u64>,
    pub exempt_channel_ids: HashSet<u64>,
    pub actions: Vec<Action>,
}

fn parse_snowflakes(ids: Vec<String>) -> HashSet<u64> {
    ids.iter().filter_map(|id| id.parse().ok()).collect()
}

impl From<RulePayload> for Rule {
    fn from(payload: RulePayload) -> Self {
        let trigger = Trigger::from_wire(&payload.trigger_type, &payload.trigger_config);
        Rule {
            id: payload.id,
            name: payload.name,
            enabled: payload.enabled,
            priority: payload.priority,
            trigger,
            exempt_role_ids: parse_snowflakes(payload.exempt_role_ids),
            exempt_channel_ids: parse_snowflakes(payload.exempt_channel_ids),
            actions: payload.actions.into_iter().map(Action::from).collect(),
        }
    }
}

// ============================================================================
// MESSAGES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentMeta {
    pub url: String,
    pub name: String,
    pub content_type: Option<String>,
}

/// Platform-agnostic view of an incoming message, built by the discord
/// layer. `member_role_ids` is `None` when there is no member context
/// (e.g. a DM), which makes role exemptions unable to match.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub message_id: u64,
    pub channel_id: u64,
    pub guild_id: Option<u64>,
    pub author_id: u64,
    pub author_tag: String,
    pub content: String,
    pub attachments: Vec<AttachmentMeta>,
    pub distinct_mention_count: usize,
    pub member_role_ids: Option<Vec<u64>>,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// RESULTS & REPORTS
// ============================================================================

/// Outcome of a single executed action, in execution order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub action_type: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub config: Value,
}

impl ActionOutcome {
    pub fn success(action: &Action) -> Self {
        Self {
            action_type: action.kind.type_name().to_string(),
            success: true,
            error: None,
            config: action.config.clone(),
        }
    }

    pub fn failure(action: &Action, error: impl Into<String>) -> Self {
        Self {
            action_type: action.kind.type_name().to_string(),
            success: false,
            error: Some(error.into()),
            config: action.config.clone(),
        }
    }
}

/// The log entry posted to the backend after a rule fires.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationReport {
    pub rule_id: String,
    pub guild_id: String,
    pub target_user_id: String,
    pub target_user_tag: String,
    pub channel_id: String,
    pub message_id: String,
    pub message_content: String,
    pub message_attachments: Vec<AttachmentMeta>,
    pub action_results: Vec<ActionOutcome>,
    pub triggered_at: String,
}

impl ModerationReport {
    pub fn new(message: &IncomingMessage, rule: &Rule, results: Vec<ActionOutcome>) -> Self {
        Self {
            rule_id: rule.id.clone(),
            guild_id: message
                .guild_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            target_user_id: message.author_id.to_string(),
            target_user_tag: message.author_tag.clone(),
            channel_id: message.channel_id.to_string(),
            message_id: message.message_id.to_string(),
            message_content: message.content.clone(),
            message_attachments: message.attachments.clone(),
            action_results: results,
            triggered_at: Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trigger_from_wire_applies_defaults() {
        let trigger = Trigger::from_wire("MESSAGE_SPAM", &json!({}));
        assert_eq!(
            trigger,
            Trigger::Spam {
                time_window_secs: 5,
                min_messages: 5
            }
        );

        let trigger = Trigger::from_wire("MESSAGE_CAPS_EXCESSIVE", &json!({"maxPercentage": 90}));
        assert_eq!(trigger, Trigger::ExcessiveCaps { max_percentage: 90.0 });
    }

    #[test]
    fn unknown_trigger_type_is_kept_not_rejected() {
        let trigger = Trigger::from_wire("SOMETHING_NEW", &json!({"x": 1}));
        assert_eq!(trigger, Trigger::Unknown("SOMETHING_NEW".to_string()));
        assert_eq!(trigger.type_name(), "SOMETHING_NEW");
    }

    #[test]
    fn action_from_wire_reads_snowflakes_as_strings_or_numbers() {
        let kind = ActionKind::from_wire("ADD_ROLE", &json!({"roleId": "123456789"}));
        assert_eq!(kind, ActionKind::AddRole { role_id: Some(123456789) });

        let kind = ActionKind::from_wire("SEND_LOG_MESSAGE", &json!({"channelId": 42}));
        assert_eq!(kind, ActionKind::SendLogMessage { channel_id: Some(42) });

        let kind = ActionKind::from_wire("ADD_ROLE", &json!({}));
        assert_eq!(kind, ActionKind::AddRole { role_id: None });
    }

    #[test]
    fn timeout_defaults_to_five_minutes() {
        let kind = ActionKind::from_wire("TIMEOUT", &json!({}));
        match kind {
            ActionKind::Timeout {
                duration_secs,
                reason,
                dm_message,
            } => {
                assert_eq!(duration_secs, 300);
                assert_eq!(reason, DEFAULT_PUNISHMENT_REASON);
                assert!(dm_message.is_none());
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn rule_payload_converts_with_exemptions() {
        let payload: RulePayload = serde_json::from_value(json!({
            "id": "rule-1",
            "name": "No links",
            "priority": 10,
            "triggerType": "MESSAGE_LINKS_SPAM",
            "triggerConfig": {"maxLinks": 1},
            "exemptRoleIds": ["111", "not-a-number"],
            "exemptChannelIds": ["222"],
            "actions": [
                {"id": "a1", "actionType": "DELETE_MESSAGE", "actionConfig": {}, "order": 0}
            ]
        }))
        .unwrap();

        let rule = Rule::from(payload);
        assert!(rule.enabled, "enabled defaults to true");
        assert_eq!(rule.trigger, Trigger::LinkSpam { max_links: 1 });
        assert_eq!(rule.exempt_role_ids, HashSet::from([111]));
        assert_eq!(rule.exempt_channel_ids, HashSet::from([222]));
        assert_eq!(rule.actions.len(), 1);
        assert_eq!(rule.actions[0].kind, ActionKind::DeleteMessage);
    }

    #[test]
    fn report_serializes_with_camel_case_wire_names() {
        let message = IncomingMessage {
            message_id: 1,
            channel_id: 2,
            guild_id: Some(3),
            author_id: 4,
            author_tag: "user#0".to_string(),
            content: "hello".to_string(),
            attachments: vec![AttachmentMeta {
                url: "https://cdn.example/file.png".to_string(),
                name: "file.png".to_string(),
                content_type: Some("image/png".to_string()),
            }],
            distinct_mention_count: 0,
            member_role_ids: Some(vec![]),
            timestamp: Utc::now(),
        };
        let rule = Rule::from(
            serde_json::from_value::<RulePayload>(json!({
                "id": "r", "name": "n", "triggerType": "CUSTOM_KEYWORD", "actions": []
            }))
            .unwrap(),
        );

        let report = ModerationReport::new(&message, &rule, vec![]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["ruleId"], "r");
        assert_eq!(value["guildId"], "3");
        assert_eq!(value["targetUserTag"], "user#0");
        assert_eq!(value["messageAttachments"][0]["contentType"], "image/png");
        assert!(value["triggeredAt"].is_string());
    }
}
