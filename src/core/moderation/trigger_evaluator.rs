// Trigger predicates - one pure function per trigger type.
//
// Every predicate answers "does this message violate this rule's
// condition?" and nothing else; side effects live in the executor. The
// spam trigger is the one exception in that it consults (and feeds) the
// shared sliding-window tracker.

use super::moderation_models::{IncomingMessage, Rule, Trigger};
use super::spam_tracker::SpamTracker;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+").expect("link regex is valid"));

// Custom emoji tokens (<:name:id> / <a:name:id>) plus Unicode emoji.
static EMOJI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<a?:\w+:\d+>|\p{Emoji_Presentation}|\p{Extended_Pictographic}")
        .expect("emoji regex is valid")
});

pub struct TriggerEvaluator {
    spam: Arc<SpamTracker>,
}

impl TriggerEvaluator {
    pub fn new(spam: Arc<SpamTracker>) -> Self {
        Self { spam }
    }

    /// Exemption check, run before any trigger evaluation. A message with
    /// no member context can never match a role exemption.
    pub fn is_exempt(message: &IncomingMessage, rule: &Rule) -> bool {
        if rule.exempt_channel_ids.contains(&message.channel_id) {
            return true;
        }
        match &message.member_role_ids {
            Some(roles) => roles.iter().any(|role| rule.exempt_role_ids.contains(role)),
            None => false,
        }
    }

    /// Whether `message` violates `trigger`. Unknown trigger types log a
    /// warning and never fire.
    pub fn evaluate(
        &self,
        message: &IncomingMessage,
        trigger: &Trigger,
        now: DateTime<Utc>,
    ) -> bool {
        match trigger {
            Trigger::AttachmentCount { max_attachments } => {
                message.attachments.len() as u64 > *max_attachments
            }
            Trigger::MentionCount { max_mentions } => {
                message.distinct_mention_count as u64 > *max_mentions
            }
            Trigger::Spam {
                time_window_secs,
                min_messages,
            } => {
                let count = self.spam.record_and_count(
                    message.author_id,
                    &message.content,
                    message.message_id,
                    Duration::seconds(*time_window_secs as i64),
                    now,
                );
                count as u64 >= *min_messages
            }
            Trigger::ExcessiveCaps { max_percentage } => {
                caps_percentage(&message.content)
                    .map(|pct| pct >= *max_percentage)
                    .unwrap_or(false)
            }
            Trigger::LinkSpam { max_links } => {
                LINK_RE.find_iter(&message.content).count() as u64 > *max_links
            }
            Trigger::EmojiSpam { max_emojis } => {
                EMOJI_RE.find_iter(&message.content).count() as u64 > *max_emojis
            }
            Trigger::Keyword {
                keywords,
                case_sensitive,
            } => contains_keyword(&message.content, keywords, *case_sensitive),
            Trigger::Unknown(name) => {
                tracing::warn!(trigger_type = %name, "Unknown trigger type");
                false
            }
        }
    }
}

/// Uppercase percentage among ASCII letters. `None` when the message is
/// under the 10-character floor or carries no letters at all.
fn caps_percentage(content: &str) -> Option<f64> {
    if content.chars().count() < 10 {
        return None;
    }
    let letters = content.chars().filter(|c| c.is_ascii_alphabetic()).count();
    if letters == 0 {
        return None;
    }
    let upper = content.chars().filter(|c| c.is_ascii_uppercase()).count();
    Some(upper as f64 / letters as f64 * 100.0)
}

fn contains_keyword(content: &str, keywords: &[String], case_sensitive: bool) -> bool {
    if case_sensitive {
        keywords.iter().any(|kw| content.contains(kw.as_str()))
    } else {
        let folded = content.to_lowercase();
        keywords
            .iter()
            .any(|kw| folded.contains(&kw.to_lowercase()))
    }
}
