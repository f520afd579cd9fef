// Per-user sliding-window message log for the spam trigger.
//
// Pruning is persisted on every evaluation (the filtered log replaces the
// stored one), so a chatty user's log never outgrows the window. A
// probabilistic sweep additionally reclaims users who went quiet.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;

/// Hard ceiling for the sweep; no trigger uses a longer window.
const SWEEP_MAX_AGE_SECS: i64 = 60;
/// Roughly 1-in-100 evaluations run a sweep.
const SWEEP_ONE_IN: u32 = 100;

#[derive(Debug, Clone)]
pub struct SpamEntry {
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub message_id: u64,
}

pub struct SpamTracker {
    logs: DashMap<u64, Vec<SpamEntry>>,
}

impl Default for SpamTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SpamTracker {
    pub fn new() -> Self {
        Self {
            logs: DashMap::new(),
        }
    }

    /// Records a message for `user_id` and returns how many of their
    /// messages fall inside the window ending at `now`. The pruned log is
    /// what gets stored. A user with no recent history always counts 1
    /// after their own message.
    pub fn record_and_count(
        &self,
        user_id: u64,
        content: &str,
        message_id: u64,
        window: Duration,
        now: DateTime<Utc>,
    ) -> usize {
        let cutoff = now - window;
        let count = {
            let mut log = self.logs.entry(user_id).or_default();
            log.push(SpamEntry {
                content: content.to_string(),
                timestamp: now,
                message_id,
            });
            log.retain(|entry| entry.timestamp > cutoff);
            log.len()
        };

        // Entry guard dropped above; sweeping here cannot deadlock the map.
        if rand::thread_rng().gen_range(0..SWEEP_ONE_IN) == 0 {
            self.sweep_older_than(now - Duration::seconds(SWEEP_MAX_AGE_SECS));
        }

        count
    }

    /// Drops entries older than `cutoff` across all users and removes
    /// users whose log becomes empty.
    pub fn sweep_older_than(&self, cutoff: DateTime<Utc>) {
        self.logs.retain(|_, log| {
            log.retain(|entry| entry.timestamp > cutoff);
            !log.is_empty()
        });
    }

    /// Number of users currently tracked.
    #[allow(dead_code)]
    pub fn tracked_users(&self) -> usize {
        self.logs.len()
    }
}
