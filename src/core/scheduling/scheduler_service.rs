// Scheduled message service - core logic for backend-driven announcements.
//
// The control plane persists messages with a future send time; a
// background dispatcher picks up due ones and records the outcome.
// NO Discord dependencies here - the discord layer does the sending.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Schedule time is invalid or in the past")]
    InvalidScheduleTime,
}

/// Dispatch state of a scheduled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Pending,
    Sent,
    ErrorSending,
    ErrorChannelNotFound,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "PENDING",
            MessageStatus::Sent => "SENT",
            MessageStatus::ErrorSending => "ERROR_SENDING",
            MessageStatus::ErrorChannelNotFound => "ERROR_CHANNEL_NOT_FOUND",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(MessageStatus::Pending),
            "SENT" => Some(MessageStatus::Sent),
            "ERROR_SENDING" => Some(MessageStatus::ErrorSending),
            "ERROR_CHANNEL_NOT_FOUND" => Some(MessageStatus::ErrorChannelNotFound),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledMessage {
    pub id: i64,
    pub channel_id: u64,
    pub content: String,
    pub schedule_time: DateTime<Utc>,
    pub status: MessageStatus,
    pub message_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewScheduledMessage {
    pub channel_id: u64,
    pub content: String,
    pub schedule_time: DateTime<Utc>,
}

/// Trait for persisting scheduled messages.
#[async_trait]
pub trait ScheduledMessageStore: Send + Sync {
    async fn create(&self, message: NewScheduledMessage)
        -> Result<ScheduledMessage, SchedulerError>;

    /// PENDING messages whose schedule time has passed.
    async fn due_messages(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduledMessage>, SchedulerError>;

    async fn mark_dispatched(
        &self,
        id: i64,
        status: MessageStatus,
        message_url: Option<String>,
    ) -> Result<(), SchedulerError>;
}

pub struct SchedulerService<S: ScheduledMessageStore> {
    store: S,
}

impl<S: ScheduledMessageStore> SchedulerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persists a message for later dispatch. The schedule time must be in
    /// the future.
    pub async fn schedule(
        &self,
        message: NewScheduledMessage,
        now: DateTime<Utc>,
    ) -> Result<ScheduledMessage, SchedulerError> {
        if message.schedule_time <= now {
            return Err(SchedulerError::InvalidScheduleTime);
        }
        self.store.create(message).await
    }

    pub async fn due_messages(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduledMessage>, SchedulerError> {
        self.store.due_messages(now).await
    }

    /// Records the dispatch outcome for one message.
    pub async fn record_outcome(
        &self,
        id: i64,
        status: MessageStatus,
        message_url: Option<String>,
    ) -> Result<(), SchedulerError> {
        self.store.mark_dispatched(id, status, message_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    struct InMemoryStore {
        next_id: AtomicI64,
        messages: Mutex<Vec<ScheduledMessage>>,
    }

    impl InMemoryStore {
        fn new() -> Self {
            Self {
                next_id: AtomicI64::new(1),
                messages: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ScheduledMessageStore for InMemoryStore {
        async fn create(
            &self,
            message: NewScheduledMessage,
        ) -> Result<ScheduledMessage, SchedulerError> {
            let stored = ScheduledMessage {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                channel_id: message.channel_id,
                content: message.content,
                schedule_time: message.schedule_time,
                status: MessageStatus::Pending,
                message_url: None,
            };
            self.messages.lock().unwrap().push(stored.clone());
            Ok(stored)
        }

        async fn due_messages(
            &self,
            now: DateTime<Utc>,
        ) -> Result<Vec<ScheduledMessage>, SchedulerError> {
            Ok(self
                .messages
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.status == MessageStatus::Pending && m.schedule_time <= now)
                .cloned()
                .collect())
        }

        async fn mark_dispatched(
            &self,
            id: i64,
            status: MessageStatus,
            message_url: Option<String>,
        ) -> Result<(), SchedulerError> {
            let mut messages = self.messages.lock().unwrap();
            let message = messages
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or_else(|| SchedulerError::StorageError("not found".to_string()))?;
            message.status = status;
            message.message_url = message_url;
            Ok(())
        }
    }

    fn new_message(offset: Duration, now: DateTime<Utc>) -> NewScheduledMessage {
        NewScheduledMessage {
            channel_id: 42,
            content: "announcement".to_string(),
            schedule_time: now + offset,
        }
    }

    #[tokio::test]
    async fn schedule_rejects_past_times() {
        let service = SchedulerService::new(InMemoryStore::new());
        let now = Utc::now();

        let err = service
            .schedule(new_message(Duration::seconds(-10), now), now)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidScheduleTime));
    }

    #[tokio::test]
    async fn due_messages_only_returns_pending_past_entries() {
        let service = SchedulerService::new(InMemoryStore::new());
        let now = Utc::now();

        let due = service
            .schedule(new_message(Duration::seconds(30), now), now)
            .await
            .unwrap();
        service
            .schedule(new_message(Duration::hours(2), now), now)
            .await
            .unwrap();

        let later = now + Duration::seconds(60);
        let found = service.due_messages(later).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, due.id);
    }

    #[tokio::test]
    async fn dispatched_messages_leave_the_due_set() {
        let service = SchedulerService::new(InMemoryStore::new());
        let now = Utc::now();

        let msg = service
            .schedule(new_message(Duration::seconds(1), now), now)
            .await
            .unwrap();

        let later = now + Duration::seconds(5);
        service
            .record_outcome(
                msg.id,
                MessageStatus::Sent,
                Some("https://discord.com/channels/1/2/3".to_string()),
            )
            .await
            .unwrap();

        assert!(service.due_messages(later).await.unwrap().is_empty());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            MessageStatus::Pending,
            MessageStatus::Sent,
            MessageStatus::ErrorSending,
            MessageStatus::ErrorChannelNotFound,
        ] {
            assert_eq!(MessageStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(MessageStatus::from_str("NONSENSE"), None);
    }
}
