// SQLite-backed store for scheduled messages.
//
// Tables:
// - scheduled_messages: one row per backend-scheduled announcement

use crate::core::scheduling::{
    MessageStatus, NewScheduledMessage, ScheduledMessage, ScheduledMessageStore, SchedulerError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteMessageStore {
    pool: Pool<Sqlite>,
}

impl SqliteMessageStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), SchedulerError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scheduled_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                channel_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                schedule_time TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'PENDING',
                message_url TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_scheduled_messages_due
                ON scheduled_messages(status, schedule_time);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SchedulerError::StorageError(e.to_string()))?;

        Ok(())
    }

    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<ScheduledMessage, SchedulerError> {
        let schedule_time: String = row.get("schedule_time");
        let schedule_time = DateTime::parse_from_rfc3339(&schedule_time)
            .map_err(|e| SchedulerError::StorageError(e.to_string()))?
            .with_timezone(&Utc);

        let status: String = row.get("status");
        let status = MessageStatus::from_str(&status)
            .ok_or_else(|| SchedulerError::StorageError(format!("unknown status {status}")))?;

        let channel_id: i64 = row.get("channel_id");

        Ok(ScheduledMessage {
            id: row.get("id"),
            channel_id: channel_id as u64,
            content: row.get("content"),
            schedule_time,
            status,
            message_url: row.get("message_url"),
        })
    }
}

#[async_trait]
impl ScheduledMessageStore for SqliteMessageStore {
    async fn create(
        &self,
        message: NewScheduledMessage,
    ) -> Result<ScheduledMessage, SchedulerError> {
        let result = sqlx::query(
            r#"
            INSERT INTO scheduled_messages (channel_id, content, schedule_time, status)
            VALUES (?, ?, ?, 'PENDING')
            "#,
        )
        .bind(message.channel_id as i64)
        .bind(&message.content)
        .bind(message.schedule_time.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| SchedulerError::StorageError(e.to_string()))?;

        Ok(ScheduledMessage {
            id: result.last_insert_rowid(),
            channel_id: message.channel_id,
            content: message.content,
            schedule_time: message.schedule_time,
            status: MessageStatus::Pending,
            message_url: None,
        })
    }

    async fn due_messages(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduledMessage>, SchedulerError> {
        let rows = sqlx::query(
            r#"
            SELECT id, channel_id, content, schedule_time, status, message_url
            FROM scheduled_messages
            WHERE status = 'PENDING' AND schedule_time <= ?
            ORDER BY schedule_time ASC
            "#,
        )
        .bind(now.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SchedulerError::StorageError(e.to_string()))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn mark_dispatched(
        &self,
        id: i64,
        status: MessageStatus,
        message_url: Option<String>,
    ) -> Result<(), SchedulerError> {
        sqlx::query(
            r#"
            UPDATE scheduled_messages
            SET status = ?, message_url = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(message_url)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| SchedulerError::StorageError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn store() -> (SqliteMessageStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scheduler.db");
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .connect(&format!("sqlite://{}?mode=rwc", path.display()))
            .await
            .unwrap();
        let store = SqliteMessageStore::new(pool);
        store.migrate().await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn create_and_fetch_due_round_trip() {
        let (store, _dir) = store().await;
        let now = Utc::now();

        let created = store
            .create(NewScheduledMessage {
                channel_id: 42,
                content: "hello".to_string(),
                schedule_time: now - Duration::seconds(5),
            })
            .await
            .unwrap();

        let due = store.due_messages(now).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, created.id);
        assert_eq!(due[0].channel_id, 42);
        assert_eq!(due[0].status, MessageStatus::Pending);
    }

    #[tokio::test]
    async fn future_messages_are_not_due() {
        let (store, _dir) = store().await;
        let now = Utc::now();

        store
            .create(NewScheduledMessage {
                channel_id: 42,
                content: "later".to_string(),
                schedule_time: now + Duration::hours(1),
            })
            .await
            .unwrap();

        assert!(store.due_messages(now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_dispatched_updates_status_and_url() {
        let (store, _dir) = store().await;
        let now = Utc::now();

        let created = store
            .create(NewScheduledMessage {
                channel_id: 42,
                content: "hello".to_string(),
                schedule_time: now - Duration::seconds(5),
            })
            .await
            .unwrap();

        store
            .mark_dispatched(
                created.id,
                MessageStatus::Sent,
                Some("https://discord.com/channels/1/2/3".to_string()),
            )
            .await
            .unwrap();

        assert!(store.due_messages(now).await.unwrap().is_empty());
    }
}
