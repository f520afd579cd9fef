// Scheduled-message dispatch loop.
//
// Checks the store on a fixed interval and sends whatever came due.
// Each message records its own outcome; one bad channel never blocks
// the rest of the batch.

use crate::core::scheduling::{MessageStatus, ScheduledMessageStore, SchedulerService};
use chrono::Utc;
use serenity::all::{ChannelId, ChannelType};
use serenity::http::Http;
use std::sync::Arc;
use std::time::Duration;

const DISPATCH_INTERVAL_SECS: u64 = 60;

/// Runs forever; spawn it once the Discord client is up.
pub async fn run_dispatch_loop<S: ScheduledMessageStore>(
    http: Arc<Http>,
    scheduler: Arc<SchedulerService<S>>,
) {
    loop {
        tracing::debug!("Checking for due scheduled messages");

        match scheduler.due_messages(Utc::now()).await {
            Ok(due) => {
                if !due.is_empty() {
                    tracing::info!(count = due.len(), "Dispatching scheduled messages");
                }
                for message in due {
                    let (status, url) =
                        dispatch_one(&http, message.channel_id, &message.content).await;
                    if let Err(err) = scheduler.record_outcome(message.id, status, url).await {
                        tracing::error!(
                            message_id = message.id,
                            error = %err,
                            "Failed to record dispatch outcome"
                        );
                    }
                }
            }
            Err(err) => tracing::error!(error = %err, "Failed to query due messages"),
        }

        tokio::time::sleep(Duration::from_secs(DISPATCH_INTERVAL_SECS)).await;
    }
}

async fn dispatch_one(
    http: &Http,
    channel_id: u64,
    content: &str,
) -> (MessageStatus, Option<String>) {
    let channel = match http.get_channel(ChannelId::new(channel_id)).await {
        Ok(channel) => channel,
        Err(err) => {
            tracing::error!(channel_id, error = %err, "Scheduled message channel not found");
            return (MessageStatus::ErrorChannelNotFound, None);
        }
    };

    let is_text = channel
        .guild()
        .map(|guild_channel| matches!(guild_channel.kind, ChannelType::Text | ChannelType::News))
        .unwrap_or(false);
    if !is_text {
        tracing::error!(channel_id, "Scheduled message channel is not a text channel");
        return (MessageStatus::ErrorChannelNotFound, None);
    }

    match ChannelId::new(channel_id).say(http, content).await {
        Ok(sent) => {
            tracing::info!(channel_id, message_id = sent.id.get(), "Scheduled message sent");
            (MessageStatus::Sent, Some(sent.link()))
        }
        Err(err) => {
            tracing::error!(channel_id, error = %err, "Failed to send scheduled message");
            (MessageStatus::ErrorSending, None)
        }
    }
}
