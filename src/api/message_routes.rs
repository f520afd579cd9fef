// Message handlers: schedule for later or send immediately.

use super::state::{api_error, ApiResult, ApiState};
use crate::core::scheduling::{NewScheduledMessage, SchedulerError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use serenity::all::{ChannelId, ChannelType};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleBody {
    channel_id: String,
    message_content: String,
    schedule_time: String,
}

/// POST /api/v1/messages/schedule
pub async fn schedule_message(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<ScheduleBody>,
) -> ApiResult {
    let channel_id: u64 = body
        .channel_id
        .parse()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid channelId"))?;

    let schedule_time = DateTime::parse_from_rfc3339(&body.schedule_time)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            api_error(
                StatusCode::BAD_REQUEST,
                "Schedule time is invalid or in the past",
            )
        })?;

    let created = state
        .scheduler
        .schedule(
            NewScheduledMessage {
                channel_id,
                content: body.message_content,
                schedule_time,
            },
            Utc::now(),
        )
        .await
        .map_err(|err| match err {
            SchedulerError::InvalidScheduleTime => api_error(
                StatusCode::BAD_REQUEST,
                "Schedule time is invalid or in the past",
            ),
            SchedulerError::StorageError(err) => {
                tracing::error!(error = %err, "Failed to persist scheduled message");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "Message scheduled successfully",
        "data": created,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNowBody {
    channel_id: String,
    message_content: String,
}

/// POST /api/v1/messages/send-now
pub async fn send_immediate(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<SendNowBody>,
) -> ApiResult {
    let channel_id: u64 = body
        .channel_id
        .parse()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid channelId"))?;

    let channel = state
        .http
        .get_channel(ChannelId::new(channel_id))
        .await
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Channel not found"))?;

    let is_text = channel
        .guild()
        .map(|guild_channel| matches!(guild_channel.kind, ChannelType::Text | ChannelType::News))
        .unwrap_or(false);
    if !is_text {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Channel does not support text messages",
        ));
    }

    let sent = ChannelId::new(channel_id)
        .say(&state.http, &body.message_content)
        .await
        .map_err(|err| {
            tracing::error!(channel_id, error = %err, "Failed to send immediate message");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to send message")
        })?;

    Ok(Json(json!({
        "success": true,
        "messageId": sent.id.to_string(),
        "messageUrl": sent.link(),
    })))
}
