// Forum thread management: generic forum posts plus the job-posting
// variants, which are locked to one configured forum channel.

use super::state::{api_error, ApiError, ApiResult, ApiState};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use serenity::all::{
    ChannelId, ChannelType, CreateForumPost, CreateMessage, EditThread, GuildId,
};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateThreadBody {
    channel_id: String,
    thread_name: String,
    message_content: String,
    #[serde(default)]
    mention_user_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloseThreadBody {
    #[serde(default)]
    closing_message: Option<String>,
}

async fn create_thread(state: &ApiState, body: &CreateThreadBody) -> ApiResult {
    let channel_id: u64 = body
        .channel_id
        .parse()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid channelId"))?;

    let channel = state
        .http
        .get_channel(ChannelId::new(channel_id))
        .await
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Channel not found"))?;

    let forum = channel
        .guild()
        .filter(|guild_channel| guild_channel.kind == ChannelType::Forum)
        .ok_or_else(|| {
            api_error(
                StatusCode::BAD_REQUEST,
                "The specified channel is not a forum channel",
            )
        })?;

    let content = match &body.mention_user_id {
        Some(user_id) => format!("<@{user_id}>\n\n{}", body.message_content),
        None => body.message_content.clone(),
    };

    let thread = forum
        .id
        .create_forum_post(
            &state.http,
            CreateForumPost::new(
                body.thread_name.as_str(),
                CreateMessage::new().content(content),
            ),
        )
        .await
        .map_err(|err| {
            tracing::error!(channel_id, error = %err, "Failed to create forum thread");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create the thread",
            )
        })?;

    // A forum post's starter message shares the thread's id.
    let message_url = format!(
        "https://discord.com/channels/{}/{}/{}",
        thread.guild_id, thread.id, thread.id
    );

    Ok(Json(json!({
        "threadId": thread.id.to_string(),
        "messageId": thread.id.to_string(),
        "messageUrl": message_url,
    })))
}

async fn close_thread(state: &ApiState, thread_id: &str, body: &CloseThreadBody) -> ApiResult {
    let thread_id: u64 = thread_id
        .parse()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid threadId"))?;

    let channel = state
        .http
        .get_channel(ChannelId::new(thread_id))
        .await
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Thread not found"))?;

    let is_thread = channel
        .guild()
        .map(|guild_channel| {
            matches!(
                guild_channel.kind,
                ChannelType::PublicThread | ChannelType::PrivateThread | ChannelType::NewsThread
            )
        })
        .unwrap_or(false);
    if !is_thread {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "The specified channel is not a thread",
        ));
    }

    if let Some(message) = &body.closing_message {
        if let Err(err) = ChannelId::new(thread_id).say(&state.http, message).await {
            tracing::warn!(thread_id, error = %err, "Failed to send closing message");
        }
    }

    ChannelId::new(thread_id)
        .edit_thread(&state.http, EditThread::new().archived(true).locked(true))
        .await
        .map_err(|err| {
            tracing::error!(thread_id, error = %err, "Failed to archive thread");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to close the thread",
            )
        })?;

    Ok(Json(json!({ "success": true })))
}

/// POST /api/v1/forum-threads
pub async fn create_forum_thread(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<CreateThreadBody>,
) -> ApiResult {
    create_thread(&state, &body).await
}

/// POST /api/v1/forum-threads/{thread_id}/close
pub async fn close_forum_thread(
    State(state): State<Arc<ApiState>>,
    Path(thread_id): Path<String>,
    bytes: Bytes,
) -> ApiResult {
    // The closing message is optional and so is the body itself.
    let body: CloseThreadBody = serde_json::from_slice(&bytes).unwrap_or_default();
    close_thread(&state, &thread_id, &body).await
}

fn jobs_channel(state: &ApiState) -> Result<u64, ApiError> {
    state.jobs_forum_channel_id.ok_or_else(|| {
        tracing::error!("JOBS_FORUM_CHANNEL_ID not configured");
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Job postings are not configured",
        )
    })
}

/// GET /api/v1/jobs/guilds/{guild_id}/channels
///
/// Only ever returns the configured jobs channel, and only when it exists
/// in the given guild as a forum.
pub async fn list_job_channels(
    State(state): State<Arc<ApiState>>,
    Path(guild_id): Path<String>,
) -> ApiResult {
    let allowed = jobs_channel(&state)?;
    let guild_id: u64 = guild_id
        .parse()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid guildId"))?;

    let channel = state.http.get_channel(ChannelId::new(allowed)).await.ok();
    let channels = channel
        .and_then(|channel| channel.guild())
        .filter(|guild_channel| {
            guild_channel.kind == ChannelType::Forum
                && guild_channel.guild_id == GuildId::new(guild_id)
        })
        .map(|guild_channel| {
            vec![json!({
                "id": guild_channel.id.to_string(),
                "name": guild_channel.name,
                "type": "GUILD_FORUM",
            })]
        })
        .unwrap_or_default();

    Ok(Json(json!({ "channels": channels })))
}

/// POST /api/v1/jobs/threads
pub async fn create_job_thread(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<CreateThreadBody>,
) -> ApiResult {
    let allowed = jobs_channel(&state)?;
    if body.channel_id != allowed.to_string() {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "Channel not allowed for job postings",
        ));
    }
    create_thread(&state, &body).await
}

/// POST /api/v1/jobs/threads/{thread_id}/close
pub async fn close_job_thread(
    State(state): State<Arc<ApiState>>,
    Path(thread_id): Path<String>,
    bytes: Bytes,
) -> ApiResult {
    let body: CloseThreadBody = serde_json::from_slice(&bytes).unwrap_or_default();
    close_thread(&state, &thread_id, &body).await
}
