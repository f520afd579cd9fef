// Webhook creation for the backend's publishing features.

use super::state::{api_error, ApiResult, ApiState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use serenity::all::{ChannelId, ChannelType, CreateAttachment, CreateWebhook};
use std::sync::Arc;

// This endpoint keeps the original snake_case contract the backend
// already speaks.
#[derive(Debug, Deserialize)]
pub struct CreateWebhookBody {
    channel_id: String,
    user_profile: WebhookProfile,
}

#[derive(Debug, Deserialize)]
pub struct WebhookProfile {
    name: String,
    avatar_url: String,
}

/// POST /api/v1/webhooks
pub async fn create_webhook(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<CreateWebhookBody>,
) -> ApiResult {
    let channel_id: u64 = body
        .channel_id
        .parse()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid channel_id"))?;

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
            "The provided id does not belong to a valid text channel",
        ));
    }

    // Discord wants avatar bytes, not a URL; fetch them first.
    let mut builder = CreateWebhook::new(body.user_profile.name.as_str())
        .audit_log_reason("Webhook created via API");
    match download_avatar(&body.user_profile.avatar_url).await {
        Ok(avatar) => builder = builder.avatar(&avatar),
        Err(err) => {
            tracing::warn!(error = %err, "Avatar download failed; creating webhook without one");
        }
    }

    let webhook = ChannelId::new(channel_id)
        .create_webhook(&state.http, builder)
        .await
        .map_err(|err| {
            tracing::error!(channel_id, error = %err, "Failed to create webhook");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not create the webhook. Check the bot's permissions and the provided data.",
            )
        })?;

    let url = webhook.url().map_err(|err| {
        tracing::error!(error = %err, "Created webhook carries no token");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Webhook has no URL")
    })?;

    Ok(Json(json!({ "webhookUrl": url })))
}

async fn download_avatar(url: &str) -> Result<CreateAttachment, String> {
    let response = reqwest::get(url).await.map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("avatar URL answered {}", response.status()));
    }
    let bytes = response.bytes().await.map_err(|e| e.to_string())?;
    Ok(CreateAttachment::bytes(bytes.to_vec(), "avatar.png"))
}
