// Direct message handlers.

use super::state::{api_error, ApiResult, ApiState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use serenity::all::UserId;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmBody {
    user_id: String,
    content: String,
}

/// POST /api/v1/dm
///
/// Best-effort: a user with DMs disabled still yields a 200 so the
/// backend's flow is not interrupted by per-user privacy settings.
pub async fn send_dm(State(state): State<Arc<ApiState>>, Json(body): Json<DmBody>) -> ApiResult {
    let user_id: u64 = body
        .user_id
        .parse()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid userId"))?;

    let channel = UserId::new(user_id)
        .create_dm_channel(&state.http)
        .await
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "User not found"))?;

    if let Err(err) = channel.id.say(&state.http, &body.content).await {
        tracing::warn!(user_id, error = %err, "Could not deliver DM");
    }

    Ok(Json(json!({ "success": true })))
}

/// POST /api/v1/jobs/dm
///
/// Unlike the generic DM route, job flows need to know whether the
/// candidate was actually reached, so delivery failure is an error here.
pub async fn send_job_dm(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<DmBody>,
) -> ApiResult {
    let user_id: u64 = body
        .user_id
        .parse()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid userId"))?;

    let channel = UserId::new(user_id)
        .create_dm_channel(&state.http)
        .await
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "User not found"))?;

    match channel.id.say(&state.http, &body.content).await {
        Ok(message) => Ok(Json(json!({
            "success": true,
            "messageId": message.id.to_string(),
        }))),
        Err(err) => {
            tracing::warn!(user_id, error = %err, "Could not deliver job DM");
            Err(api_error(
                StatusCode::FORBIDDEN,
                "Could not send the message. The user may have DMs disabled.",
            ))
        }
    }
}
