// Moderation control-plane handlers: rule sync, cache status, reporting
// diagnostics and the direct timeout/ban revocations.

use super::state::{api_error, ApiResult, ApiState};
use crate::core::moderation::{ModerationGateway, RulePayload};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// POST /api/v1/moderation/rules/sync
///
/// Receives the full rule set from the backend and replaces the in-memory
/// cache. Partial updates do not exist; what is sent is what runs.
pub async fn sync_rules(State(state): State<Arc<ApiState>>, Json(body): Json<Value>) -> ApiResult {
    let Some(rules) = body.get("rules").and_then(Value::as_array) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Rules must be an array"));
    };

    let mut payloads: Vec<RulePayload> = Vec::with_capacity(rules.len());
    for rule in rules {
        match serde_json::from_value(rule.clone()) {
            Ok(payload) => payloads.push(payload),
            Err(err) => {
                tracing::warn!(error = %err, "Rejected malformed rule in sync payload");
                return Err(api_error(StatusCode::BAD_REQUEST, "Invalid rule structure"));
            }
        }
    }

    let received = payloads.len();
    state.rules.load_rules(payloads);

    tracing::info!(received, active = state.rules.len(), "Synced rules from backend");

    Ok(Json(json!({
        "success": true,
        "message": format!("Successfully synced {received} rules"),
        "rulesCount": state.rules.len(),
        "syncedAt": Utc::now().to_rfc3339(),
    })))
}

/// GET /api/v1/moderation/status
pub async fn cache_status(State(state): State<Arc<ApiState>>) -> ApiResult {
    let status = state.rules.status();
    let mut value = serde_json::to_value(&status)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    value["success"] = json!(true);
    Ok(Json(value))
}

/// GET /api/v1/moderation/debug
///
/// Reporting-client diagnostics. Safe to expose: key presence and length
/// only, never the key.
pub async fn debug_info(State(state): State<Arc<ApiState>>) -> ApiResult {
    let snapshot = state.reporting.debug_snapshot();
    let mut value = serde_json::to_value(&snapshot)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    value["success"] = json!(true);
    Ok(Json(value))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeBody {
    guild_id: String,
    user_id: String,
}

fn parse_ids(body: &RevokeBody) -> Result<(u64, u64), super::state::ApiError> {
    let guild_id = body
        .guild_id
        .parse()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid guildId"))?;
    let user_id = body
        .user_id
        .parse()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid userId"))?;
    Ok((guild_id, user_id))
}

/// POST /api/v1/moderation/timeout/revoke
///
/// Administrative action: lifts an active timeout directly, bypassing the
/// rule engine.
pub async fn revoke_timeout(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<RevokeBody>,
) -> ApiResult {
    let (guild_id, user_id) = parse_ids(&body)?;

    state
        .gateway
        .revoke_timeout(guild_id, user_id)
        .await
        .map_err(|err| {
            tracing::error!(guild_id, user_id, error = %err, "Failed to revoke timeout");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to revoke timeout")
        })?;

    Ok(Json(json!({ "success": true })))
}

/// POST /api/v1/moderation/ban/revoke
pub async fn revoke_ban(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<RevokeBody>,
) -> ApiResult {
    let (guild_id, user_id) = parse_ids(&body)?;

    state
        .gateway
        .revoke_ban(guild_id, user_id)
        .await
        .map_err(|err| {
            tracing::error!(guild_id, user_id, error = %err, "Failed to revoke ban");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to revoke ban")
        })?;

    Ok(Json(json!({ "success": true })))
}
