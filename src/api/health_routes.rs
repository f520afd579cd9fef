// Public liveness endpoint.

use super::state::{ApiResult, ApiState};
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

/// GET /api/v1/health
pub async fn health(State(state): State<Arc<ApiState>>) -> ApiResult {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds();
    Ok(Json(json!({
        "status": "ok",
        "uptimeSecs": uptime_secs,
        "guilds": state.cache.guild_count(),
        "moderationRules": state.rules.len(),
    })))
}
