// Guild listing for the backend's channel pickers. Served straight from
// the serenity cache; no Discord round trips.

use super::state::{ApiResult, ApiState};
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use serenity::all::ChannelType;
use std::sync::Arc;

/// GET /api/v1/guilds
///
/// Every guild the bot is in, with its text and announcement channels
/// ordered by position.
pub async fn list_guilds(State(state): State<Arc<ApiState>>) -> ApiResult {
    let mut guilds: Vec<Value> = Vec::new();

    for guild_id in state.cache.guilds() {
        let Some(guild) = state.cache.guild(guild_id) else {
            continue;
        };

        let mut channels: Vec<(u16, Value)> = guild
            .channels
            .values()
            .filter(|channel| matches!(channel.kind, ChannelType::Text | ChannelType::News))
            .map(|channel| {
                (
                    channel.position,
                    json!({
                        "id": channel.id.to_string(),
                        "name": channel.name,
                    }),
                )
            })
            .collect();
        channels.sort_by_key(|(position, _)| *position);

        guilds.push(json!({
            "id": guild.id.to_string(),
            "name": guild.name,
            "iconURL": guild.icon_url(),
            "channels": channels.into_iter().map(|(_, c)| c).collect::<Vec<_>>(),
        }));
    }

    Ok(Json(Value::Array(guilds)))
}

/// GET /api/v1/jobs/guilds
pub async fn list_job_guilds(State(state): State<Arc<ApiState>>) -> ApiResult {
    let guilds: Vec<Value> = state
        .cache
        .guilds()
        .into_iter()
        .filter_map(|guild_id| {
            state.cache.guild(guild_id).map(|guild| {
                json!({
                    "id": guild.id.to_string(),
                    "name": guild.name,
                    "iconURL": guild.icon_url(),
                })
            })
        })
        .collect();

    Ok(Json(Value::Array(guilds)))
}
