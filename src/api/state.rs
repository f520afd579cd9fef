// Central shared state for the control-plane API, passed as
// Arc<ApiState> to all handlers.

use crate::core::moderation::{ReportingClient, RuleCache};
use crate::core::scheduling::SchedulerService;
use crate::discord::SerenityGateway;
use crate::infra::backend::BackendApiClient;
use crate::infra::scheduling::SqliteMessageStore;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct ApiState {
    pub http: Arc<serenity::http::Http>,
    pub cache: Arc<serenity::cache::Cache>,
    pub rules: Arc<RuleCache>,
    pub reporting: Arc<ReportingClient<BackendApiClient>>,
    pub gateway: Arc<SerenityGateway>,
    pub scheduler: Arc<SchedulerService<SqliteMessageStore>>,
    /// Pre-shared key required on every route except the health check.
    pub api_key: Option<String>,
    /// The one forum channel job postings may use.
    pub jobs_forum_channel_id: Option<u64>,
    pub started_at: DateTime<Utc>,
}

pub type ApiError = (StatusCode, Json<Value>);
pub type ApiResult = Result<Json<Value>, ApiError>;

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

/// Assemble the full router. Everything except the health check sits
/// behind the API-key middleware.
pub fn build_router(state: Arc<ApiState>) -> Router {
    use super::{auth, dm_routes, forum_routes, guild_routes, health_routes, message_routes,
        moderation_routes, webhook_routes};

    let protected = Router::new()
        .route(
            "/api/v1/moderation/rules/sync",
            post(moderation_routes::sync_rules),
        )
        .route(
            "/api/v1/moderation/status",
            get(moderation_routes::cache_status),
        )
        .route(
            "/api/v1/moderation/debug",
            get(moderation_routes::debug_info),
        )
        .route(
            "/api/v1/moderation/timeout/revoke",
            post(moderation_routes::revoke_timeout),
        )
        .route(
            "/api/v1/moderation/ban/revoke",
            post(moderation_routes::revoke_ban),
        )
        .route(
            "/api/v1/messages/schedule",
            post(message_routes::schedule_message),
        )
        .route(
            "/api/v1/messages/send-now",
            post(message_routes::send_immediate),
        )
        .route("/api/v1/guilds", get(guild_routes::list_guilds))
        .route("/api/v1/webhooks", post(webhook_routes::create_webhook))
        .route(
            "/api/v1/forum-threads",
            post(forum_routes::create_forum_thread),
        )
        .route(
            "/api/v1/forum-threads/{thread_id}/close",
            post(forum_routes::close_forum_thread),
        )
        .route("/api/v1/jobs/guilds", get(guild_routes::list_job_guilds))
        .route(
            "/api/v1/jobs/guilds/{guild_id}/channels",
            get(forum_routes::list_job_channels),
        )
        .route("/api/v1/jobs/threads", post(forum_routes::create_job_thread))
        .route(
            "/api/v1/jobs/threads/{thread_id}/close",
            post(forum_routes::close_job_thread),
        )
        .route("/api/v1/jobs/dm", post(dm_routes::send_job_dm))
        .route("/api/v1/dm", post(dm_routes::send_dm))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_api_key,
        ));

    Router::new()
        .route("/api/v1/health", get(health_routes::health))
        .merge(protected)
        .with_state(state)
}
