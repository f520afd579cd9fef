// API-key middleware. Requests without a valid x-api-key never reach the
// handlers.

use super::state::{api_error, ApiState};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

pub async fn require_api_key(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Result<Response, super::state::ApiError> {
    let Some(expected) = state.api_key.as_deref() else {
        tracing::error!("INTERNAL_API_KEY not configured; rejecting control-plane request");
        return Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal configuration error",
        ));
    };

    let provided = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());

    match provided {
        None => Err(api_error(StatusCode::UNAUTHORIZED, "API key required")),
        Some(key) if key != expected => {
            Err(api_error(StatusCode::FORBIDDEN, "Invalid API key"))
        }
        Some(_) => Ok(next.run(request).await),
    }
}
