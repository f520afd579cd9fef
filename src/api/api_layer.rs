// Control-plane API - axum routes the backend uses to drive the bot.

pub mod auth;
pub mod dm_routes;
pub mod forum_routes;
pub mod guild_routes;
pub mod health_routes;
pub mod message_routes;
pub mod moderation_routes;
pub mod state;
pub mod webhook_routes;

pub use state::{build_router, ApiState};
