// Discord layer - serenity adapters for the core ports.

#[path = "moderation/gateway.rs"]
pub mod gateway;

#[path = "moderation/message_adapter.rs"]
pub mod message_adapter;

#[path = "scheduling/dispatch.rs"]
pub mod dispatch;

pub use gateway::SerenityGateway;
