// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "moderation/backend_client.rs"]
pub mod backend;

#[path = "scheduling/sqlite_message_store.rs"]
pub mod scheduling;
