// Core moderation module - rule evaluation engine.
//
// Rules come from the backend (push sync or pull fetch), live in the
// in-memory cache, and are evaluated against every incoming message.

pub mod action_executor;
pub mod backend;
pub mod moderation_models;
pub mod moderation_service;
pub mod report_client;
pub mod rule_cache;
pub mod spam_tracker;
pub mod trigger_evaluator;

pub use action_executor::{ActionExecutor, GatewayError, ModerationGateway};
pub use backend::{BackendError, ModerationBackend};
pub use moderation_models::*;
pub use moderation_service::ModerationService;
pub use report_client::{ReportingClient, ReportingDebugInfo};
pub use rule_cache::{CacheStatus, RuleCache};
pub use spam_tracker::SpamTracker;
pub use trigger_evaluator::TriggerEvaluator;
