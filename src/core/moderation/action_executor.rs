// Action execution - applies a triggered rule's actions to the offending
// message and author.
//
// The gateway trait is the port to the chat platform; the serenity
// implementation lives in the discord layer. The executor owns ordering
// and result capture: actions run strictly sequentially, one failure never
// aborts the rest, and notifications always run before removals.

use super::moderation_models::{Action, ActionKind, ActionOutcome, IncomingMessage};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct GatewayError(pub String);

/// Platform moderation calls needed by the executor, plus the two direct
/// administrative actions (timeout/ban revocation) the control plane
/// exposes outside the rule engine.
#[async_trait]
pub trait ModerationGateway: Send + Sync {
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), GatewayError>;

    async fn timeout_member(
        &self,
        guild_id: u64,
        user_id: u64,
        duration_secs: u64,
        reason: &str,
    ) -> Result<(), GatewayError>;

    async fn revoke_timeout(&self, guild_id: u64, user_id: u64) -> Result<(), GatewayError>;

    async fn ban_member(&self, guild_id: u64, user_id: u64, reason: &str)
        -> Result<(), GatewayError>;

    async fn revoke_ban(&self, guild_id: u64, user_id: u64) -> Result<(), GatewayError>;

    async fn kick_member(
        &self,
        guild_id: u64,
        user_id: u64,
        reason: &str,
    ) -> Result<(), GatewayError>;

    async fn send_dm(&self, user_id: u64, message: &str) -> Result<(), GatewayError>;

    /// Posts a structured moderation notice to a text-capable channel.
    async fn send_log_message(
        &self,
        channel_id: u64,
        message: &IncomingMessage,
    ) -> Result<(), GatewayError>;

    async fn add_role(&self, guild_id: u64, user_id: u64, role_id: u64)
        -> Result<(), GatewayError>;

    async fn remove_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), GatewayError>;
}

/// Safety buckets: notifications first, removals last, so a user still
/// receives their DM before losing the ability to get one.
fn safety_class(kind: &ActionKind) -> u8 {
    match kind {
        ActionKind::SendDm { .. } | ActionKind::SendLogMessage { .. } => 0,
        ActionKind::Ban { .. } | ActionKind::Kick { .. } => 2,
        _ => 1,
    }
}

pub struct ActionExecutor<G: ModerationGateway> {
    gateway: Arc<G>,
}

impl<G: ModerationGateway> ActionExecutor<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Sorts by the author-declared order, then stably partitions into
    /// messaging -> other -> destructive.
    fn reorder(actions: &[Action]) -> Vec<Action> {
        let mut ordered = actions.to_vec();
        ordered.sort_by_key(|action| action.order);
        ordered.sort_by_key(|action| safety_class(&action.kind));
        ordered
    }

    /// Runs every action against the message, sequentially, capturing one
    /// outcome per action. Individual failures are recorded and execution
    /// continues.
    pub async fn execute_actions(
        &self,
        message: &IncomingMessage,
        actions: &[Action],
    ) -> Vec<ActionOutcome> {
        let mut results = Vec::with_capacity(actions.len());

        for action in Self::reorder(actions) {
            let outcome = self.execute_one(message, &action).await;
            if let Some(error) = &outcome.error {
                tracing::warn!(
                    action_type = %outcome.action_type,
                    error = %error,
                    "Moderation action failed"
                );
            }
            results.push(outcome);
        }

        results
    }

    async fn execute_one(&self, message: &IncomingMessage, action: &Action) -> ActionOutcome {
        match &action.kind {
            ActionKind::DeleteMessage => self
                .capture(action, || {
                    self.gateway
                        .delete_message(message.channel_id, message.message_id)
                })
                .await,

            ActionKind::Timeout {
                duration_secs,
                reason,
                dm_message,
            } => {
                let Some(guild_id) = member_guild(message) else {
                    return ActionOutcome::failure(action, "Member not found");
                };
                self.best_effort_dm(message.author_id, dm_message.as_deref())
                    .await;
                self.capture(action, || {
                    self.gateway.timeout_member(
                        guild_id,
                        message.author_id,
                        *duration_secs,
                        reason,
                    )
                })
                .await
            }

            ActionKind::Ban { reason, dm_message } => {
                let Some(guild_id) = member_guild(message) else {
                    return ActionOutcome::failure(action, "Member not found");
                };
                self.best_effort_dm(message.author_id, dm_message.as_deref())
                    .await;
                self.capture(action, || {
                    self.gateway.ban_member(guild_id, message.author_id, reason)
                })
                .await
            }

            ActionKind::Kick { reason } => {
                let Some(guild_id) = member_guild(message) else {
                    return ActionOutcome::failure(action, "Member not found");
                };
                self.capture(action, || {
                    self.gateway.kick_member(guild_id, message.author_id, reason)
                })
                .await
            }

            ActionKind::SendDm { message: dm } => {
                self.capture(action, || self.gateway.send_dm(message.author_id, dm))
                    .await
            }

            ActionKind::SendLogMessage { channel_id } => match channel_id {
                Some(channel_id) => self
                    .capture(action, || {
                        self.gateway.send_log_message(*channel_id, message)
                    })
                    .await,
                None => ActionOutcome::failure(action, "Missing channelId in action config"),
            },

            ActionKind::AddRole { role_id } => {
                match (member_guild(message), role_id) {
                    (Some(guild_id), Some(role_id)) => self
                        .capture(action, || {
                            self.gateway.add_role(guild_id, message.author_id, *role_id)
                        })
                        .await,
                    _ => ActionOutcome::failure(action, "Member or roleId not found"),
                }
            }

            ActionKind::RemoveRole { role_id } => {
                match (member_guild(message), role_id) {
                    (Some(guild_id), Some(role_id)) => self
                        .capture(action, || {
                            self.gateway
                                .remove_role(guild_id, message.author_id, *role_id)
                        })
                        .await,
                    _ => ActionOutcome::failure(action, "Member or roleId not found"),
                }
            }

            // No platform side effect; exists so the rule execution shows
            // up in the backend log.
            ActionKind::LogOnly => ActionOutcome::success(action),

            ActionKind::Unknown(name) => {
                tracing::warn!(action_type = %name, "Unknown action type");
                ActionOutcome::failure(action, "Unknown action type")
            }
        }
    }

    async fn capture<F, Fut>(&self, action: &Action, call: F) -> ActionOutcome
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<(), GatewayError>>,
    {
        match call().await {
            Ok(()) => ActionOutcome::success(action),
            Err(err) => ActionOutcome::failure(action, err.0),
        }
    }

    /// Pre-punishment DM. Its failure is logged and swallowed; the primary
    /// action proceeds regardless.
    async fn best_effort_dm(&self, user_id: u64, dm_message: Option<&str>) {
        if let Some(dm) = dm_message {
            if let Err(err) = self.gateway.send_dm(user_id, dm).await {
                tracing::warn!(user_id, error = %err, "Pre-punishment DM failed");
            }
        }
    }
}

/// Member-requiring actions need both a guild and member context.
fn member_guild(message: &IncomingMessage) -> Option<u64> {
    match (&message.member_role_ids, message.guild_id) {
        (Some(_), Some(guild_id)) => Some(guild_id),
        _ => None,
    }
}
