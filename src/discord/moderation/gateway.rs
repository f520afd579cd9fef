// Serenity-backed implementation of the moderation gateway.
//
// Translates the core executor's platform-agnostic calls into Discord
// HTTP requests. All errors collapse into `GatewayError` strings; the
// executor records them in action results.

use crate::core::moderation::{GatewayError, IncomingMessage, ModerationGateway};
use async_trait::async_trait;
use serenity::all::{
    ChannelId, ChannelType, CreateEmbed, CreateMessage, EditMember, GuildId, MessageId, RoleId,
    Timestamp, UserId,
};
use serenity::http::Http;
use std::sync::Arc;

/// Discord embed field value limit.
const EMBED_FIELD_LIMIT: usize = 1024;

pub struct SerenityGateway {
    http: Arc<Http>,
}

impl SerenityGateway {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    fn platform(err: serenity::Error) -> GatewayError {
        GatewayError(err.to_string())
    }

    /// Resolves a channel and ensures it can take plain text messages.
    async fn text_channel(&self, channel_id: u64) -> Result<ChannelId, GatewayError> {
        let channel = self
            .http
            .get_channel(ChannelId::new(channel_id))
            .await
            .map_err(|_| GatewayError("Channel not found".to_string()))?;

        match channel.guild() {
            Some(guild_channel)
                if matches!(guild_channel.kind, ChannelType::Text | ChannelType::News) =>
            {
                Ok(guild_channel.id)
            }
            _ => Err(GatewayError(
                "Channel does not support text messages".to_string(),
            )),
        }
    }
}

fn truncate_to(content: &str, limit: usize) -> String {
    if content.chars().count() <= limit {
        content.to_string()
    } else {
        let mut out: String = content.chars().take(limit.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}

#[async_trait]
impl ModerationGateway for SerenityGateway {
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), GatewayError> {
        self.http
            .delete_message(
                ChannelId::new(channel_id),
                MessageId::new(message_id),
                Some("Moderation rule violation"),
            )
            .await
            .map_err(Self::platform)
    }

    async fn timeout_member(
        &self,
        guild_id: u64,
        user_id: u64,
        duration_secs: u64,
        reason: &str,
    ) -> Result<(), GatewayError> {
        let until = Timestamp::from_unix_timestamp(
            chrono::Utc::now().timestamp() + duration_secs as i64,
        )
        .map_err(|e| GatewayError(format!("Invalid timeout duration: {e}")))?;

        GuildId::new(guild_id)
            .edit_member(
                &self.http,
                UserId::new(user_id),
                EditMember::new()
                    .disable_communication_until_datetime(until)
                    .audit_log_reason(reason),
            )
            .await
            .map(|_| ())
            .map_err(Self::platform)
    }

    async fn revoke_timeout(&self, guild_id: u64, user_id: u64) -> Result<(), GatewayError> {
        GuildId::new(guild_id)
            .edit_member(
                &self.http,
                UserId::new(user_id),
                EditMember::new().enable_communication(),
            )
            .await
            .map(|_| ())
            .map_err(Self::platform)
    }

    async fn ban_member(
        &self,
        guild_id: u64,
        user_id: u64,
        reason: &str,
    ) -> Result<(), GatewayError> {
        GuildId::new(guild_id)
            .ban_with_reason(&self.http, UserId::new(user_id), 0, reason)
            .await
            .map_err(Self::platform)
    }

    async fn revoke_ban(&self, guild_id: u64, user_id: u64) -> Result<(), GatewayError> {
        GuildId::new(guild_id)
            .unban(&self.http, UserId::new(user_id))
            .await
            .map_err(Self::platform)
    }

    async fn kick_member(
        &self,
        guild_id: u64,
        user_id: u64,
        reason: &str,
    ) -> Result<(), GatewayError> {
        GuildId::new(guild_id)
            .kick_with_reason(&self.http, UserId::new(user_id), reason)
            .await
            .map_err(Self::platform)
    }

    async fn send_dm(&self, user_id: u64, message: &str) -> Result<(), GatewayError> {
        let channel = UserId::new(user_id)
            .create_dm_channel(&self.http)
            .await
            .map_err(|_| {
                GatewayError("Could not send DM (user may have DMs disabled)".to_string())
            })?;

        channel
            .id
            .say(&self.http, message)
            .await
            .map(|_| ())
            .map_err(|_| {
                GatewayError("Could not send DM (user may have DMs disabled)".to_string())
            })
    }

    async fn send_log_message(
        &self,
        channel_id: u64,
        message: &IncomingMessage,
    ) -> Result<(), GatewayError> {
        let target = self.text_channel(channel_id).await?;

        let content = if message.content.is_empty() {
            "(no text content)".to_string()
        } else {
            truncate_to(&message.content, EMBED_FIELD_LIMIT)
        };

        let timestamp = Timestamp::from_unix_timestamp(message.timestamp.timestamp())
            .unwrap_or_else(|_| Timestamp::now());

        let mut embed = CreateEmbed::new()
            .title("🛡️ Moderation rule triggered")
            .color(0xE74C3C)
            .field(
                "Author",
                format!("{} (<@{}>)", message.author_tag, message.author_id),
                true,
            )
            .field("Channel", format!("<#{}>", message.channel_id), true)
            .field("Message", content, false)
            .timestamp(timestamp);

        if !message.attachments.is_empty() {
            let links = message
                .attachments
                .iter()
                .map(|a| a.url.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            embed = embed.field("Attachments", truncate_to(&links, EMBED_FIELD_LIMIT), false);
        }

        target
            .send_message(&self.http, CreateMessage::new().embed(embed))
            .await
            .map(|_| ())
            .map_err(Self::platform)
    }

    async fn add_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), GatewayError> {
        self.http
            .add_member_role(
                GuildId::new(guild_id),
                UserId::new(user_id),
                RoleId::new(role_id),
                Some("Moderation rule violation"),
            )
            .await
            .map_err(Self::platform)
    }

    async fn remove_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), GatewayError> {
        self.http
            .remove_member_role(
                GuildId::new(guild_id),
                UserId::new(user_id),
                RoleId::new(role_id),
                Some("Moderation rule violation"),
            )
            .await
            .map_err(Self::platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let short = "hello";
        assert_eq!(truncate_to(short, 10), "hello");

        let long = "a".repeat(2000);
        let truncated = truncate_to(&long, 1024);
        assert_eq!(truncated.chars().count(), 1024);
        assert!(truncated.ends_with("..."));

        // Multi-byte content must not split a code point.
        let emoji = "🔥".repeat(600);
        let truncated = truncate_to(&emoji, 100);
        assert!(truncated.chars().count() <= 100);
    }
}
