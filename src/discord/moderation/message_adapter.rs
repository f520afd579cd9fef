// Converts a serenity message into the core `IncomingMessage` view.

use crate::core::moderation::{AttachmentMeta, IncomingMessage};
use chrono::Utc;
use serenity::all::Message;
use std::collections::HashSet;

pub fn incoming_from_message(message: &Message) -> IncomingMessage {
    // Distinct users only; repeating the same mention does not inflate
    // the count.
    let distinct_mention_count = message
        .mentions
        .iter()
        .map(|user| user.id)
        .collect::<HashSet<_>>()
        .len();

    IncomingMessage {
        message_id: message.id.get(),
        channel_id: message.channel_id.get(),
        guild_id: message.guild_id.map(|id| id.get()),
        author_id: message.author.id.get(),
        author_tag: message.author.tag(),
        content: message.content.clone(),
        attachments: message
            .attachments
            .iter()
            .map(|attachment| AttachmentMeta {
                url: attachment.url.clone(),
                name: attachment.filename.clone(),
                content_type: attachment.content_type.clone(),
            })
            .collect(),
        distinct_mention_count,
        member_role_ids: message
            .member
            .as_ref()
            .map(|member| member.roles.iter().map(|role| role.get()).collect()),
        timestamp: message.timestamp.with_timezone(&Utc),
    }
}
