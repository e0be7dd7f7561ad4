use chrono::{DateTime, Utc};

use crate::domain::{ChannelId, GuildId, MessageId, MessageRef, UserId};
use crate::formatting::clamp_text;

/// Author as reported by the platform at event time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorInfo {
    pub id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_bot: bool,
}

/// File attached to a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub url: String,
    pub size_bytes: u64,
}

/// Platform delete notification, resolved against whatever the adapter
/// still knew about the message.
#[derive(Clone, Debug)]
pub struct DeletedMessage {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub channel_name: Option<String>,
    pub guild_id: Option<GuildId>,
    /// `None` when the platform could not tell us who wrote it.
    pub author: Option<AuthorInfo>,
    /// System-generated message (joins, pins, boosts, ...).
    pub is_system: bool,
    /// Sent through a webhook rather than by a user account.
    pub is_webhook: bool,
    pub content: String,
    pub attachments: Vec<Attachment>,
}

impl DeletedMessage {
    pub fn is_automated(&self) -> bool {
        self.is_system || self.is_webhook || self.author.as_ref().is_some_and(|a| a.is_bot)
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.attachments.is_empty()
    }
}

/// Channel as shown in notices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: Option<String>,
}

/// Incoming guild/DM message that may carry a command.
#[derive(Clone, Debug)]
pub struct CommandMessage {
    pub message: MessageRef,
    pub guild_id: Option<GuildId>,
    pub channel_name: Option<String>,
    pub author: AuthorInfo,
    pub content: String,
}

impl CommandMessage {
    pub fn channel(&self) -> ChannelInfo {
        ChannelInfo {
            id: self.message.channel_id,
            name: self.channel_name.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbedFooter {
    pub text: String,
    /// Adapters may fill this with the bot's own avatar when unset.
    pub icon_url: Option<String>,
}

/// Platform-neutral rich response (title, description, fields, color, footer).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Embed {
    pub color: u32,
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<EmbedFooter>,
    pub thumbnail_url: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Embed {
    pub fn new(color: u32) -> Self {
        Self {
            color,
            title: None,
            description: None,
            fields: Vec::new(),
            footer: None,
            thumbnail_url: None,
            timestamp: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter {
            text: text.into(),
            icon_url: None,
        });
        self
    }

    pub fn thumbnail(mut self, url: Option<String>) -> Self {
        self.thumbnail_url = url;
        self
    }

    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }

    /// Clamp text to the messenger's limits so oversized content (long
    /// messages, many attachments) degrades instead of being rejected.
    pub fn fit(mut self, caps: &MessagingCapabilities) -> Self {
        self.title = self.title.map(|t| clamp_text(&t, caps.max_title_len));
        self.description = self
            .description
            .map(|d| clamp_text(&d, caps.max_description_len));
        for f in &mut self.fields {
            f.name = clamp_text(&f.name, caps.max_title_len);
            f.value = clamp_text(&f.value, caps.max_field_value_len);
        }
        self
    }
}

/// Capabilities / limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_direct_messages: bool,
    pub max_title_len: usize,
    pub max_description_len: usize,
    pub max_field_value_len: usize,
}

impl MessagingCapabilities {
    /// Discord embed limits.
    pub const DISCORD: Self = Self {
        supports_direct_messages: true,
        max_title_len: 256,
        max_description_len: 4096,
        max_field_value_len: 1024,
    };
}
