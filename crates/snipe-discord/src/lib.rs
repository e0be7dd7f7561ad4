//! Discord adapter (twilight).
//!
//! This crate implements the `snipe-core` ports over the Discord gateway and
//! REST API: messaging, role lookups and platform stats.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use twilight_http::Client;
use twilight_model::id::{
    marker::{ChannelMarker, GuildMarker, MessageMarker, UserMarker},
    Id,
};

pub mod directory;
pub mod embed;
pub mod handlers;
pub mod presence;
pub mod runtime;

use snipe_core::{
    domain::{ChannelId, GuildId, MessageId, MessageRef, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{Embed, MessagingCapabilities},
    },
    Result,
};

pub(crate) fn map_err(e: impl std::fmt::Display) -> Error {
    Error::External(format!("discord error: {e}"))
}

pub(crate) fn channel_id(id: ChannelId) -> Result<Id<ChannelMarker>> {
    Id::new_checked(id.0).ok_or_else(|| Error::External("invalid channel id 0".to_string()))
}

pub(crate) fn message_id(id: MessageId) -> Result<Id<MessageMarker>> {
    Id::new_checked(id.0).ok_or_else(|| Error::External("invalid message id 0".to_string()))
}

pub(crate) fn user_id(id: UserId) -> Result<Id<UserMarker>> {
    Id::new_checked(id.0).ok_or_else(|| Error::External("invalid user id 0".to_string()))
}

pub(crate) fn guild_id(id: GuildId) -> Result<Id<GuildMarker>> {
    Id::new_checked(id.0).ok_or_else(|| Error::External("invalid guild id 0".to_string()))
}

#[derive(Clone)]
pub struct DiscordMessenger {
    http: Arc<Client>,
    footer_icon: Arc<RwLock<Option<String>>>,
}

impl DiscordMessenger {
    pub fn new(http: Arc<Client>) -> Self {
        Self {
            http,
            footer_icon: Arc::new(RwLock::new(None)),
        }
    }

    pub fn http(&self) -> Arc<Client> {
        self.http.clone()
    }

    /// Icon used for footers that do not carry one (the bot's own avatar).
    pub fn set_footer_icon(&self, url: Option<String>) {
        *self.footer_icon.write().unwrap_or_else(|e| e.into_inner()) = url;
    }

    fn render(&self, embed: &Embed) -> twilight_model::channel::message::Embed {
        let icon = self
            .footer_icon
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        embed::to_twilight(embed, icon.as_deref())
    }
}

#[async_trait]
impl MessagingPort for DiscordMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities::DISCORD
    }

    async fn reply_embed(&self, to: MessageRef, embed: &Embed) -> Result<MessageRef> {
        let rendered = [self.render(embed)];
        let msg = self
            .http
            .create_message(channel_id(to.channel_id)?)
            .embeds(&rendered)
            .reply(message_id(to.message_id)?)
            .await
            .map_err(map_err)?
            .model()
            .await
            .map_err(map_err)?;

        Ok(MessageRef {
            channel_id: to.channel_id,
            message_id: MessageId(msg.id.get()),
        })
    }

    async fn send_direct_embed(&self, user: UserId, embed: &Embed) -> Result<MessageRef> {
        let dm = self
            .http
            .create_private_channel(user_id(user)?)
            .await
            .map_err(map_err)?
            .model()
            .await
            .map_err(map_err)?;

        let rendered = [self.render(embed)];
        let msg = self
            .http
            .create_message(dm.id)
            .embeds(&rendered)
            .await
            .map_err(map_err)?
            .model()
            .await
            .map_err(map_err)?;

        Ok(MessageRef {
            channel_id: ChannelId(dm.id.get()),
            message_id: MessageId(msg.id.get()),
        })
    }
}
