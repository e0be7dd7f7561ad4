//! Gateway payloads → core events.

use std::collections::{HashMap, VecDeque};

use twilight_cache_inmemory::InMemoryCache;
use twilight_model::{
    channel::{
        message::{Message, MessageType},
        Attachment as DiscordAttachment,
    },
    gateway::{event::Event, payload::incoming::MessageDelete},
    id::{
        marker::{ChannelMarker, MessageMarker, UserMarker},
        Id,
    },
    user::User,
    util::ImageHash,
};

use snipe_core::{
    cache::UNKNOWN_USER,
    domain::{ChannelId, GuildId, MessageId, MessageRef, UserId},
    messaging::types::{Attachment, AuthorInfo, CommandMessage, DeletedMessage},
};

const CDN: &str = "https://cdn.discordapp.com";

/// Avatar URL, or the default avatar Discord derives from the user id.
pub fn avatar_url(user: u64, avatar: Option<&ImageHash>) -> String {
    match avatar {
        Some(hash) => {
            let ext = if hash.is_animated() { "gif" } else { "png" };
            format!("{CDN}/avatars/{user}/{hash}.{ext}")
        }
        None => format!("{CDN}/embed/avatars/{}.png", (user >> 22) % 6),
    }
}

/// Joins, pins, boosts and the like. Plain messages and replies are the only
/// user-authored kinds.
pub fn is_system_kind(kind: MessageType) -> bool {
    !matches!(kind, MessageType::Regular | MessageType::Reply)
}

pub fn author_info(user: &User) -> AuthorInfo {
    AuthorInfo {
        id: UserId(user.id.get()),
        username: user.name.clone(),
        display_name: user.global_name.clone(),
        avatar_url: Some(avatar_url(user.id.get(), user.avatar.as_ref())),
        is_bot: user.bot,
    }
}

fn attachment(a: &DiscordAttachment) -> Attachment {
    Attachment {
        name: a.filename.clone(),
        url: a.url.clone(),
        size_bytes: a.size,
    }
}

fn channel_name(cache: &InMemoryCache, id: Id<ChannelMarker>) -> Option<String> {
    cache.channel(id).and_then(|c| c.name.clone())
}

/// Authors of cached messages, held exactly as long as the gateway cache
/// holds the message.
///
/// The gateway cache forgets a user once they share no guild with the bot but
/// keeps their messages, so the author is snapshotted here at create time.
#[derive(Debug)]
pub struct AuthorLedger {
    per_channel: usize,
    authors: HashMap<Id<MessageMarker>, AuthorInfo>,
    channels: HashMap<Id<ChannelMarker>, VecDeque<Id<MessageMarker>>>,
}

impl AuthorLedger {
    /// `per_channel` must match the cache's `message_cache_size`.
    pub fn new(per_channel: usize) -> Self {
        Self {
            per_channel,
            authors: HashMap::new(),
            channels: HashMap::new(),
        }
    }

    pub fn author(&self, id: Id<MessageMarker>) -> Option<&AuthorInfo> {
        self.authors.get(&id)
    }

    pub fn len(&self) -> usize {
        self.authors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }

    // Same eviction as the cache: pop the oldest once the channel is full,
    // then push the new id.
    fn remember(&mut self, msg: &Message) {
        let ids = self.channels.entry(msg.channel_id).or_default();
        if ids.len() >= self.per_channel {
            if let Some(evicted) = ids.pop_back() {
                self.authors.remove(&evicted);
            }
        }
        ids.push_front(msg.id);
        self.authors.insert(msg.id, author_info(&msg.author));
    }

    fn forget(&mut self, channel: Id<ChannelMarker>, gone: &[Id<MessageMarker>]) {
        for id in gone {
            self.authors.remove(id);
        }
        if let Some(ids) = self.channels.get_mut(&channel) {
            ids.retain(|id| !gone.contains(id));
            if ids.is_empty() {
                self.channels.remove(&channel);
            }
        }
    }
}

fn unknown_author(id: Id<UserMarker>) -> AuthorInfo {
    AuthorInfo {
        id: UserId(id.get()),
        username: UNKNOWN_USER.to_string(),
        display_name: None,
        avatar_url: Some(avatar_url(id.get(), None)),
        is_bot: false,
    }
}

/// Apply one gateway event to the ledger and the cache.
///
/// A delete is resolved against the cache before the cache applies it; the
/// resolved message is returned.
pub fn apply_event(
    cache: &InMemoryCache,
    authors: &mut AuthorLedger,
    event: &Event,
) -> Option<DeletedMessage> {
    let deleted = match event {
        Event::MessageDelete(del) => deleted_message(cache, authors, del),
        _ => None,
    };

    match event {
        Event::MessageCreate(msg) => authors.remember(msg),
        Event::MessageDelete(del) => authors.forget(del.channel_id, &[del.id]),
        Event::MessageDeleteBulk(bulk) => authors.forget(bulk.channel_id, &bulk.ids),
        _ => {}
    }

    cache.update(event);
    deleted
}

/// Resolve a delete notification against the message cache.
///
/// Must run *before* the cache applies the event. Returns `None` when the
/// message was never cached (sent before startup or evicted).
pub fn deleted_message(
    cache: &InMemoryCache,
    authors: &AuthorLedger,
    event: &MessageDelete,
) -> Option<DeletedMessage> {
    let (author_id, kind, webhook, content, attachments) = {
        let cached = cache.message(event.id)?;
        (
            cached.author(),
            cached.kind(),
            cached.webhook_id().is_some(),
            cached.content().to_string(),
            cached.attachments().iter().map(attachment).collect::<Vec<_>>(),
        )
    };

    let author = authors
        .author(event.id)
        .cloned()
        .or_else(|| cache.user(author_id).map(|u| author_info(&u)))
        .unwrap_or_else(|| unknown_author(author_id));

    Some(DeletedMessage {
        message_id: MessageId(event.id.get()),
        channel_id: ChannelId(event.channel_id.get()),
        channel_name: channel_name(cache, event.channel_id),
        guild_id: event.guild_id.map(|g| GuildId(g.get())),
        author: Some(author),
        is_system: is_system_kind(kind),
        is_webhook: webhook,
        content,
        attachments,
    })
}

pub fn command_message(cache: &InMemoryCache, msg: &Message) -> CommandMessage {
    let mut author = author_info(&msg.author);
    if let Some(nick) = msg.member.as_ref().and_then(|m| m.nick.clone()) {
        author.display_name = Some(nick);
    }

    CommandMessage {
        message: MessageRef {
            channel_id: ChannelId(msg.channel_id.get()),
            message_id: MessageId(msg.id.get()),
        },
        guild_id: msg.guild_id.map(|g| GuildId(g.get())),
        channel_name: channel_name(cache, msg.channel_id),
        author,
        content: msg.content.clone(),
    }
}
