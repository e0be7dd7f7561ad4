//! In-memory fakes for the ports, shared by the unit tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::{
    cache::{DeletedMessageRecord, DeletionCache},
    domain::{ChannelId, GuildId, MessageId, MessageRef, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{AuthorInfo, DeletedMessage, Embed, MessagingCapabilities},
    },
    ports::RoleDirectory,
    Result,
};

pub fn author(id: u64, username: &str) -> AuthorInfo {
    AuthorInfo {
        id: UserId(id),
        username: username.to_string(),
        display_name: None,
        avatar_url: Some(format!("https://cdn.example/avatars/{id}.png")),
        is_bot: false,
    }
}

pub fn bot_author() -> AuthorInfo {
    AuthorInfo {
        is_bot: true,
        ..author(900, "robot")
    }
}

pub fn deleted_message(channel: u64, content: &str, username: &str) -> DeletedMessage {
    DeletedMessage {
        message_id: MessageId(1000 + channel),
        channel_id: ChannelId(channel),
        channel_name: None,
        guild_id: Some(GuildId(1)),
        author: Some(author(7, username)),
        is_system: false,
        is_webhook: false,
        content: content.to_string(),
        attachments: vec![],
    }
}

pub fn record_from(msg: DeletedMessage) -> Arc<DeletedMessageRecord> {
    DeletionCache::default()
        .record(msg)
        .expect("test message should be captured")
}

#[derive(Default)]
pub struct FakeMessenger {
    next_id: Mutex<u64>,
    replies: Mutex<Vec<(MessageRef, Embed)>>,
    directs: Mutex<Vec<(UserId, Embed)>>,
    fail_replies: Mutex<bool>,
    fail_directs_to: Mutex<HashSet<UserId>>,
}

impl FakeMessenger {
    pub fn failing_replies() -> Self {
        let m = Self::default();
        *m.fail_replies.lock().unwrap() = true;
        m
    }

    pub fn fail_directs_to(&self, user: UserId) {
        self.fail_directs_to.lock().unwrap().insert(user);
    }

    pub fn replies(&self) -> Vec<(MessageRef, Embed)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn directs(&self) -> Vec<(UserId, Embed)> {
        self.directs.lock().unwrap().clone()
    }

    fn alloc(&self, channel_id: ChannelId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        MessageRef {
            channel_id,
            message_id: MessageId(*guard),
        }
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities::DISCORD
    }

    async fn reply_embed(&self, to: MessageRef, embed: &Embed) -> Result<MessageRef> {
        if *self.fail_replies.lock().unwrap() {
            return Err(Error::External("reply rejected".to_string()));
        }
        self.replies.lock().unwrap().push((to, embed.clone()));
        Ok(self.alloc(to.channel_id))
    }

    async fn send_direct_embed(&self, user: UserId, embed: &Embed) -> Result<MessageRef> {
        if self.fail_directs_to.lock().unwrap().contains(&user) {
            return Err(Error::External("cannot send messages to this user".to_string()));
        }
        self.directs.lock().unwrap().push((user, embed.clone()));
        Ok(self.alloc(ChannelId(user.0)))
    }
}

/// Role membership keyed by guild, then role name.
#[derive(Default)]
pub struct FakeDirectory {
    roles: Mutex<HashMap<(GuildId, String), Vec<UserId>>>,
    broken: Mutex<bool>,
}

impl FakeDirectory {
    pub fn with_role(guild: GuildId, role: &str, members: &[u64]) -> Self {
        let dir = Self::default();
        dir.roles.lock().unwrap().insert(
            (guild, role.to_string()),
            members.iter().copied().map(UserId).collect(),
        );
        dir
    }

    pub fn broken() -> Self {
        let dir = Self::default();
        *dir.broken.lock().unwrap() = true;
        dir
    }
}

#[async_trait]
impl RoleDirectory for FakeDirectory {
    async fn member_has_role(&self, guild: GuildId, user: UserId, role_name: &str) -> Result<bool> {
        if *self.broken.lock().unwrap() {
            return Err(Error::External("member lookup failed".to_string()));
        }
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(&(guild, role_name.to_string()))
            .is_some_and(|members| members.contains(&user)))
    }

    async fn members_with_role(&self, guild: GuildId, role_name: &str) -> Result<Option<Vec<UserId>>> {
        if *self.broken.lock().unwrap() {
            return Err(Error::External("role lookup failed".to_string()));
        }
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(&(guild, role_name.to_string()))
            .cloned())
    }
}
