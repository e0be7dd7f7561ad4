//! Event dispatch: one method per inbound event kind.
//!
//! `on_message_deleted` is synchronous so the adapter can call it inline in its
//! gateway loop, which keeps per-channel capture order equal to delivery order.
//! Command handling suspends only at I/O (role lookup, reply). Notifications
//! are handed back as [`FollowUp`]s for the caller to spawn.

use std::sync::Arc;

use tracing::{error, info};

use crate::{
    cache::{DeletedMessageRecord, DeletionCache},
    formatting::{denied_embed, error_embed, not_found_embed, snipe_embed},
    messaging::{
        port::MessagingPort,
        types::{CommandMessage, DeletedMessage, Embed},
    },
    notify::{FollowUp, NotificationEvent, Notifier},
    ports::RoleDirectory,
    status::ActivityMonitor,
    Result,
};

pub const DEFAULT_COMMAND_PREFIX: &str = ".snipe";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Not a command (or sent by an automated account).
    Ignored,
    /// Invoker lacks the role; denial sent.
    Denied,
    /// Nothing cached for the channel; "no messages" sent.
    NotFound,
    /// Snipe result sent.
    Sniped(Arc<DeletedMessageRecord>),
    /// Handling failed; generic error reply attempted.
    Failed,
}

pub struct CommandReport {
    pub outcome: CommandOutcome,
    pub follow_up: Option<FollowUp>,
}

impl CommandReport {
    fn done(outcome: CommandOutcome) -> Self {
        Self {
            outcome,
            follow_up: None,
        }
    }
}

pub struct EventRouter {
    cache: Arc<DeletionCache>,
    messenger: Arc<dyn MessagingPort>,
    directory: Arc<dyn RoleDirectory>,
    notifier: Arc<Notifier>,
    monitor: Arc<ActivityMonitor>,
    prefix: String,
}

impl EventRouter {
    pub fn new(
        cache: Arc<DeletionCache>,
        messenger: Arc<dyn MessagingPort>,
        directory: Arc<dyn RoleDirectory>,
        notifier: Arc<Notifier>,
        monitor: Arc<ActivityMonitor>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            messenger,
            directory,
            notifier,
            monitor,
            prefix: prefix.into(),
        }
    }

    pub fn cache(&self) -> &Arc<DeletionCache> {
        &self.cache
    }

    /// Capture a deleted message. Returns the `message_deleted` notification
    /// to deliver, or `None` when the message was filtered out.
    pub fn on_message_deleted(&self, msg: DeletedMessage) -> Option<FollowUp> {
        let guild = msg.guild_id;
        let record = self.cache.record(msg)?;
        self.monitor.touch();

        info!(
            channel = record.channel_id.0,
            "captured deleted message from {} in {}",
            record.author.username,
            record
                .channel_name
                .as_deref()
                .map(|n| format!("#{n}"))
                .unwrap_or_else(|| format!("channel {}", record.channel_id.0))
        );

        Some(FollowUp::new(
            self.notifier.clone(),
            guild,
            NotificationEvent::MessageDeleted { record },
        ))
    }

    pub fn is_command(&self, content: &str) -> bool {
        content
            .to_lowercase()
            .starts_with(&self.prefix.to_lowercase())
    }

    /// Handle an incoming message that may be a snipe command.
    ///
    /// Never fails: errors are logged and answered with a generic reply.
    pub async fn on_command_message(&self, msg: CommandMessage) -> CommandReport {
        if msg.author.is_bot || !self.is_command(&msg.content) {
            return CommandReport::done(CommandOutcome::Ignored);
        }
        self.monitor.touch();

        match self.snipe(&msg).await {
            Ok(report) => report,
            Err(e) => {
                error!(
                    user = msg.author.id.0,
                    channel = msg.message.channel_id.0,
                    "error handling snipe command: {e}"
                );
                if let Err(e) = self.reply(&msg, error_embed()).await {
                    error!("failed to send snipe error reply: {e}");
                }
                CommandReport::done(CommandOutcome::Failed)
            }
        }
    }

    async fn snipe(&self, msg: &CommandMessage) -> Result<CommandReport> {
        let authorized = match msg.guild_id {
            Some(guild) => {
                self.directory
                    .member_has_role(guild, msg.author.id, self.notifier.role_name())
                    .await?
            }
            None => false,
        };

        if !authorized {
            info!(user = msg.author.id.0, "unauthorized snipe attempt by {}", msg.author.username);
            self.reply(msg, denied_embed()).await?;
            return Ok(CommandReport::done(CommandOutcome::Denied));
        }

        let Some(record) = self.cache.peek_latest(msg.message.channel_id) else {
            self.reply(msg, not_found_embed()).await?;
            return Ok(CommandReport::done(CommandOutcome::NotFound));
        };

        self.reply(msg, snipe_embed(&record)).await?;

        info!(
            channel = msg.message.channel_id.0,
            "{} sniped a message from {}",
            msg.author.username,
            record.author.username
        );

        let event = NotificationEvent::SnipeUsed {
            invoker: msg.author.clone(),
            channel: msg.channel(),
            record: record.clone(),
            command: self.prefix.clone(),
        };
        Ok(CommandReport {
            outcome: CommandOutcome::Sniped(record),
            follow_up: Some(FollowUp::new(self.notifier.clone(), msg.guild_id, event)),
        })
    }

    async fn reply(&self, msg: &CommandMessage, embed: Embed) -> Result<()> {
        let embed = embed.fit(&self.messenger.capabilities());
        self.messenger.reply_embed(msg.message, &embed).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChannelId, GuildId, MessageId, MessageRef, UserId};
    use crate::messaging::types::AuthorInfo;
    use crate::notify::DEFAULT_ROLE;
    use crate::test_support::{author, bot_author, deleted_message, FakeDirectory, FakeMessenger};
    use std::time::Duration;

    const GUILD: GuildId = GuildId(1);
    const GENERAL: ChannelId = ChannelId(100);
    const ALLOWED: u64 = 10;
    const OTHER_HOLDER: u64 = 11;
    const OUTSIDER: u64 = 20;

    struct Harness {
        router: EventRouter,
        messenger: Arc<FakeMessenger>,
    }

    fn harness_with(messenger: FakeMessenger, directory: FakeDirectory) -> Harness {
        let messenger = Arc::new(messenger);
        let directory: Arc<dyn RoleDirectory> = Arc::new(directory);
        let notifier = Arc::new(Notifier::new(directory.clone(), messenger.clone(), DEFAULT_ROLE));
        let router = EventRouter::new(
            Arc::new(DeletionCache::default()),
            messenger.clone(),
            directory,
            notifier,
            Arc::new(ActivityMonitor::new(Duration::from_secs(300))),
            DEFAULT_COMMAND_PREFIX,
        );
        Harness { router, messenger }
    }

    fn harness() -> Harness {
        harness_with(
            FakeMessenger::default(),
            FakeDirectory::with_role(GUILD, DEFAULT_ROLE, &[ALLOWED, OTHER_HOLDER]),
        )
    }

    fn command(from: AuthorInfo, content: &str) -> CommandMessage {
        CommandMessage {
            message: MessageRef {
                channel_id: GENERAL,
                message_id: MessageId(555),
            },
            guild_id: Some(GUILD),
            channel_name: Some("general".to_string()),
            author: from,
            content: content.to_string(),
        }
    }

    fn hello_from_alice() -> DeletedMessage {
        let mut msg = deleted_message(GENERAL.0, "hello", "alice");
        msg.channel_name = Some("general".to_string());
        msg
    }

    #[tokio::test]
    async fn empty_channel_replies_not_found() {
        let h = harness();

        let report = h
            .router
            .on_command_message(command(author(ALLOWED, "mod"), ".snipe"))
            .await;

        assert_eq!(report.outcome, CommandOutcome::NotFound);
        assert!(report.follow_up.is_none());
        let replies = h.messenger.replies();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].1.title.as_deref(), Some("🔍 No Messages Found"));
    }

    #[tokio::test]
    async fn unauthorized_member_is_denied_and_history_is_kept() {
        let h = harness();
        assert!(h.router.on_message_deleted(hello_from_alice()).is_some());

        let report = h
            .router
            .on_command_message(command(author(OUTSIDER, "eve"), ".snipe"))
            .await;

        assert_eq!(report.outcome, CommandOutcome::Denied);
        assert!(report.follow_up.is_none());
        let replies = h.messenger.replies();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].1.color, crate::formatting::COLOR_DENIED);

        let kept = h.router.cache().peek_latest(GENERAL).expect("still cached");
        assert_eq!(kept.content, "hello");
        assert!(h.messenger.directs().is_empty());
    }

    #[tokio::test]
    async fn authorized_snipe_replies_and_emits_snipe_used() {
        let h = harness();
        h.router.on_message_deleted(hello_from_alice());

        let report = h
            .router
            .on_command_message(command(author(ALLOWED, "mod"), ".SNIPE please"))
            .await;

        let CommandOutcome::Sniped(record) = &report.outcome else {
            panic!("expected a snipe, got {:?}", report.outcome);
        };
        assert_eq!(record.content, "hello");
        assert_eq!(record.author.username, "alice");

        let replies = h.messenger.replies();
        assert_eq!(replies.len(), 1);
        let (to, embed) = &replies[0];
        assert_eq!(to.message_id, MessageId(555));
        assert!(embed.description.as_deref().unwrap_or("").contains("hello"));
        assert!(embed.fields[0].value.contains("alice"));

        let follow_up = report.follow_up.expect("snipe_used follow-up");
        assert_eq!(follow_up.event().kind(), "snipe_used");

        let delivered = follow_up.run().await;
        assert_eq!(delivered.delivered, 2);
        let directs = h.messenger.directs();
        assert!(directs
            .iter()
            .all(|(_, e)| e.title.as_deref() == Some("🎯 Snipe Command Used")));
    }

    #[tokio::test]
    async fn snipe_does_not_consume_history() {
        let h = harness();
        h.router.on_message_deleted(hello_from_alice());

        for _ in 0..3 {
            let report = h
                .router
                .on_command_message(command(author(ALLOWED, "mod"), ".snipe"))
                .await;
            assert!(matches!(report.outcome, CommandOutcome::Sniped(_)));
        }
        assert_eq!(h.router.cache().history(GENERAL).len(), 1);
    }

    #[tokio::test]
    async fn deletion_follow_up_notifies_role_holders() {
        let h = harness();

        let follow_up = h
            .router
            .on_message_deleted(hello_from_alice())
            .expect("captured");
        assert_eq!(follow_up.event().kind(), "message_deleted");
        // The reply path never ran; only the follow-up talks to the messenger.
        assert!(h.messenger.directs().is_empty());

        follow_up.run().await;
        let directs = h.messenger.directs();
        assert_eq!(directs.len(), 2);
        assert!(directs[0].1.fields[1].value.contains("#general"));
    }

    #[tokio::test]
    async fn filtered_deletions_produce_no_follow_up() {
        let h = harness();
        let mut from_bot = hello_from_alice();
        from_bot.author = Some(bot_author());

        assert!(h.router.on_message_deleted(from_bot).is_none());
        assert!(h
            .router
            .on_message_deleted(deleted_message(GENERAL.0, "", "alice"))
            .is_none());
        assert!(h.router.cache().peek_latest(GENERAL).is_none());
    }

    #[tokio::test]
    async fn non_commands_and_bots_are_ignored() {
        let h = harness();

        for msg in [
            command(author(ALLOWED, "mod"), "hello there"),
            command(author(ALLOWED, "mod"), "!snipe"),
            command(bot_author(), ".snipe"),
        ] {
            let report = h.router.on_command_message(msg).await;
            assert_eq!(report.outcome, CommandOutcome::Ignored);
        }
        assert!(h.messenger.replies().is_empty());
    }

    #[tokio::test]
    async fn direct_messages_are_unauthorized() {
        let h = harness();
        let mut msg = command(author(ALLOWED, "mod"), ".snipe");
        msg.guild_id = None;

        let report = h.router.on_command_message(msg).await;
        assert_eq!(report.outcome, CommandOutcome::Denied);
    }

    #[tokio::test]
    async fn role_lookup_failure_sends_generic_error() {
        let h = harness_with(FakeMessenger::default(), FakeDirectory::broken());

        let report = h
            .router
            .on_command_message(command(author(ALLOWED, "mod"), ".snipe"))
            .await;

        assert_eq!(report.outcome, CommandOutcome::Failed);
        let replies = h.messenger.replies();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].1.title.as_deref(), Some("❌ Error"));
    }

    #[tokio::test]
    async fn reply_failure_is_contained() {
        let h = harness_with(
            FakeMessenger::failing_replies(),
            FakeDirectory::with_role(GUILD, "EGO", &[ALLOWED]),
        );
        h.router.on_message_deleted(hello_from_alice());

        let report = h
            .router
            .on_command_message(command(author(ALLOWED, "mod"), ".snipe"))
            .await;

        assert_eq!(report.outcome, CommandOutcome::Failed);
        assert!(report.follow_up.is_none());
    }

    #[tokio::test]
    async fn reply_succeeds_even_when_every_notification_fails() {
        let h = harness();
        h.messenger.fail_directs_to(UserId(ALLOWED));
        h.messenger.fail_directs_to(UserId(OTHER_HOLDER));
        h.router.on_message_deleted(hello_from_alice());

        let report = h
            .router
            .on_command_message(command(author(ALLOWED, "mod"), ".snipe"))
            .await;
        assert!(matches!(report.outcome, CommandOutcome::Sniped(_)));
        assert_eq!(h.messenger.replies().len(), 1);

        let delivered = report.follow_up.expect("follow-up").run().await;
        assert_eq!(delivered.failed, 2);
        assert_eq!(delivered.delivered, 0);
    }
}
