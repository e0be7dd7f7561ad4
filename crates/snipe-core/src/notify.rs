//! Audit notices to role holders.
//!
//! Delivery is best-effort: every recipient is attempted, each failure is
//! logged on its own, and nothing is reported back to the triggering event.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    cache::DeletedMessageRecord,
    domain::GuildId,
    formatting::{deleted_notice_embed, snipe_notice_embed},
    messaging::{
        port::MessagingPort,
        types::{AuthorInfo, ChannelInfo, Embed},
    },
    ports::RoleDirectory,
};

#[derive(Clone, Debug)]
pub enum NotificationEvent {
    MessageDeleted {
        record: Arc<DeletedMessageRecord>,
    },
    SnipeUsed {
        invoker: AuthorInfo,
        channel: ChannelInfo,
        record: Arc<DeletedMessageRecord>,
        /// Command text as configured (for the notice description).
        command: String,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MessageDeleted { .. } => "message_deleted",
            Self::SnipeUsed { .. } => "snipe_used",
        }
    }

    pub fn record(&self) -> &Arc<DeletedMessageRecord> {
        match self {
            Self::MessageDeleted { record } | Self::SnipeUsed { record, .. } => record,
        }
    }

    fn to_embed(&self, footer: &str) -> Embed {
        match self {
            Self::MessageDeleted { record } => deleted_notice_embed(record, footer),
            Self::SnipeUsed {
                invoker,
                channel,
                record,
                command,
            } => snipe_notice_embed(invoker, channel, record, command, footer),
        }
    }
}

/// Outcome of one fan-out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub recipients: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Role that may snipe and receives audit notices, unless configured otherwise.
pub const DEFAULT_ROLE: &str = "EGO";

pub struct Notifier {
    directory: Arc<dyn RoleDirectory>,
    messenger: Arc<dyn MessagingPort>,
    role_name: String,
    footer: String,
}

impl Notifier {
    pub fn new(
        directory: Arc<dyn RoleDirectory>,
        messenger: Arc<dyn MessagingPort>,
        role_name: impl Into<String>,
    ) -> Self {
        let role_name = role_name.into();
        Self {
            directory,
            messenger,
            footer: format!("{role_name} Log System"),
            role_name,
        }
    }

    pub fn role_name(&self) -> &str {
        &self.role_name
    }

    /// Privately deliver `event` to every holder of the role in `guild`.
    pub async fn notify(&self, guild: Option<GuildId>, event: &NotificationEvent) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        let Some(guild) = guild else {
            debug!(kind = event.kind(), "no guild context; skipping notification");
            return report;
        };
        let caps = self.messenger.capabilities();
        if !caps.supports_direct_messages {
            return report;
        }

        let members = match self.directory.members_with_role(guild, &self.role_name).await {
            Ok(Some(members)) => members,
            Ok(None) => {
                debug!(guild = guild.0, role = %self.role_name, "role not found; skipping notification");
                return report;
            }
            Err(e) => {
                warn!(guild = guild.0, "failed to resolve {} members: {e}", self.role_name);
                return report;
            }
        };

        let embed = event.to_embed(&self.footer).fit(&caps);

        report.recipients = members.len();
        for member in members {
            match self.messenger.send_direct_embed(member, &embed).await {
                Ok(_) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        user = member.0,
                        kind = event.kind(),
                        "failed to DM {} member: {e}",
                        self.role_name
                    );
                }
            }
        }

        info!(
            kind = event.kind(),
            delivered = report.delivered,
            failed = report.failed,
            "notified {} members",
            self.role_name
        );
        report
    }
}

/// A best-effort side effect produced by the router after its primary action.
///
/// The router never awaits it; the runtime spawns [`FollowUp::run`] so reply
/// latency and reply success are independent of notification delivery.
pub struct FollowUp {
    notifier: Arc<Notifier>,
    guild: Option<GuildId>,
    event: NotificationEvent,
}

impl FollowUp {
    pub fn new(notifier: Arc<Notifier>, guild: Option<GuildId>, event: NotificationEvent) -> Self {
        Self {
            notifier,
            guild,
            event,
        }
    }

    pub fn event(&self) -> &NotificationEvent {
        &self.event
    }

    pub async fn run(self) -> DeliveryReport {
        self.notifier.notify(self.guild, &self.event).await
    }
}
