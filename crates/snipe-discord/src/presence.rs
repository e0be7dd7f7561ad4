//! "Watching ..." activity rotation and keep-alive presence updates.
//!
//! Each update is real gateway traffic and counts as activity for the
//! health endpoint.

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use twilight_cache_inmemory::InMemoryCache;
use twilight_gateway::MessageSender;
use twilight_model::gateway::{
    payload::outgoing::UpdatePresence,
    presence::{ActivityType, MinimalActivity, Status},
};

use snipe_core::{cache::DeletionCache, status::ActivityMonitor};

pub const DEFAULT_ACTIVITY: &str = "deleted messages 👀";

/// Rotation entries, in display order.
pub fn activity_labels(sniped: usize, servers: usize, role: &str) -> [String; 4] {
    [
        DEFAULT_ACTIVITY.to_string(),
        format!("{sniped} sniped messages"),
        format!("{servers} servers"),
        format!("{role} role commands"),
    ]
}

pub fn watching(name: impl Into<String>) -> Option<UpdatePresence> {
    let activity = MinimalActivity {
        kind: ActivityType::Watching,
        name: name.into(),
        url: None,
    };
    match UpdatePresence::new(vec![activity.into()], false, None::<u64>, Status::Online) {
        Ok(presence) => Some(presence),
        Err(e) => {
            warn!("invalid presence payload: {e}");
            None
        }
    }
}

pub struct PresenceSettings {
    pub role_name: String,
    pub rotate_every: Duration,
    pub keepalive_every: Duration,
    pub inactivity_check_every: Duration,
}

pub struct PresenceLoop {
    sender: MessageSender,
    deletions: Arc<DeletionCache>,
    monitor: Arc<ActivityMonitor>,
    discord: Arc<InMemoryCache>,
    settings: PresenceSettings,
}

impl PresenceLoop {
    pub fn new(
        sender: MessageSender,
        deletions: Arc<DeletionCache>,
        monitor: Arc<ActivityMonitor>,
        discord: Arc<InMemoryCache>,
        settings: PresenceSettings,
    ) -> Self {
        Self {
            sender,
            deletions,
            monitor,
            discord,
            settings,
        }
    }

    fn send(&self, name: &str) {
        let Some(presence) = watching(name) else {
            return;
        };
        match self.sender.command(&presence) {
            Ok(()) => self.monitor.touch(),
            Err(e) => warn!("failed to update presence: {e}"),
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut rotate = tokio::time::interval(self.settings.rotate_every);
        let mut keepalive = tokio::time::interval(self.settings.keepalive_every);
        let mut inactivity = tokio::time::interval(self.settings.inactivity_check_every);
        // The first tick of an interval fires immediately; READY already set the
        // initial activity.
        rotate.tick().await;
        keepalive.tick().await;
        inactivity.tick().await;

        let mut next = 0usize;
        info!("presence rotation started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = rotate.tick() => {
                    let labels = activity_labels(
                        self.deletions.total_records(),
                        self.discord.stats().guilds(),
                        &self.settings.role_name,
                    );
                    let label = &labels[next % labels.len()];
                    next = next.wrapping_add(1);
                    debug!("rotating activity to {label:?}");
                    self.send(label);
                }
                _ = keepalive.tick() => {
                    debug!("keep-alive presence");
                    self.send(DEFAULT_ACTIVITY);
                }
                _ = inactivity.tick() => {
                    if !self.monitor.is_active(chrono::Utc::now()) {
                        info!("no activity recently; sending keep-alive presence");
                        self.send(DEFAULT_ACTIVITY);
                    }
                }
            }
        }
        debug!("presence loop stopped");
    }
}
