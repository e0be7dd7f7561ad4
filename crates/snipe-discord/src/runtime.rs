use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::{CloseFrame, Event, EventTypeFlags, Intents, Shard, ShardId, StreamExt as _};
use twilight_http::{client::ClientBuilder, Client};

use snipe_core::{
    cache::DeletionCache,
    config::Config,
    messaging::{port::MessagingPort, throttled::ThrottledMessenger},
    notify::{FollowUp, Notifier},
    ports::{PlatformStats, RoleDirectory},
    router::EventRouter,
    status::ActivityMonitor,
};

use crate::{
    directory::CacheRoleDirectory,
    handlers::{self, AuthorLedger},
    presence::{self, PresenceLoop, PresenceSettings},
    DiscordMessenger,
};

/// Guild/channel/user counts straight from the gateway cache.
pub struct DiscordStats {
    cache: Arc<InMemoryCache>,
}

impl PlatformStats for DiscordStats {
    fn guild_count(&self) -> usize {
        self.cache.stats().guilds()
    }

    fn channel_count(&self) -> usize {
        self.cache.stats().channels()
    }

    fn user_count(&self) -> usize {
        self.cache.stats().users()
    }
}

/// Gateway cache holding what deletion capture and the role directory read.
pub fn gateway_cache(message_cache_size: usize) -> InMemoryCache {
    InMemoryCache::builder()
        .resource_types(
            ResourceType::GUILD
                | ResourceType::CHANNEL
                | ResourceType::MESSAGE
                | ResourceType::MEMBER
                | ResourceType::ROLE
                | ResourceType::USER
                | ResourceType::USER_CURRENT,
        )
        .message_cache_size(message_cache_size)
        .build()
}

pub struct DiscordRuntime {
    cfg: Arc<Config>,
    shard: Shard,
    cache: Arc<InMemoryCache>,
    authors: AuthorLedger,
    messenger: DiscordMessenger,
    router: Arc<EventRouter>,
    deletions: Arc<DeletionCache>,
    monitor: Arc<ActivityMonitor>,
}

impl DiscordRuntime {
    pub fn new(cfg: Arc<Config>, deletions: Arc<DeletionCache>, monitor: Arc<ActivityMonitor>) -> Self {
        let http: Arc<Client> = Arc::new(
            ClientBuilder::new()
                .token(cfg.discord_token.clone())
                .timeout(Duration::from_secs(30))
                .build(),
        );

        let cache = Arc::new(gateway_cache(cfg.message_cache_size));
        let authors = AuthorLedger::new(cfg.message_cache_size);

        let intents = Intents::GUILDS
            | Intents::GUILD_MESSAGES
            | Intents::MESSAGE_CONTENT
            | Intents::GUILD_MEMBERS;
        let shard = Shard::new(ShardId::ONE, cfg.discord_token.clone(), intents);

        let messenger = DiscordMessenger::new(http.clone());
        // Notification fan-out sends one DM per role holder; space them out.
        let outbound: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
            Arc::new(messenger.clone()),
            cfg.throttle,
        ));
        let directory: Arc<dyn RoleDirectory> = Arc::new(CacheRoleDirectory::new(cache.clone(), http));
        let notifier = Arc::new(Notifier::new(
            directory.clone(),
            outbound.clone(),
            cfg.snipe_role.clone(),
        ));
        let router = Arc::new(EventRouter::new(
            deletions.clone(),
            outbound,
            directory,
            notifier,
            monitor.clone(),
            cfg.command_prefix.clone(),
        ));

        Self {
            cfg,
            shard,
            cache,
            authors,
            messenger,
            router,
            deletions,
            monitor,
        }
    }

    pub fn stats(&self) -> Arc<dyn PlatformStats> {
        Arc::new(DiscordStats {
            cache: self.cache.clone(),
        })
    }

    /// Drive the gateway until `cancel` fires (or the connection is lost for
    /// good).
    pub async fn run(mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        let sender = self.shard.sender();
        {
            let sender = sender.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                cancel.cancelled().await;
                if let Err(e) = sender.close(CloseFrame::NORMAL) {
                    warn!("failed to close gateway connection: {e}");
                }
            });
        }

        let mut presence_started = false;

        while let Some(item) = self.shard.next_event(EventTypeFlags::all()).await {
            let event = match item {
                Ok(event) => event,
                Err(e) => {
                    warn!("error receiving gateway event: {e}");
                    continue;
                }
            };

            if matches!(event, Event::GatewayClose(_)) && cancel.is_cancelled() {
                break;
            }

            // Recording happens inline to keep per-channel order equal to
            // gateway order.
            match handlers::apply_event(&self.cache, &mut self.authors, &event) {
                Some(msg) => {
                    if let Some(follow_up) = self.router.on_message_deleted(msg) {
                        spawn_follow_up(follow_up);
                    }
                }
                None => {
                    if let Event::MessageDelete(del) = &event {
                        debug!(message_id = del.id.get(), "deleted message was not cached");
                    }
                }
            }

            match event {
                Event::Ready(ready) => {
                    info!(
                        "logged in as {} (id={}), serving {} guilds",
                        ready.user.name,
                        ready.user.id,
                        ready.guilds.len()
                    );
                    self.messenger.set_footer_icon(Some(handlers::avatar_url(
                        ready.user.id.get(),
                        ready.user.avatar.as_ref(),
                    )));
                    self.monitor.touch();

                    if let Some(initial) = presence::watching(presence::DEFAULT_ACTIVITY) {
                        if let Err(e) = sender.command(&initial) {
                            warn!("failed to set initial presence: {e}");
                        }
                    }

                    if !presence_started {
                        presence_started = true;
                        let presence = PresenceLoop::new(
                            sender.clone(),
                            self.deletions.clone(),
                            self.monitor.clone(),
                            self.cache.clone(),
                            PresenceSettings {
                                role_name: self.cfg.snipe_role.clone(),
                                rotate_every: self.cfg.presence_interval,
                                keepalive_every: self.cfg.keepalive_interval,
                                inactivity_check_every: self.cfg.inactivity_check_interval,
                            },
                        );
                        tokio::spawn(presence.run(cancel.clone()));
                    }
                }
                Event::MessageCreate(msg) => {
                    if msg.author.bot || !self.router.is_command(&msg.content) {
                        continue;
                    }
                    let command = handlers::command_message(&self.cache, &msg);
                    let router = self.router.clone();
                    tokio::spawn(async move {
                        let report = router.on_command_message(command).await;
                        debug!(outcome = ?report.outcome, "snipe command handled");
                        if let Some(follow_up) = report.follow_up {
                            spawn_follow_up(follow_up);
                        }
                    });
                }
                _ => {}
            }
        }

        info!("gateway loop stopped");
        Ok(())
    }
}

fn spawn_follow_up(follow_up: FollowUp) {
    tokio::spawn(async move {
        let kind = follow_up.event().kind();
        let report = follow_up.run().await;
        debug!(kind, recipients = report.recipients, "follow-up finished");
    });
}
