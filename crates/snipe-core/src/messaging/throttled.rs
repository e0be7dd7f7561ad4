use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{MessageRef, UserId},
    messaging::{
        port::MessagingPort,
        types::{Embed, MessagingCapabilities},
    },
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* outbound API calls.
    pub global_min_interval: Duration,
    /// Minimum spacing between calls to the same target (channel or DM recipient).
    pub per_target_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(25), // ~40/sec, under Discord's 50/sec
            per_target_min_interval: Duration::from_millis(250),
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        self.reserve_at(Instant::now())
    }

    fn reserve_at(&mut self, now: Instant) -> Duration {
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// MessagingPort decorator that spaces outbound calls.
///
/// Notification fan-out sends one DM per role holder back to back; spacing
/// them keeps a large role from tripping Discord's global and DM limits.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_target: Mutex<HashMap<u64, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_target: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for(&self, target: u64) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_target.lock().await;
        prune_idle(&mut map, Instant::now());
        map.entry(target)
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_target_min_interval,
                )))
            })
            .clone()
    }

    #[cfg(test)]
    async fn tracked_targets(&self) -> usize {
        self.per_target.lock().await.len()
    }

    // Channel and user snowflakes never collide, so one map serves both.
    async fn throttle(&self, target: u64) {
        let global_wait = { self.global.lock().await.reserve() };
        let target_wait = {
            let lim = self.limiter_for(target).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(target_wait);
        if wait > Duration::ZERO {
            sleep(wait).await;
        }
    }
}

/// Drop limiters nobody holds whose last reservation has already elapsed;
/// a fresh limiter for that target would behave the same.
fn prune_idle(map: &mut HashMap<u64, Arc<Mutex<IntervalLimiter>>>, now: Instant) {
    map.retain(|_, lim| {
        if Arc::strong_count(lim) > 1 {
            return true;
        }
        match lim.try_lock() {
            Ok(guard) => guard.next > now,
            Err(_) => true,
        }
    });
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn reply_embed(&self, to: MessageRef, embed: &Embed) -> Result<MessageRef> {
        self.throttle(to.channel_id.0).await;
        self.inner.reply_embed(to, embed).await
    }

    async fn send_direct_embed(&self, user: UserId, embed: &Embed) -> Result<MessageRef> {
        self.throttle(user.0).await;
        self.inner.send_direct_embed(user, embed).await
    }
}
