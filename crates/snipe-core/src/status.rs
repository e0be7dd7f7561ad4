//! Liveness tracking and the health snapshot served over HTTP.

use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{cache::DeletionCache, ports::PlatformStats};

/// Records when the bot last saw activity (events, pings, keep-alive ticks).
#[derive(Debug)]
pub struct ActivityMonitor {
    started: Instant,
    last_activity: Mutex<DateTime<Utc>>,
    threshold: Duration,
}

impl ActivityMonitor {
    /// `threshold` is how long without activity before the bot counts as idle.
    pub fn new(threshold: Duration) -> Self {
        Self {
            started: Instant::now(),
            last_activity: Mutex::new(Utc::now()),
            threshold,
        }
    }

    pub fn touch(&self) {
        self.touch_at(Utc::now());
    }

    pub fn touch_at(&self, at: DateTime<Utc>) {
        let mut last = self.last_activity.lock().unwrap_or_else(|e| e.into_inner());
        if at > *last {
            *last = at;
        }
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_activity()).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.idle_for(now) < self.threshold
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self, cache: &DeletionCache, platform: &dyn PlatformStats) -> StatusSnapshot {
        let now = Utc::now();
        let last = self.last_activity();
        StatusSnapshot {
            status: "healthy",
            uptime: self.uptime().as_secs_f64(),
            guilds: platform.guild_count(),
            channels: platform.channel_count(),
            users: platform.user_count(),
            deleted_messages_count: cache.total_records(),
            keep_alive: KeepAlive {
                last_activity: last,
                time_since_last_activity: self.idle_for(now).as_millis() as u64,
                is_active: self.is_active(now),
            },
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub status: &'static str,
    /// Seconds since process start.
    pub uptime: f64,
    pub guilds: usize,
    pub channels: usize,
    pub users: usize,
    pub deleted_messages_count: usize,
    pub keep_alive: KeepAlive,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeepAlive {
    pub last_activity: DateTime<Utc>,
    /// Milliseconds.
    pub time_since_last_activity: u64,
    pub is_active: bool,
}
