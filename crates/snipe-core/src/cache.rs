//! Bounded, per-channel history of deleted messages.
//!
//! The store is process-wide, memory-only state: it starts empty, is never
//! persisted and is lost on restart. Memory is bounded by
//! `capacity × channels seen`.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    domain::{ChannelId, MessageId, UserId},
    messaging::types::{Attachment, DeletedMessage},
};

/// Default number of records kept per channel.
pub const DEFAULT_CAPACITY: usize = 10;

pub const EMPTY_CONTENT_PLACEHOLDER: &str = "[No text content]";
pub const UNKNOWN_USER: &str = "Unknown User";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordAuthor {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Snapshot of a deleted message, taken once at capture time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletedMessageRecord {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub channel_name: Option<String>,
    pub content: String,
    pub author: RecordAuthor,
    pub deleted_at: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
}

impl DeletedMessageRecord {
    fn capture(msg: DeletedMessage, deleted_at: DateTime<Utc>) -> Self {
        let author = match msg.author {
            Some(a) => RecordAuthor {
                id: a.id,
                display_name: a.display_name.unwrap_or_else(|| a.username.clone()),
                username: a.username,
                avatar_url: a.avatar_url,
            },
            None => RecordAuthor {
                id: UserId(0),
                username: UNKNOWN_USER.to_string(),
                display_name: UNKNOWN_USER.to_string(),
                avatar_url: None,
            },
        };

        let content = if msg.content.is_empty() {
            EMPTY_CONTENT_PLACEHOLDER.to_string()
        } else {
            msg.content
        };

        Self {
            message_id: msg.message_id,
            channel_id: msg.channel_id,
            channel_name: msg.channel_name,
            content,
            author,
            deleted_at,
            attachments: msg.attachments,
        }
    }
}

/// Newest-first, fixed-capacity list of records for one channel.
#[derive(Debug)]
pub(crate) struct ChannelHistory {
    capacity: usize,
    entries: VecDeque<Arc<DeletedMessageRecord>>,
}

impl ChannelHistory {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity + 1),
        }
    }

    fn push_front(&mut self, record: Arc<DeletedMessageRecord>) {
        self.entries.push_front(record);
        self.entries.truncate(self.capacity);
    }

    fn latest(&self) -> Option<Arc<DeletedMessageRecord>> {
        self.entries.front().cloned()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Owner of every channel's history.
///
/// All mutation happens inside one synchronous critical section (no await
/// point while the lock is held), so a record and a peek on the same channel
/// never interleave. Insertion order is the canonical order; `deleted_at` is
/// informational.
#[derive(Debug)]
pub struct DeletionCache {
    capacity: usize,
    channels: Mutex<HashMap<ChannelId, ChannelHistory>>,
}

impl Default for DeletionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl DeletionCache {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // A poisoned lock only means another thread panicked mid-read; the map
    // itself is always left consistent.
    fn channels(&self) -> MutexGuard<'_, HashMap<ChannelId, ChannelHistory>> {
        self.channels.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Capture a deleted message, stamped with the current time.
    ///
    /// Returns `None` (and changes nothing) for automated, system or empty
    /// messages.
    pub fn record(&self, msg: DeletedMessage) -> Option<Arc<DeletedMessageRecord>> {
        self.record_at(msg, Utc::now())
    }

    pub fn record_at(
        &self,
        msg: DeletedMessage,
        deleted_at: DateTime<Utc>,
    ) -> Option<Arc<DeletedMessageRecord>> {
        if msg.is_automated() {
            debug!(message_id = msg.message_id.0, "skipping automated/system message");
            return None;
        }
        if msg.is_empty() {
            debug!(message_id = msg.message_id.0, "skipping message without content");
            return None;
        }

        let channel_id = msg.channel_id;
        let record = Arc::new(DeletedMessageRecord::capture(msg, deleted_at));

        self.channels()
            .entry(channel_id)
            .or_insert_with(|| ChannelHistory::new(self.capacity))
            .push_front(record.clone());

        Some(record)
    }

    /// Most recent record for the channel, without consuming it.
    pub fn peek_latest(&self, channel_id: ChannelId) -> Option<Arc<DeletedMessageRecord>> {
        self.channels().get(&channel_id).and_then(|h| h.latest())
    }

    /// Full history for the channel, newest first.
    pub fn history(&self, channel_id: ChannelId) -> Vec<Arc<DeletedMessageRecord>> {
        self.channels()
            .get(&channel_id)
            .map(|h| h.entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Sum of all channel history lengths.
    pub fn total_records(&self) -> usize {
        self.channels().values().map(ChannelHistory::len).sum()
    }

    pub fn channel_count(&self) -> usize {
        self.channels().len()
    }
}
