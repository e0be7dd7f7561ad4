use async_trait::async_trait;

use crate::{
    domain::{MessageRef, UserId},
    messaging::types::{Embed, MessagingCapabilities},
    Result,
};

/// Outbound messaging port.
///
/// Discord is the only implementation; the shape stays platform-neutral so the
/// router and notifier can be exercised with in-memory fakes.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// Reply to `to` in its channel.
    async fn reply_embed(&self, to: MessageRef, embed: &Embed) -> Result<MessageRef>;

    /// Deliver privately to `user` (opens a DM channel if needed).
    async fn send_direct_embed(&self, user: UserId, embed: &Embed) -> Result<MessageRef>;
}
