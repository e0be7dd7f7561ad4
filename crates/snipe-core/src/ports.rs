use async_trait::async_trait;

use crate::{
    domain::{GuildId, UserId},
    Result,
};

/// Role lookups by role *name* (the bot is configured with a name, not an id).
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Does `user` hold a role called `role_name` in `guild`?
    async fn member_has_role(&self, guild: GuildId, user: UserId, role_name: &str) -> Result<bool>;

    /// Members holding `role_name` in `guild`, or `None` when the guild has no
    /// such role.
    async fn members_with_role(&self, guild: GuildId, role_name: &str) -> Result<Option<Vec<UserId>>>;
}

/// Platform-side counters for the health surface.
pub trait PlatformStats: Send + Sync {
    fn guild_count(&self) -> usize;
    fn channel_count(&self) -> usize;
    fn user_count(&self) -> usize;
}
