use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use twilight_cache_inmemory::InMemoryCache;
use twilight_http::Client;
use twilight_model::id::{
    marker::{GuildMarker, RoleMarker},
    Id,
};

use snipe_core::{
    domain::{GuildId, UserId},
    ports::RoleDirectory,
    Result,
};

use crate::{guild_id, map_err, user_id};

/// Role lookups served from the gateway cache.
///
/// Member roles fall back to a REST fetch when the member is not cached
/// (large guilds only ship a subset of members at startup).
pub struct CacheRoleDirectory {
    cache: Arc<InMemoryCache>,
    http: Arc<Client>,
}

impl CacheRoleDirectory {
    pub fn new(cache: Arc<InMemoryCache>, http: Arc<Client>) -> Self {
        Self { cache, http }
    }

    fn role_by_name(&self, guild: Id<GuildMarker>, name: &str) -> Option<Id<RoleMarker>> {
        let roles = self.cache.guild_roles(guild)?;
        roles.iter().copied().find(|rid| {
            self.cache
                .role(*rid)
                .is_some_and(|role| role.resource().name == name)
        })
    }
}

#[async_trait]
impl RoleDirectory for CacheRoleDirectory {
    async fn member_has_role(&self, guild: GuildId, user: UserId, role_name: &str) -> Result<bool> {
        let gid = guild_id(guild)?;
        let uid = user_id(user)?;

        let Some(role) = self.role_by_name(gid, role_name) else {
            debug!(guild = guild.0, "guild has no {role_name} role");
            return Ok(false);
        };

        let cached = self
            .cache
            .member(gid, uid)
            .map(|m| m.roles().contains(&role));
        if let Some(has) = cached {
            return Ok(has);
        }

        let member = self
            .http
            .guild_member(gid, uid)
            .await
            .map_err(map_err)?
            .model()
            .await
            .map_err(map_err)?;
        Ok(member.roles.contains(&role))
    }

    async fn members_with_role(&self, guild: GuildId, role_name: &str) -> Result<Option<Vec<UserId>>> {
        let gid = guild_id(guild)?;
        let Some(role) = self.role_by_name(gid, role_name) else {
            return Ok(None);
        };

        let mut holders: Vec<UserId> = self
            .cache
            .guild_members(gid)
            .map(|members| {
                members
                    .iter()
                    .filter(|uid| {
                        self.cache
                            .member(gid, **uid)
                            .is_some_and(|m| m.roles().contains(&role))
                    })
                    .map(|uid| UserId(uid.get()))
                    .collect()
            })
            .unwrap_or_default();
        holders.sort_unstable_by_key(|u| u.0);

        Ok(Some(holders))
    }
}
