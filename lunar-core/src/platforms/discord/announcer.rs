// ========================================================
// File: lunar-core/src/platforms/discord/announcer.rs
// ========================================================
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};
use twilight_cache_inmemory::InMemoryCache;
use twilight_http::Client as HttpClient;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;

use lunar_common::models::{AnnouncementPayload, BotIdentity, MessageHandle};

use crate::platforms::discord::embed::to_twilight_embed;
use crate::platforms::{AnnouncementSink, GuildActions};
use crate::Error;

/// What we learn about ourselves from READY.
#[derive(Debug, Default)]
pub struct BotSession {
    identity: RwLock<BotIdentity>,
    user_id: RwLock<Option<Id<UserMarker>>>,
}

impl BotSession {
    pub fn new(identity: BotIdentity) -> Self {
        Self {
            identity: RwLock::new(identity),
            user_id: RwLock::new(None),
        }
    }

    pub fn identity(&self) -> BotIdentity {
        self.identity.read().clone()
    }

    pub fn user_id(&self) -> Option<Id<UserMarker>> {
        *self.user_id.read()
    }

    pub fn record_ready(&self, user_id: Id<UserMarker>, identity: BotIdentity) {
        *self.user_id.write() = Some(user_id);
        *self.identity.write() = identity;
    }
}

/// Discord-backed announcement sink and guild actions. Cheap to clone.
#[derive(Clone)]
pub struct DiscordAnnouncer {
    http: Arc<HttpClient>,
    cache: Arc<InMemoryCache>,
    session: Arc<BotSession>,
}

impl DiscordAnnouncer {
    pub fn new(http: Arc<HttpClient>, cache: Arc<InMemoryCache>, session: Arc<BotSession>) -> Self {
        Self { http, cache, session }
    }
}

#[async_trait]
impl AnnouncementSink for DiscordAnnouncer {
    fn bot_identity(&self) -> BotIdentity {
        self.session.identity()
    }

    async fn resolve_channel(&self, channel_id: Id<ChannelMarker>) -> Option<Id<ChannelMarker>> {
        if self.cache.channel(channel_id).is_some() {
            return Some(channel_id);
        }
        match self.http.channel(channel_id).await {
            Ok(_) => Some(channel_id),
            Err(e) => {
                warn!("(DiscordAnnouncer) channel {channel_id} not reachable: {e}");
                None
            }
        }
    }

    async fn send_announcement(
        &self,
        channel_id: Id<ChannelMarker>,
        payload: &AnnouncementPayload,
    ) -> Result<MessageHandle, Error> {
        let embeds = [to_twilight_embed(&payload.embed)?];

        let mut request = self.http.create_message(channel_id).embeds(&embeds);
        if !payload.content.is_empty() {
            request = request.content(&payload.content);
        }

        let message = request
            .await
            .map_err(|e| Error::Discord(format!("Error sending announcement: {e:?}")))?
            .model()
            .await
            .map_err(|e| Error::Discord(format!("Error reading sent message: {e:?}")))?;

        debug!("(DiscordAnnouncer) posted message {} in {}", message.id, message.channel_id);
        Ok(MessageHandle {
            channel_id: message.channel_id,
            message_id: message.id,
        })
    }

    async fn edit_announcement(
        &self,
        handle: &MessageHandle,
        payload: &AnnouncementPayload,
    ) -> Result<(), Error> {
        let embeds = [to_twilight_embed(&payload.embed)?];
        let content = (!payload.content.is_empty()).then_some(payload.content.as_str());

        self.http
            .update_message(handle.channel_id, handle.message_id)
            .content(content)
            .embeds(Some(&embeds))
            .await
            .map_err(|e| Error::Discord(format!("Error editing announcement: {e:?}")))?;
        Ok(())
    }
}

#[async_trait]
impl GuildActions for DiscordAnnouncer {
    async fn add_role(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        role_id: Id<RoleMarker>,
    ) -> Result<(), Error> {
        self.http
            .add_guild_member_role(guild_id, user_id, role_id)
            .await
            .map_err(|e| Error::Discord(format!("Failed to add role: {e:?}")))?;
        Ok(())
    }

    async fn remove_role(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        role_id: Id<RoleMarker>,
    ) -> Result<(), Error> {
        self.http
            .remove_guild_member_role(guild_id, user_id, role_id)
            .await
            .map_err(|e| Error::Discord(format!("Failed to remove role: {e:?}")))?;
        Ok(())
    }

    async fn send_text(&self, channel_id: Id<ChannelMarker>, text: &str) -> Result<(), Error> {
        self.http
            .create_message(channel_id)
            .content(text)
            .await
            .map_err(|e| Error::Discord(format!("Error sending Discord message: {e:?}")))?;
        Ok(())
    }
}
