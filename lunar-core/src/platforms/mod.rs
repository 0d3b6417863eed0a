// ========================================================
// File: lunar-core/src/platforms/mod.rs
// ========================================================
use async_trait::async_trait;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;

use lunar_common::models::{
    AnnouncementPayload, BotIdentity, CategoryInfo, Liveness, MessageHandle, ProfileInfo,
    StreamPlatform, StreamSnapshot,
};

use crate::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Error(String),
}

/// A streaming platform we can ask "is this channel live?".
///
/// Implementations swallow and log their own failures: a liveness poll that
/// could not be answered is `Liveness::Unavailable`, an auxiliary fetch that
/// could not be answered is `None`.
#[async_trait]
pub trait StreamSource: Send + Sync {
    fn platform(&self) -> StreamPlatform;

    async fn check_live(&self) -> Liveness;

    async fn fetch_profile(&self, snapshot: &StreamSnapshot) -> Option<ProfileInfo>;

    async fn fetch_category(&self, snapshot: &StreamSnapshot) -> Option<CategoryInfo>;
}

/// The slice of the chat platform client the stream poller needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnnouncementSink: Send + Sync {
    /// Name and avatar shown in announcement footers.
    fn bot_identity(&self) -> BotIdentity;

    async fn resolve_channel(&self, channel_id: Id<ChannelMarker>) -> Option<Id<ChannelMarker>>;

    async fn send_announcement(
        &self,
        channel_id: Id<ChannelMarker>,
        payload: &AnnouncementPayload,
    ) -> Result<MessageHandle, Error>;

    async fn edit_announcement(
        &self,
        handle: &MessageHandle,
        payload: &AnnouncementPayload,
    ) -> Result<(), Error>;
}

/// Guild-side actions used by reaction roles and welcome/leave messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GuildActions: Send + Sync {
    async fn add_role(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        role_id: Id<RoleMarker>,
    ) -> Result<(), Error>;

    async fn remove_role(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        role_id: Id<RoleMarker>,
    ) -> Result<(), Error>;

    async fn send_text(&self, channel_id: Id<ChannelMarker>, text: &str) -> Result<(), Error>;
}

pub mod discord;
pub mod twitch;
pub mod youtube;
