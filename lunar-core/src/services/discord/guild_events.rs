// ========================================================
// File: lunar-core/src/services/discord/guild_events.rs
// ========================================================
use tracing::{debug, info, warn};
use twilight_model::id::marker::{GuildMarker, MessageMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;

use lunar_common::models::config::render_member_template;
use lunar_common::models::{ReactionRole, WelcomeConfig};

use crate::platforms::GuildActions;
use crate::Error;

/// Gateway events the bot shell reacts to, already stripped of twilight detail.
#[derive(Debug, Clone, PartialEq)]
pub enum GuildEvent {
    ReactionAdded(ReactionEvent),
    ReactionRemoved(ReactionEvent),
    MemberJoined { user_id: Id<UserMarker>, username: String },
    MemberLeft { user_id: Id<UserMarker>, username: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReactionEvent {
    pub guild_id: Option<Id<GuildMarker>>,
    pub message_id: Id<MessageMarker>,
    pub user_id: Id<UserMarker>,
    /// Custom emoji id, or the unicode emoji itself.
    pub emoji: String,
    pub is_bot: bool,
}

/// Reaction roles plus welcome/leave messages.
pub struct GuildEventHandler {
    reaction_roles: Vec<ReactionRole>,
    welcome: WelcomeConfig,
}

impl GuildEventHandler {
    pub fn new(reaction_roles: Vec<ReactionRole>, welcome: WelcomeConfig) -> Self {
        Self {
            reaction_roles,
            welcome,
        }
    }

    pub fn role_for(&self, message_id: Id<MessageMarker>, emoji: &str) -> Option<Id<RoleMarker>> {
        self.reaction_roles
            .iter()
            .find(|rr| rr.message_id == message_id && rr.emoji == emoji)
            .map(|rr| rr.role_id)
    }

    /// Returns `Ok(true)` if the event led to an action.
    pub async fn handle(
        &self,
        actions: &dyn GuildActions,
        event: GuildEvent,
        own_id: Option<Id<UserMarker>>,
    ) -> Result<bool, Error> {
        match event {
            GuildEvent::ReactionAdded(reaction) => {
                let Some((guild_id, role_id)) = self.reaction_target(&reaction, own_id) else {
                    return Ok(false);
                };
                info!("Granting role {role_id} to user {} (reaction {})", reaction.user_id, reaction.emoji);
                actions.add_role(guild_id, reaction.user_id, role_id).await?;
                Ok(true)
            }
            GuildEvent::ReactionRemoved(reaction) => {
                let Some((guild_id, role_id)) = self.reaction_target(&reaction, own_id) else {
                    return Ok(false);
                };
                info!("Revoking role {role_id} from user {} (reaction {})", reaction.user_id, reaction.emoji);
                actions.remove_role(guild_id, reaction.user_id, role_id).await?;
                Ok(true)
            }
            GuildEvent::MemberJoined { user_id, username } => {
                self.member_message(actions, &self.welcome.join_message, user_id, &username)
                    .await
            }
            GuildEvent::MemberLeft { user_id, username } => {
                self.member_message(actions, &self.welcome.leave_message, user_id, &username)
                    .await
            }
        }
    }

    fn reaction_target(
        &self,
        reaction: &ReactionEvent,
        own_id: Option<Id<UserMarker>>,
    ) -> Option<(Id<GuildMarker>, Id<RoleMarker>)> {
        if reaction.is_bot || Some(reaction.user_id) == own_id {
            return None;
        }
        let role_id = self.role_for(reaction.message_id, &reaction.emoji)?;
        match reaction.guild_id {
            Some(guild_id) => Some((guild_id, role_id)),
            None => {
                warn!("Reaction role matched outside a guild (message {}); ignoring", reaction.message_id);
                None
            }
        }
    }

    async fn member_message(
        &self,
        actions: &dyn GuildActions,
        template: &str,
        user_id: Id<UserMarker>,
        username: &str,
    ) -> Result<bool, Error> {
        if !self.welcome.enabled || template.trim().is_empty() {
            return Ok(false);
        }
        let Some(channel_id) = self.welcome.channel_id else {
            debug!("Welcome messages enabled without a channel; skipping");
            return Ok(false);
        };
        let text = render_member_template(template, &format!("<@{user_id}>"), username);
        actions.send_text(channel_id, &text).await?;
        Ok(true)
    }
}
