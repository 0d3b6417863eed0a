// ========================================================
// File: lunar-core/src/platforms/discord/runtime.rs
// ========================================================
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::{
    self as gateway, CloseFrame, Config, Event, EventTypeFlags, Intents, MessageSender, Shard,
    StreamExt,
};
use twilight_http::client::ClientBuilder;
use twilight_http::Client as HttpClient;
use twilight_model::channel::message::EmojiReactionType;
use twilight_model::gateway::payload::incoming::Ready as ReadyPayload;
use twilight_model::gateway::payload::outgoing::UpdatePresence;
use twilight_model::gateway::presence::{ActivityType, MinimalActivity, Status};
use twilight_model::gateway::GatewayReaction;
use twilight_model::guild::Member;

use lunar_common::models::{BotConfig, BotIdentity};

use crate::platforms::discord::announcer::{BotSession, DiscordAnnouncer};
use crate::platforms::ConnectionStatus;
use crate::services::discord::{GuildEvent, GuildEventHandler, ReactionEvent};
use crate::Error;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const SHARD_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a shard runner shares with the rest of the process.
struct ShardContext {
    http: Arc<HttpClient>,
    cache: Arc<InMemoryCache>,
    session: Arc<BotSession>,
    handler: Arc<GuildEventHandler>,
    announcer: DiscordAnnouncer,
    username: String,
    activity: String,
    avatar_path: Option<String>,
}

async fn shard_runner(mut shard: Shard, ctx: Arc<ShardContext>) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
                continue;
            }
        };
        ctx.cache.update(&event);

        if let Event::Ready(ready) = &event {
            on_ready(&shard.sender(), ready, &ctx).await;
            continue;
        }

        match guild_event_from(&event, &ctx.cache) {
            Some(guild_event) => {
                let own_id = ctx.session.user_id();
                if let Err(e) = ctx.handler.handle(&ctx.announcer, guild_event, own_id).await {
                    warn!("Shard {shard_id} => guild event failed: {e}");
                }
            }
            None => trace!("Shard {shard_id} => unhandled event: {:?}", event.kind()),
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

async fn on_ready(sender: &MessageSender, ready: &ReadyPayload, ctx: &ShardContext) {
    let user = &ready.user;
    info!("READY as {} (ID={})", user.name, user.id);

    let avatar_url = user
        .avatar
        .map(|hash| format!("https://cdn.discordapp.com/avatars/{}/{hash}.png", user.id));

    let mut name = user.name.clone();
    if !ctx.username.is_empty() && ctx.username != user.name {
        match ctx.http.update_current_user().username(&ctx.username).await {
            Ok(_) => {
                info!("Username changed to {}", ctx.username);
                name = ctx.username.clone();
            }
            Err(e) => warn!("Could not change username to {}: {e}", ctx.username),
        }
    }
    ctx.session.record_ready(user.id, BotIdentity { name, avatar_url });

    if let Some(path) = &ctx.avatar_path {
        if let Err(e) = upload_avatar(&ctx.http, path).await {
            warn!("An error occurred when setting the avatar from {path}: {e}");
        }
    }

    let activity = MinimalActivity {
        kind: ActivityType::Playing,
        name: ctx.activity.clone(),
        url: None,
    };
    match UpdatePresence::new(vec![activity.into()], false, None::<u64>, Status::Online) {
        Ok(presence) => {
            if let Err(e) = sender.command(&presence) {
                warn!("Failed to set presence: {e}");
            }
        }
        Err(e) => warn!("Invalid presence '{}': {e}", ctx.activity),
    }
}

/// Discord takes avatars as a base64 data URI.
fn avatar_data_uri(path: &str, bytes: &[u8]) -> Result<String, Error> {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let mime = match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => return Err(Error::Config(format!("unsupported avatar image type: {path}"))),
    };
    Ok(format!("data:{mime};base64,{}", BASE64.encode(bytes)))
}

async fn upload_avatar(http: &HttpClient, path: &str) -> Result<(), Error> {
    let bytes = tokio::fs::read(path).await?;
    let data_uri = avatar_data_uri(path, &bytes)?;
    http.update_current_user()
        .avatar(Some(data_uri.as_str()))
        .await
        .map_err(|e| Error::Discord(format!("avatar upload failed: {e}")))?;
    info!("Avatar updated from {path}");
    Ok(())
}

fn emoji_key(emoji: &EmojiReactionType) -> String {
    match emoji {
        EmojiReactionType::Custom { id, .. } => id.to_string(),
        EmojiReactionType::Unicode { name } => name.clone(),
    }
}

/// Gateway only attaches `member` to reaction adds; removals fall back to the
/// user cache, which knows anyone seen in a member list or earlier event.
fn reacted_as_bot(member: Option<&Member>, cached_bot: impl FnOnce() -> Option<bool>) -> bool {
    member.map(|m| m.user.bot).or_else(cached_bot).unwrap_or(false)
}

fn reaction_event(reaction: &GatewayReaction, cache: &InMemoryCache) -> ReactionEvent {
    ReactionEvent {
        guild_id: reaction.guild_id,
        message_id: reaction.message_id,
        user_id: reaction.user_id,
        emoji: emoji_key(&reaction.emoji),
        is_bot: reacted_as_bot(reaction.member.as_ref(), || {
            cache.user(reaction.user_id).map(|u| u.bot)
        }),
    }
}

fn guild_event_from(event: &Event, cache: &InMemoryCache) -> Option<GuildEvent> {
    match event {
        Event::ReactionAdd(r) => Some(GuildEvent::ReactionAdded(reaction_event(&r.0, cache))),
        Event::ReactionRemove(r) => Some(GuildEvent::ReactionRemoved(reaction_event(&r.0, cache))),
        Event::MemberAdd(m) => Some(GuildEvent::MemberJoined {
            user_id: m.user.id,
            username: m.user.name.clone(),
        }),
        Event::MemberRemove(m) => Some(GuildEvent::MemberLeft {
            user_id: m.user.id,
            username: m.user.name.clone(),
        }),
        _ => None,
    }
}

/// Gateway connection plus the REST client and cache shared with announcers.
pub struct DiscordPlatform {
    token: String,
    username: String,
    activity: String,
    avatar_path: Option<String>,
    pub connection_status: ConnectionStatus,

    shard_tasks: Vec<JoinHandle<()>>,
    shard_senders: Vec<MessageSender>,

    pub http: Option<Arc<HttpClient>>,
    pub cache: Option<Arc<InMemoryCache>>,
    session: Arc<BotSession>,
    handler: Arc<GuildEventHandler>,
}

impl DiscordPlatform {
    pub fn new(config: &BotConfig) -> Self {
        Self {
            token: config.token.clone(),
            username: config.username.clone(),
            activity: config.activity.clone(),
            avatar_path: config.avatar_path.clone(),
            connection_status: ConnectionStatus::Disconnected,
            shard_tasks: Vec::new(),
            shard_senders: Vec::new(),
            http: None,
            cache: None,
            session: Arc::new(BotSession::new(BotIdentity {
                name: config.username.clone(),
                avatar_url: None,
            })),
            handler: Arc::new(GuildEventHandler::new(
                config.reaction_roles.clone(),
                config.welcome.clone(),
            )),
        }
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection_status.clone()
    }

    /// Sink for announcements and guild actions. Only valid after `connect`.
    pub fn announcer(&self) -> Result<DiscordAnnouncer, Error> {
        match (&self.http, &self.cache) {
            (Some(http), Some(cache)) => Ok(DiscordAnnouncer::new(
                http.clone(),
                cache.clone(),
                self.session.clone(),
            )),
            _ => Err(Error::Discord("Discord is not connected".into())),
        }
    }

    pub async fn connect(&mut self) -> Result<(), Error> {
        if matches!(self.connection_status, ConnectionStatus::Connected) {
            info!("(DiscordPlatform) Already connected => skipping");
            return Ok(());
        }
        if self.token.is_empty() {
            return Err(Error::Config("Discord token is empty".into()));
        }

        let http_client = Arc::new(
            ClientBuilder::new()
                .token(self.token.clone())
                .timeout(HTTP_TIMEOUT)
                .build(),
        );
        self.http = Some(http_client.clone());

        let cache = Arc::new(
            InMemoryCache::builder()
                .resource_types(
                    ResourceType::GUILD
                        | ResourceType::CHANNEL
                        | ResourceType::MEMBER
                        | ResourceType::USER,
                )
                .build(),
        );
        self.cache = Some(cache.clone());

        let config = Config::new(
            self.token.clone(),
            Intents::GUILDS
                | Intents::GUILD_MEMBERS
                | Intents::GUILD_MESSAGES
                | Intents::GUILD_MESSAGE_REACTIONS,
        );

        let shards = gateway::create_recommended(&http_client, config, |_, b| b.build())
            .await
            .map_err(|e| {
                self.connection_status = ConnectionStatus::Error(e.to_string());
                Error::Discord(format!("create_recommended error: {e}"))
            })?;

        let ctx = Arc::new(ShardContext {
            http: http_client.clone(),
            cache: cache.clone(),
            session: self.session.clone(),
            handler: self.handler.clone(),
            announcer: DiscordAnnouncer::new(http_client, cache, self.session.clone()),
            username: self.username.clone(),
            activity: self.activity.clone(),
            avatar_path: self.avatar_path.clone(),
        });

        for shard in shards {
            self.shard_senders.push(shard.sender());
            let ctx = ctx.clone();
            self.shard_tasks.push(tokio::spawn(shard_runner(shard, ctx)));
        }

        debug!("(DiscordPlatform) {} shard(s) running", self.shard_tasks.len());
        self.connection_status = ConnectionStatus::Connected;
        Ok(())
    }

    pub async fn disconnect(&mut self) {
        self.connection_status = ConnectionStatus::Disconnected;

        for sender in &self.shard_senders {
            let _ = sender.close(CloseFrame::NORMAL);
        }
        for task in self.shard_tasks.drain(..) {
            let abort = task.abort_handle();
            if tokio::time::timeout(SHARD_CLOSE_TIMEOUT, task).await.is_err() {
                warn!("(DiscordPlatform) Shard did not close in time, aborting");
                abort.abort();
            }
        }
        self.shard_senders.clear();
        info!("(DiscordPlatform) Disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twilight_model::id::Id;

    #[test]
    fn emoji_keys() {
        let unicode = EmojiReactionType::Unicode { name: "👍".into() };
        assert_eq!(emoji_key(&unicode), "👍");

        let custom = EmojiReactionType::Custom {
            animated: false,
            id: Id::new(4242),
            name: Some("lunar".into()),
        };
        assert_eq!(emoji_key(&custom), "4242");
    }

    #[test]
    fn avatar_becomes_data_uri() {
        let uri = avatar_data_uri("./avatar.PNG", b"abc").unwrap();
        assert_eq!(uri, "data:image/png;base64,YWJj");
        assert!(avatar_data_uri("avatar.jpeg", b"").unwrap().starts_with("data:image/jpeg;base64,"));
        assert!(matches!(avatar_data_uri("avatar.bmp", b"abc"), Err(Error::Config(_))));
    }

    #[test]
    fn bot_reactions_detected_without_member() {
        assert!(reacted_as_bot(None, || Some(true)));
        assert!(!reacted_as_bot(None, || Some(false)));
        assert!(!reacted_as_bot(None, || None));
    }

    #[test]
    fn announcer_requires_connection() {
        let platform = DiscordPlatform::new(&BotConfig::from_json("{}").unwrap());
        assert!(matches!(platform.announcer(), Err(Error::Discord(_))));
        assert_eq!(platform.connection_status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn connect_rejects_empty_token() {
        let mut platform = DiscordPlatform::new(&BotConfig::from_json("{}").unwrap());
        assert!(matches!(platform.connect().await, Err(Error::Config(_))));
    }
}
