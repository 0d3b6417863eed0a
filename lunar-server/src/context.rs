// ========================================================
// File: lunar-server/src/context.rs
// ========================================================
//! Everything the running bot owns: the Discord connection, one poller task per
//! watched platform, and the token that stops them.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use twilight_model::id::marker::ChannelMarker;
use twilight_model::id::Id;

use lunar_common::models::BotConfig;
use lunar_core::platforms::discord::{DiscordAnnouncer, DiscordPlatform};
use lunar_core::platforms::twitch::{helix_client, TwitchStreamSource};
use lunar_core::platforms::youtube::{data_api_client, YouTubeStreamSource};
use lunar_core::platforms::StreamSource;
use lunar_core::services::{PollerSettings, StreamPoller};
use lunar_core::tasks::spawn_stream_poll_task;
use lunar_core::Error;

pub struct ServerContext {
    pub discord: DiscordPlatform,
    pub announcer: Arc<DiscordAnnouncer>,
    pub shutdown: CancellationToken,
    poll_tasks: Vec<JoinHandle<()>>,
}

impl ServerContext {
    pub async fn new(config: &BotConfig) -> Result<Self, Error> {
        let mut discord = DiscordPlatform::new(config);
        discord.connect().await?;
        let announcer = Arc::new(discord.announcer()?);

        Ok(Self {
            discord,
            announcer,
            shutdown: CancellationToken::new(),
            poll_tasks: Vec::new(),
        })
    }

    pub fn start_stream_pollers(&mut self, config: &BotConfig) -> Result<(), Error> {
        let timeout = config.request_timeout();

        if config.twitch.enabled {
            let t = &config.twitch;
            let client = helix_client(&t.client_id, t.oauth_token.as_deref(), timeout)?;
            let source = TwitchStreamSource::new(Arc::new(client), t.username.clone());
            self.spawn_poller(
                Arc::new(source),
                t.announcement_message.clone(),
                t.announcement_channel_id,
                t.update_interval(),
                t.poll_interval(),
            )?;
        }

        if config.youtube.enabled {
            let y = &config.youtube;
            let client = data_api_client(&y.api_key, timeout)?;
            let source = YouTubeStreamSource::new(Arc::new(client), y.channel_id.clone());
            self.spawn_poller(
                Arc::new(source),
                y.announcement_message.clone(),
                y.announcement_channel_id,
                y.update_interval(),
                y.poll_interval(),
            )?;
        }

        if self.poll_tasks.is_empty() {
            warn!("No stream platform is enabled; only guild features are active");
        }
        Ok(())
    }

    fn spawn_poller(
        &mut self,
        source: Arc<dyn StreamSource>,
        caption: String,
        channel: Option<Id<ChannelMarker>>,
        update_interval: std::time::Duration,
        poll_interval: std::time::Duration,
    ) -> Result<(), Error> {
        let platform = source.platform();
        let announcement_channel = channel
            .ok_or_else(|| Error::Config(format!("{platform} announcement channel is not set")))?;

        let settings = PollerSettings {
            caption,
            announcement_channel,
            update_interval,
        };
        let poller = StreamPoller::new(
            source,
            self.announcer.clone(),
            settings,
            self.shutdown.child_token(),
        );
        self.poll_tasks.push(spawn_stream_poll_task(
            poller,
            poll_interval,
            self.shutdown.child_token(),
        ));
        info!("(ServerContext) {platform} announcements go to channel {announcement_channel}");
        Ok(())
    }

    /// Stops pollers (and their refresh timers) before closing the gateway.
    pub async fn shutdown(&mut self) {
        self.shutdown.cancel();
        for task in self.poll_tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("(ServerContext) poll task ended abnormally: {e}");
            }
        }
        self.discord.disconnect().await;
    }
}
