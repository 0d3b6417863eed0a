// ========================================================
// File: lunar-core/src/services/stream_poller.rs
// ========================================================
//! Live-stream announcement state machine, one instance per watched channel.
//!
//! ```text
//!            liveness: Live + profile + category + channel + send ok
//!   OFFLINE ---------------------------------------------------------> LIVE
//!      ^                                                              |  ^ |
//!      |                 liveness: Offline (cancel refresh timer)     |  | | liveness: Live
//!      +--------------------------------------------------------------+  +-+ (no-op)
//! ```
//!
//! `Liveness::Unavailable` never moves the machine. While LIVE, a separate
//! refresh timer edits the posted announcement in place.
//!
//! Each tick kind has its own in-flight gate taken with `try_lock`: a liveness
//! tick that fires while the previous liveness tick is still awaiting the
//! network is skipped, and likewise for refreshes. Across kinds, ticks queue on
//! `PollState`'s mutex, so a refresh that collides with a liveness check runs
//! right after it instead of being dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use twilight_model::id::marker::ChannelMarker;
use twilight_model::id::Id;

use lunar_common::models::{AnnouncementPayload, Liveness, MessageHandle, StreamPlatform, StreamSnapshot};

use crate::platforms::{AnnouncementSink, StreamSource};
use crate::services::announcement::{build_announcement, refresh_announcement};

#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// Text posted above the embed, e.g. "@everyone we're live!".
    pub caption: String,
    pub announcement_channel: Id<ChannelMarker>,
    pub update_interval: Duration,
}

/// The message we posted for the current broadcast.
#[derive(Debug, Clone)]
pub struct ActiveAnnouncement {
    pub handle: MessageHandle,
    pub payload: AnnouncementPayload,
}

/// Handle to the running refresh task. Cancelling is idempotent, and dropping
/// the handle cancels too.
pub struct UpdateTimer {
    token: CancellationToken,
}

impl UpdateTimer {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for UpdateTimer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[derive(Default)]
pub struct PollState {
    pub is_live: bool,
    pub active: Option<ActiveAnnouncement>,
    pub update_timer: Option<UpdateTimer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    MissingProfile,
    MissingCategory,
    ChannelUnresolved,
    SendFailed,
}

/// What one liveness tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Another tick for this target was still running.
    Busy,
    /// The poll could not be answered; state untouched.
    NoData,
    StayedOffline,
    WentLive(MessageHandle),
    StillLive,
    WentOffline,
    /// Went live on the platform but we could not announce; still OFFLINE.
    Aborted(AbortReason),
}

/// What one refresh tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Busy,
    NotLive,
    NoData,
    Edited,
    EditFailed,
}

#[derive(Clone)]
pub struct StreamPoller {
    source: Arc<dyn StreamSource>,
    sink: Arc<dyn AnnouncementSink>,
    settings: Arc<PollerSettings>,
    state: Arc<Mutex<PollState>>,
    poll_gate: Arc<Mutex<()>>,
    refresh_gate: Arc<Mutex<()>>,
    shutdown: CancellationToken,
}

impl StreamPoller {
    pub fn new(
        source: Arc<dyn StreamSource>,
        sink: Arc<dyn AnnouncementSink>,
        settings: PollerSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            source,
            sink,
            settings: Arc::new(settings),
            state: Arc::new(Mutex::new(PollState::default())),
            poll_gate: Arc::new(Mutex::new(())),
            refresh_gate: Arc::new(Mutex::new(())),
            shutdown,
        }
    }

    pub fn platform(&self) -> StreamPlatform {
        self.source.platform()
    }

    pub async fn is_live(&self) -> bool {
        self.state.lock().await.is_live
    }

    pub async fn active_handle(&self) -> Option<MessageHandle> {
        self.state.lock().await.active.as_ref().map(|a| a.handle)
    }

    pub async fn has_update_timer(&self) -> bool {
        self.state
            .lock()
            .await
            .update_timer
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }

    /// One liveness check.
    pub async fn poll_tick(&self) -> PollOutcome {
        let platform = self.platform();
        let Ok(_in_flight) = self.poll_gate.try_lock() else {
            debug!("(StreamPoller:{platform}) previous liveness tick still running; skipping");
            return PollOutcome::Busy;
        };
        let mut state = self.state.lock().await;

        match (self.source.check_live().await, state.is_live) {
            (Liveness::Unavailable, _) => {
                debug!("(StreamPoller:{platform}) no data this tick; state unchanged");
                PollOutcome::NoData
            }
            (Liveness::Offline, false) => PollOutcome::StayedOffline,
            (Liveness::Offline, true) => {
                self.go_offline(&mut state);
                PollOutcome::WentOffline
            }
            (Liveness::Live(_), true) => {
                debug!("(StreamPoller:{platform}) still live; announcement already posted");
                PollOutcome::StillLive
            }
            (Liveness::Live(snapshot), false) => self.go_live(&mut state, snapshot).await,
        }
    }

    async fn go_live(&self, state: &mut PollState, snapshot: StreamSnapshot) -> PollOutcome {
        let platform = self.platform();

        let (profile, category) = tokio::join!(
            self.source.fetch_profile(&snapshot),
            self.source.fetch_category(&snapshot)
        );
        let Some(profile) = profile else {
            info!("(StreamPoller:{platform}) {} went live but profile data is missing; retrying next tick", snapshot.streamer_name);
            return PollOutcome::Aborted(AbortReason::MissingProfile);
        };
        let Some(category) = category else {
            info!("(StreamPoller:{platform}) {} went live but category data is missing; retrying next tick", snapshot.streamer_name);
            return PollOutcome::Aborted(AbortReason::MissingCategory);
        };

        let Some(channel_id) = self.sink.resolve_channel(self.settings.announcement_channel).await else {
            error!(
                "(StreamPoller:{platform}) Couldn't send livestream announcement because channel {} couldn't be found.",
                self.settings.announcement_channel
            );
            return PollOutcome::Aborted(AbortReason::ChannelUnresolved);
        };

        let payload = build_announcement(
            platform,
            &self.settings.caption,
            &snapshot,
            &profile,
            &category,
            &self.sink.bot_identity(),
        );

        let handle = match self.sink.send_announcement(channel_id, &payload).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("(StreamPoller:{platform}) failed to send announcement: {e}");
                return PollOutcome::Aborted(AbortReason::SendFailed);
            }
        };

        if let Some(stale) = state.update_timer.take() {
            stale.cancel();
        }
        state.active = Some(ActiveAnnouncement { handle, payload });
        state.is_live = true;
        state.update_timer = Some(self.start_update_timer());

        info!(
            "(StreamPoller:{platform}) OFFLINE -> LIVE: announced '{}' as message {}",
            snapshot.title, handle.message_id
        );
        PollOutcome::WentLive(handle)
    }

    fn go_offline(&self, state: &mut PollState) {
        if let Some(timer) = state.update_timer.take() {
            timer.cancel();
        }
        state.active = None;
        state.is_live = false;
        info!("(StreamPoller:{}) LIVE -> OFFLINE", self.platform());
    }

    fn start_update_timer(&self) -> UpdateTimer {
        let token = self.shutdown.child_token();
        let cancelled = token.clone();
        let poller = self.clone();
        let period = self.settings.update_interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        poller.refresh_tick().await;
                    }
                }
            }
            debug!("(StreamPoller:{}) refresh timer stopped", poller.platform());
        });

        UpdateTimer { token }
    }

    /// Re-fetches stream stats and edits the live announcement in place.
    pub async fn refresh_tick(&self) -> RefreshOutcome {
        let platform = self.platform();
        let Ok(_in_flight) = self.refresh_gate.try_lock() else {
            debug!("(StreamPoller:{platform}) previous refresh still running; skipping");
            return RefreshOutcome::Busy;
        };
        let mut state = self.state.lock().await;

        let (handle, previous) = match (state.is_live, state.active.as_ref()) {
            (true, Some(active)) => (active.handle, active.payload.clone()),
            _ => return RefreshOutcome::NotLive,
        };

        let snapshot = match self.source.check_live().await {
            Liveness::Live(snapshot) => snapshot,
            other => {
                debug!("(StreamPoller:{platform}) refresh got {other:?}; leaving announcement unchanged");
                return RefreshOutcome::NoData;
            }
        };
        let Some(category) = self.source.fetch_category(&snapshot).await else {
            debug!("(StreamPoller:{platform}) refresh missing category; leaving announcement unchanged");
            return RefreshOutcome::NoData;
        };

        let payload = refresh_announcement(&previous, &snapshot, &category);
        match self.sink.edit_announcement(&handle, &payload).await {
            Ok(()) => {
                if let Some(active) = state.active.as_mut() {
                    active.payload = payload;
                }
                debug!("(StreamPoller:{platform}) refreshed announcement {}", handle.message_id);
                RefreshOutcome::Edited
            }
            Err(e) => {
                warn!("(StreamPoller:{platform}) failed to edit announcement: {e}");
                RefreshOutcome::EditFailed
            }
        }
    }

    /// Stops the refresh timer. Live/offline state is left as-is.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if let Some(timer) = state.update_timer.take() {
            timer.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::MockAnnouncementSink;
    use crate::test_utils::{sample_category, sample_profile, sample_snapshot, RecordingSink, ScriptedSource};
    use lunar_common::models::BotIdentity;

    const CHANNEL: u64 = 555;

    fn settings() -> PollerSettings {
        PollerSettings {
            caption: "@everyone we're live!".into(),
            announcement_channel: Id::new(CHANNEL),
            update_interval: Duration::from_secs(180),
        }
    }

    fn poller(source: Arc<ScriptedSource>, sink: Arc<dyn AnnouncementSink>) -> StreamPoller {
        StreamPoller::new(source, sink, settings(), CancellationToken::new())
    }

    fn live() -> Liveness {
        Liveness::Live(sample_snapshot())
    }

    #[tokio::test]
    async fn test_data_data_empty_data_scenario() {
        let source = Arc::new(ScriptedSource::with_aux());
        for l in [live(), live(), Liveness::Offline, live()] {
            source.push_liveness(l);
        }
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(source, sink.clone());

        let PollOutcome::WentLive(first) = poller.poll_tick().await else {
            panic!("expected OFFLINE -> LIVE");
        };
        assert!(poller.has_update_timer().await);

        assert_eq!(poller.poll_tick().await, PollOutcome::StillLive);
        assert_eq!(sink.sent_count(), 1);

        assert_eq!(poller.poll_tick().await, PollOutcome::WentOffline);
        assert!(!poller.is_live().await);
        assert!(!poller.has_update_timer().await);
        assert!(poller.active_handle().await.is_none());
        assert_eq!(sink.sent_count(), 1, "no offline message is sent");

        let PollOutcome::WentLive(second) = poller.poll_tick().await else {
            panic!("expected second OFFLINE -> LIVE");
        };
        assert_ne!(first, second);
        assert_eq!(sink.sent_count(), 2);
        assert_eq!(sink.sent()[0].0, Id::new(CHANNEL));
    }

    #[tokio::test]
    async fn test_missing_profile_then_success_sends_once() {
        let source = Arc::new(ScriptedSource::with_aux());
        source.push_liveness(live());
        source.push_liveness(live());
        source.push_profile(None);
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(source, sink.clone());

        assert_eq!(poller.poll_tick().await, PollOutcome::Aborted(AbortReason::MissingProfile));
        assert!(!poller.is_live().await);
        assert_eq!(sink.sent_count(), 0);

        assert!(matches!(poller.poll_tick().await, PollOutcome::WentLive(_)));
        assert_eq!(sink.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_category_never_touches_sink() {
        let source = Arc::new(ScriptedSource::new());
        source.push_liveness(live());
        source.push_profile(Some(sample_profile()));
        source.push_category(None);

        let mut sink = MockAnnouncementSink::new();
        sink.expect_resolve_channel().never();
        sink.expect_send_announcement().never();
        let poller = poller(source, Arc::new(sink));

        assert_eq!(poller.poll_tick().await, PollOutcome::Aborted(AbortReason::MissingCategory));
        assert!(!poller.is_live().await);
    }

    #[tokio::test]
    async fn test_unresolved_channel_keeps_offline_and_retries() {
        let source = Arc::new(ScriptedSource::with_aux());
        source.push_liveness(live());
        source.push_liveness(live());

        let mut sink = MockAnnouncementSink::new();
        sink.expect_resolve_channel().times(2).returning(|_| None);
        sink.expect_send_announcement().never();
        let poller = poller(source, Arc::new(sink));

        for _ in 0..2 {
            assert_eq!(
                poller.poll_tick().await,
                PollOutcome::Aborted(AbortReason::ChannelUnresolved)
            );
            assert!(!poller.is_live().await);
        }
    }

    #[tokio::test]
    async fn test_channel_fixed_between_ticks_announces_once() {
        let source = Arc::new(ScriptedSource::with_aux());
        source.set_default_liveness(live());
        let sink = Arc::new(RecordingSink::new());
        sink.set_resolvable(false);
        let poller = poller(source, sink.clone());

        assert_eq!(poller.poll_tick().await, PollOutcome::Aborted(AbortReason::ChannelUnresolved));
        assert_eq!(poller.poll_tick().await, PollOutcome::Aborted(AbortReason::ChannelUnresolved));
        assert_eq!(sink.sent_count(), 0);

        sink.set_resolvable(true);
        assert!(matches!(poller.poll_tick().await, PollOutcome::WentLive(_)));
        assert_eq!(poller.poll_tick().await, PollOutcome::StillLive);
        assert_eq!(sink.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_send_failure_stays_offline() {
        let source = Arc::new(ScriptedSource::with_aux());
        source.push_liveness(live());

        let mut sink = MockAnnouncementSink::new();
        sink.expect_resolve_channel().returning(|id| Some(id));
        sink.expect_bot_identity().returning(BotIdentity::default);
        sink.expect_send_announcement()
            .times(1)
            .returning(|_, _| Err(crate::Error::Discord("Missing Access".into())));
        let poller = poller(source, Arc::new(sink));

        assert_eq!(poller.poll_tick().await, PollOutcome::Aborted(AbortReason::SendFailed));
        assert!(!poller.is_live().await);
        assert!(!poller.has_update_timer().await);
    }

    #[tokio::test]
    async fn test_unavailable_never_changes_state() {
        let source = Arc::new(ScriptedSource::with_aux());
        source.push_liveness(Liveness::Unavailable);
        source.push_liveness(live());
        source.push_liveness(Liveness::Unavailable);
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(source, sink.clone());

        assert_eq!(poller.poll_tick().await, PollOutcome::NoData);
        assert!(!poller.is_live().await);
        assert!(matches!(poller.poll_tick().await, PollOutcome::WentLive(_)));
        assert_eq!(poller.poll_tick().await, PollOutcome::NoData);
        assert!(poller.is_live().await);
        assert!(poller.has_update_timer().await);
    }

    #[tokio::test]
    async fn test_refresh_edits_same_message() {
        let source = Arc::new(ScriptedSource::with_aux());
        source.push_liveness(live());
        let mut fresh = sample_snapshot();
        fresh.title = "round two".into();
        fresh.viewer_count = 77;
        source.push_liveness(Liveness::Live(fresh));
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(source, sink.clone());

        let PollOutcome::WentLive(handle) = poller.poll_tick().await else {
            panic!("expected live");
        };
        assert_eq!(poller.refresh_tick().await, RefreshOutcome::Edited);

        let edits = sink.edits();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].0, handle);
        assert_eq!(edits[0].1.embed.title.as_deref(), Some("round two"));
        assert_eq!(edits[0].1.content, "@everyone we're live!");
        assert_eq!(poller.active_handle().await, Some(handle));
        assert_eq!(sink.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_with_missing_data_leaves_message() {
        let source = Arc::new(ScriptedSource::with_aux());
        source.push_liveness(live());
        source.push_liveness(Liveness::Unavailable);
        source.push_liveness(live());
        source.push_category(Some(sample_category()));
        source.push_category(None);
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(source, sink.clone());

        assert!(matches!(poller.poll_tick().await, PollOutcome::WentLive(_)));
        assert_eq!(poller.refresh_tick().await, RefreshOutcome::NoData);
        assert_eq!(poller.refresh_tick().await, RefreshOutcome::NoData);
        assert!(sink.edits().is_empty());
        assert!(poller.is_live().await);
    }

    #[tokio::test]
    async fn test_refresh_after_offline_is_noop() {
        let source = Arc::new(ScriptedSource::with_aux());
        source.push_liveness(live());
        source.push_liveness(Liveness::Offline);
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(source, sink.clone());

        assert!(matches!(poller.poll_tick().await, PollOutcome::WentLive(_)));
        assert_eq!(poller.poll_tick().await, PollOutcome::WentOffline);
        assert_eq!(poller.refresh_tick().await, RefreshOutcome::NotLive);
        assert!(sink.edits().is_empty());
    }

    #[tokio::test]
    async fn test_same_kind_overlap_is_skipped() {
        let source = Arc::new(ScriptedSource::with_aux());
        source.push_liveness(live());
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(source, sink.clone());

        let poll_guard = poller.poll_gate.lock().await;
        assert_eq!(poller.poll_tick().await, PollOutcome::Busy);
        drop(poll_guard);

        let refresh_guard = poller.refresh_gate.lock().await;
        assert_eq!(poller.refresh_tick().await, RefreshOutcome::Busy);
        drop(refresh_guard);

        assert!(matches!(poller.poll_tick().await, PollOutcome::WentLive(_)));
    }

    #[tokio::test]
    async fn test_refresh_waits_for_running_liveness_tick() {
        let source = Arc::new(ScriptedSource::with_aux());
        source.set_default_liveness(live());
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(source, sink.clone());
        assert!(matches!(poller.poll_tick().await, PollOutcome::WentLive(_)));

        let state = poller.state.lock().await;
        let refresh = tokio::spawn({
            let poller = poller.clone();
            async move { poller.refresh_tick().await }
        });
        tokio::task::yield_now().await;
        assert!(!refresh.is_finished());
        drop(state);

        assert_eq!(refresh.await.unwrap(), RefreshOutcome::Edited);
        assert_eq!(sink.edits().len(), 1);
    }

    /// Liveness takes two seconds; aux lookups and sends are instant.
    struct SlowSource;

    #[async_trait::async_trait]
    impl StreamSource for SlowSource {
        fn platform(&self) -> StreamPlatform {
            StreamPlatform::YouTube
        }

        async fn check_live(&self) -> Liveness {
            tokio::time::sleep(Duration::from_secs(2)).await;
            live()
        }

        async fn fetch_profile(&self, _snapshot: &StreamSnapshot) -> Option<lunar_common::models::ProfileInfo> {
            Some(sample_profile())
        }

        async fn fetch_category(&self, _snapshot: &StreamSnapshot) -> Option<lunar_common::models::CategoryInfo> {
            Some(sample_category())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_survive_collisions_with_slow_liveness_ticks() {
        let sink = Arc::new(RecordingSink::new());
        let shutdown = CancellationToken::new();
        // 180s refresh against a 90s poll: every refresh lands on a liveness tick.
        let poller = StreamPoller::new(Arc::new(SlowSource), sink.clone(), settings(), shutdown.child_token());
        let handle = crate::tasks::spawn_stream_poll_task(poller, Duration::from_secs(90), shutdown.clone());

        tokio::time::sleep(Duration::from_secs(1800)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(sink.sent_count(), 1);
        let edits = sink.edits().len();
        assert!(edits >= 8, "expected a refresh every 180s, got {edits} edits");
    }

    #[tokio::test]
    async fn test_double_cancel_is_noop() {
        let source = Arc::new(ScriptedSource::with_aux());
        source.push_liveness(live());
        let poller = poller(source, Arc::new(RecordingSink::new()));
        assert!(matches!(poller.poll_tick().await, PollOutcome::WentLive(_)));

        let state = poller.state.lock().await;
        let timer = state.update_timer.as_ref().unwrap();
        timer.cancel();
        timer.cancel();
        assert!(timer.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_timer_drives_edits_until_offline() {
        let source = Arc::new(ScriptedSource::with_aux());
        source.set_default_liveness(live());
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(source.clone(), sink.clone());

        assert!(matches!(poller.poll_tick().await, PollOutcome::WentLive(_)));
        assert!(sink.edits().is_empty());

        tokio::time::sleep(Duration::from_secs(181)).await;
        assert_eq!(sink.edits().len(), 1);
        tokio::time::sleep(Duration::from_secs(180)).await;
        assert_eq!(sink.edits().len(), 2);

        source.push_liveness(Liveness::Offline);
        assert_eq!(poller.poll_tick().await, PollOutcome::WentOffline);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(sink.edits().len(), 2);
        assert_eq!(sink.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_refresh_timer() {
        let source = Arc::new(ScriptedSource::with_aux());
        source.push_liveness(live());
        let shutdown = CancellationToken::new();
        let poller = StreamPoller::new(source, Arc::new(RecordingSink::new()), settings(), shutdown.clone());

        assert!(matches!(poller.poll_tick().await, PollOutcome::WentLive(_)));
        shutdown.cancel();
        assert!(!poller.has_update_timer().await);
        assert!(poller.is_live().await);
    }
}
