// ========================================================
// File: lunar-core/src/test_utils/helpers.rs
// ========================================================
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use twilight_model::id::marker::ChannelMarker;
use twilight_model::id::Id;

use lunar_common::models::{
    AnnouncementPayload, BotIdentity, CategoryInfo, Liveness, MessageHandle, ProfileInfo,
    StreamPlatform, StreamSnapshot,
};

use crate::http::{ApiClient, ApiData};
use crate::platforms::{AnnouncementSink, StreamSource};
use crate::Error;

pub fn sample_snapshot() -> StreamSnapshot {
    StreamSnapshot {
        streamer_name: "LunarLive".into(),
        title: "late night build".into(),
        viewer_count: 42,
        category_id: "509658".into(),
        thumbnail_url_template: "https://cdn.example/preview-{width}x{height}.jpg".into(),
        started_at: Utc.with_ymd_and_hms(2021, 3, 10, 15, 4, 21).single(),
        stream_url: "https://twitch.tv/lunarlive".into(),
    }
}

pub fn sample_profile() -> ProfileInfo {
    ProfileInfo {
        display_name: "LunarLive".into(),
        profile_image_url: "https://cdn.example/pfp.png".into(),
    }
}

pub fn sample_category() -> CategoryInfo {
    CategoryInfo {
        id: "509658".into(),
        name: "Just Chatting".into(),
        art_url_template: Some("https://cdn.example/art-{width}x{height}.jpg".into()),
    }
}

enum Scripted {
    Data(ApiData),
    Failure,
}

/// `ApiClient` answering from per-endpoint queues. An empty queue answers
/// `ApiData::Absent`. Every call is recorded as `path?k=v&...` (unencoded).
#[derive(Default)]
pub struct ScriptedApi {
    responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, path: &str, data: ApiData) {
        self.responses
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(Scripted::Data(data));
    }

    /// Queues a transport failure.
    pub fn push_error(&self, path: &str) {
        self.responses
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(Scripted::Failure);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ApiClient for ScriptedApi {
    async fn call(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiData, Error> {
        let rendered = query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        self.calls.lock().push(format!("{path}?{rendered}"));

        let next = self
            .responses
            .lock()
            .get_mut(path)
            .and_then(|q| q.pop_front());
        match next {
            Some(Scripted::Data(data)) => Ok(data),
            Some(Scripted::Failure) => Err(Error::Platform(format!("scripted failure for {path}"))),
            None => Ok(ApiData::Absent),
        }
    }
}

/// `StreamSource` answering from queues, falling back to per-kind defaults.
pub struct ScriptedSource {
    platform: StreamPlatform,
    liveness: Mutex<VecDeque<Liveness>>,
    profiles: Mutex<VecDeque<Option<ProfileInfo>>>,
    categories: Mutex<VecDeque<Option<CategoryInfo>>>,
    default_liveness: Mutex<Liveness>,
    default_profile: Option<ProfileInfo>,
    default_category: Option<CategoryInfo>,
}

impl ScriptedSource {
    /// Unavailable liveness and no auxiliary data unless queued.
    pub fn new() -> Self {
        Self {
            platform: StreamPlatform::Twitch,
            liveness: Mutex::new(VecDeque::new()),
            profiles: Mutex::new(VecDeque::new()),
            categories: Mutex::new(VecDeque::new()),
            default_liveness: Mutex::new(Liveness::Unavailable),
            default_profile: None,
            default_category: None,
        }
    }

    /// Like `new`, but profile and category lookups succeed by default.
    pub fn with_aux() -> Self {
        Self {
            default_profile: Some(sample_profile()),
            default_category: Some(sample_category()),
            ..Self::new()
        }
    }

    pub fn push_liveness(&self, liveness: Liveness) {
        self.liveness.lock().push_back(liveness);
    }

    pub fn push_profile(&self, profile: Option<ProfileInfo>) {
        self.profiles.lock().push_back(profile);
    }

    pub fn push_category(&self, category: Option<CategoryInfo>) {
        self.categories.lock().push_back(category);
    }

    pub fn set_default_liveness(&self, liveness: Liveness) {
        *self.default_liveness.lock() = liveness;
    }
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamSource for ScriptedSource {
    fn platform(&self) -> StreamPlatform {
        self.platform
    }

    async fn check_live(&self) -> Liveness {
        let next = self.liveness.lock().pop_front();
        next.unwrap_or_else(|| self.default_liveness.lock().clone())
    }

    async fn fetch_profile(&self, _snapshot: &StreamSnapshot) -> Option<ProfileInfo> {
        let next = self.profiles.lock().pop_front();
        next.unwrap_or_else(|| self.default_profile.clone())
    }

    async fn fetch_category(&self, _snapshot: &StreamSnapshot) -> Option<CategoryInfo> {
        let next = self.categories.lock().pop_front();
        next.unwrap_or_else(|| self.default_category.clone())
    }
}

/// `AnnouncementSink` that records every send and edit.
pub struct RecordingSink {
    sent: Mutex<Vec<(Id<ChannelMarker>, AnnouncementPayload)>>,
    edits: Mutex<Vec<(MessageHandle, AnnouncementPayload)>>,
    next_message_id: AtomicU64,
    resolvable: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            next_message_id: AtomicU64::new(1000),
            resolvable: AtomicBool::new(true),
        }
    }

    pub fn set_resolvable(&self, resolvable: bool) {
        self.resolvable.store(resolvable, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(Id<ChannelMarker>, AnnouncementPayload)> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn edits(&self) -> Vec<(MessageHandle, AnnouncementPayload)> {
        self.edits.lock().clone()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnnouncementSink for RecordingSink {
    fn bot_identity(&self) -> BotIdentity {
        BotIdentity::default()
    }

    async fn resolve_channel(&self, channel_id: Id<ChannelMarker>) -> Option<Id<ChannelMarker>> {
        self.resolvable.load(Ordering::SeqCst).then_some(channel_id)
    }

    async fn send_announcement(
        &self,
        channel_id: Id<ChannelMarker>,
        payload: &AnnouncementPayload,
    ) -> Result<MessageHandle, Error> {
        self.sent.lock().push((channel_id, payload.clone()));
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        Ok(MessageHandle {
            channel_id,
            message_id: Id::new(id),
        })
    }

    async fn edit_announcement(
        &self,
        handle: &MessageHandle,
        payload: &AnnouncementPayload,
    ) -> Result<(), Error> {
        self.edits.lock().push((*handle, payload.clone()));
        Ok(())
    }
}
