// ========================================================
// File: lunar-core/src/services/announcement.rs
// ========================================================
//! Builds the "X is now LIVE" announcement.
//!
//! The same helpers serve the first send and every later edit, so a refreshed
//! announcement differs from the original only in title, description and
//! thumbnail.

use lunar_common::models::{
    AnnouncementPayload, BotIdentity, CategoryInfo, DiscordEmbed, DiscordEmbedAuthor,
    DiscordEmbedFooter, DiscordEmbedImage, DiscordEmbedThumbnail, ProfileInfo, StreamPlatform,
    StreamSnapshot,
};

/// Box art is rendered portrait.
pub const CATEGORY_ART_SIZE: (u32, u32) = (300, 400);
/// Stream previews are rendered at full HD.
pub const PREVIEW_SIZE: (u32, u32) = (1920, 1080);

/// Substitutes the `{width}` / `{height}` tokens Twitch puts in image URLs.
pub fn fill_size_tokens(template: &str, (width, height): (u32, u32)) -> String {
    template
        .replace("{width}", &width.to_string())
        .replace("{height}", &height.to_string())
}

pub fn describe(snapshot: &StreamSnapshot, category: &CategoryInfo) -> String {
    format!(
        "**{}** is playing **{}** with **{}** people watching!\n\n[**Come watch the stream!**]({})",
        snapshot.streamer_name, category.name, snapshot.viewer_count, snapshot.stream_url
    )
}

fn category_thumbnail(category: &CategoryInfo) -> Option<DiscordEmbedThumbnail> {
    category
        .art_url_template
        .as_deref()
        .filter(|url| !url.is_empty())
        .map(|url| DiscordEmbedThumbnail {
            url: fill_size_tokens(url, CATEGORY_ART_SIZE),
        })
}

/// Full announcement for an OFFLINE -> LIVE transition.
pub fn build_announcement(
    platform: StreamPlatform,
    caption: &str,
    snapshot: &StreamSnapshot,
    profile: &ProfileInfo,
    category: &CategoryInfo,
    bot: &BotIdentity,
) -> AnnouncementPayload {
    let mut embed = DiscordEmbed::new();

    embed.author = Some(DiscordEmbedAuthor {
        name: format!("{} is now LIVE on {}!", snapshot.streamer_name, platform.label()),
        url: None,
        icon_url: Some(profile.profile_image_url.clone()).filter(|u| !u.is_empty()),
    });
    embed.title = Some(snapshot.title.clone());
    embed.url = Some(snapshot.stream_url.clone());
    embed.description = Some(describe(snapshot, category));
    embed.color = Some(platform.color());
    embed.thumbnail = category_thumbnail(category);
    embed.image = Some(snapshot.thumbnail_url_template.as_str())
        .filter(|u| !u.is_empty())
        .map(|u| DiscordEmbedImage {
            url: fill_size_tokens(u, PREVIEW_SIZE),
        });
    embed.footer = Some(DiscordEmbedFooter {
        text: format!("Powered by {}", bot.name),
        icon_url: bot.avatar_url.clone(),
    });
    embed.timestamp = snapshot.started_at;

    AnnouncementPayload {
        content: caption.to_string(),
        embed,
    }
}

/// Copy of `previous` with title, description and thumbnail brought up to date.
pub fn refresh_announcement(
    previous: &AnnouncementPayload,
    snapshot: &StreamSnapshot,
    category: &CategoryInfo,
) -> AnnouncementPayload {
    let mut next = previous.clone();
    next.embed.title = Some(snapshot.title.clone());
    next.embed.description = Some(describe(snapshot, category));
    next.embed.thumbnail = category_thumbnail(category);
    next
}
