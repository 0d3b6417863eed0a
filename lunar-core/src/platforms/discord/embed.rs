// ========================================================
// File: lunar-core/src/platforms/discord/embed.rs
// ========================================================
use tracing::warn;
use twilight_model::channel::message::Embed;
use twilight_model::util::Timestamp;
use twilight_util::builder::embed::{
    EmbedAuthorBuilder, EmbedBuilder, EmbedFooterBuilder, ImageSource,
};

use lunar_common::models::DiscordEmbed;

use crate::Error;

/// Image URLs that Discord would reject are dropped with a warning rather than
/// failing the whole message.
fn image(url: &str) -> Option<ImageSource> {
    if url.is_empty() {
        return None;
    }
    match ImageSource::url(url) {
        Ok(src) => Some(src),
        Err(e) => {
            warn!("Dropping embed image '{url}': {e}");
            None
        }
    }
}

pub fn to_twilight_embed(embed: &DiscordEmbed) -> Result<Embed, Error> {
    let mut builder = EmbedBuilder::new();

    if let Some(author) = &embed.author {
        let mut a = EmbedAuthorBuilder::new(author.name.clone());
        if let Some(icon) = author.icon_url.as_deref().and_then(image) {
            a = a.icon_url(icon);
        }
        if let Some(url) = &author.url {
            a = a.url(url.clone());
        }
        builder = builder.author(a);
    }
    if let Some(title) = &embed.title {
        builder = builder.title(title.clone());
    }
    if let Some(url) = &embed.url {
        builder = builder.url(url.clone());
    }
    if let Some(description) = &embed.description {
        builder = builder.description(description.clone());
    }
    if let Some(color) = embed.color {
        builder = builder.color(color.0);
    }
    if let Some(thumb) = embed.thumbnail.as_ref().and_then(|t| image(&t.url)) {
        builder = builder.thumbnail(thumb);
    }
    if let Some(img) = embed.image.as_ref().and_then(|i| image(&i.url)) {
        builder = builder.image(img);
    }
    if let Some(footer) = &embed.footer {
        let mut f = EmbedFooterBuilder::new(footer.text.clone());
        if let Some(icon) = footer.icon_url.as_deref().and_then(image) {
            f = f.icon_url(icon);
        }
        builder = builder.footer(f);
    }
    if let Some(ts) = embed.timestamp {
        let ts = Timestamp::from_secs(ts.timestamp())
            .map_err(|e| Error::Discord(format!("invalid embed timestamp: {e}")))?;
        builder = builder.timestamp(ts);
    }

    builder
        .validate()
        .map(|b| b.build())
        .map_err(|e| Error::Discord(format!("invalid embed: {e}")))
}
