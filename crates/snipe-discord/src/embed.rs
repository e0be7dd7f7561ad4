//! Core embeds → twilight embeds.

use tracing::debug;
use twilight_model::{channel::message::Embed as DiscordEmbed, util::Timestamp};
use twilight_util::builder::embed::{
    EmbedBuilder, EmbedFieldBuilder, EmbedFooterBuilder, ImageSource,
};

use snipe_core::messaging::types::Embed;

fn image(url: &str) -> Option<ImageSource> {
    match ImageSource::url(url) {
        Ok(source) => Some(source),
        Err(e) => {
            debug!("dropping invalid image url {url:?}: {e}");
            None
        }
    }
}

/// Render `embed`; footers without an icon get `default_icon`.
pub fn to_twilight(embed: &Embed, default_icon: Option<&str>) -> DiscordEmbed {
    let mut builder = EmbedBuilder::new().color(embed.color);

    if let Some(title) = &embed.title {
        builder = builder.title(title);
    }
    if let Some(description) = &embed.description {
        builder = builder.description(description);
    }
    for f in &embed.fields {
        let mut field = EmbedFieldBuilder::new(&f.name, &f.value);
        if f.inline {
            field = field.inline();
        }
        builder = builder.field(field);
    }
    if let Some(footer) = &embed.footer {
        let mut fb = EmbedFooterBuilder::new(&footer.text);
        if let Some(icon) = footer
            .icon_url
            .as_deref()
            .or(default_icon)
            .and_then(image)
        {
            fb = fb.icon_url(icon);
        }
        builder = builder.footer(fb);
    }
    if let Some(thumb) = embed.thumbnail_url.as_deref().and_then(image) {
        builder = builder.thumbnail(thumb);
    }
    if let Some(ts) = embed
        .timestamp
        .and_then(|at| Timestamp::from_secs(at.timestamp()).ok())
    {
        builder = builder.timestamp(ts);
    }

    builder.build()
}
