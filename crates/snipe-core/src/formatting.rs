//! Formatting utilities (file sizes, mention tags) and every payload the bot
//! sends: command replies and audit notices.

use chrono::{DateTime, Utc};

use crate::{
    cache::DeletedMessageRecord,
    domain::{ChannelId, UserId},
    messaging::types::{Attachment, AuthorInfo, ChannelInfo, Embed},
};

pub const COLOR_DENIED: u32 = 0xff0000;
pub const COLOR_NOT_FOUND: u32 = 0xff6b6b;
pub const COLOR_SNIPE: u32 = 0x4dabf7;
pub const COLOR_ERROR: u32 = 0xff4757;
pub const COLOR_DELETED: u32 = 0xff6b6b;

pub const SNIPE_FOOTER: &str = "Snipe Bot";

/// Length of the sniped-content preview in audit notices.
pub const PREVIEW_CHARS: usize = 100;

const DENIED_TEXT: &str = "```ansi\n\u{1b}[31;1mYou are not allowed to use this command.\u{1b}[0m\n```";

/// Human-readable size: `0` → `0 Bytes`, `2048` → `2 KB`, `1536` → `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

/// First `max_chars` characters, plus `...` when anything was cut.
pub fn truncate_text(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out = s.chars().take(max_chars).collect::<String>();
    out.push_str("...");
    out
}

/// Like [`truncate_text`] but the result never exceeds `max_chars`.
pub fn clamp_text(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out = s.chars().take(keep).collect::<String>();
    out.push_str(&"...".chars().take(max_chars - keep).collect::<String>());
    out
}

pub fn user_mention(id: UserId) -> String {
    format!("<@{}>", id.0)
}

pub fn channel_mention(id: ChannelId) -> String {
    format!("<#{}>", id.0)
}

/// Client-rendered timestamp. `R` = relative ("3 minutes ago"), `F` = full date.
pub fn timestamp_tag(at: DateTime<Utc>, style: char) -> String {
    format!("<t:{}:{style}>", at.timestamp())
}

/// `#name` when the channel name is known, a channel mention otherwise.
pub fn channel_label(channel: &ChannelInfo) -> String {
    match &channel.name {
        Some(name) => format!("#{name}"),
        None => channel_mention(channel.id),
    }
}

pub fn attachment_summary(attachments: &[Attachment]) -> Option<String> {
    if attachments.is_empty() {
        return None;
    }
    Some(
        attachments
            .iter()
            .map(|a| format!("📎 {} ({})", a.name, format_file_size(a.size_bytes)))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

// ============== Command replies ==============

pub fn denied_embed() -> Embed {
    Embed::new(COLOR_DENIED)
        .description(DENIED_TEXT)
        .timestamp(Utc::now())
}

pub fn not_found_embed() -> Embed {
    Embed::new(COLOR_NOT_FOUND)
        .title("🔍 No Messages Found")
        .description("No recently deleted messages to snipe in this channel.")
        .footer(SNIPE_FOOTER)
        .timestamp(Utc::now())
}

pub fn error_embed() -> Embed {
    Embed::new(COLOR_ERROR)
        .title("❌ Error")
        .description("An error occurred while trying to snipe the message. Please try again.")
        .footer(SNIPE_FOOTER)
        .timestamp(Utc::now())
}

pub fn snipe_embed(record: &DeletedMessageRecord) -> Embed {
    let mut embed = Embed::new(COLOR_SNIPE)
        .title("🎯 Message Sniped!")
        .description(format!("**Message Content:**\n{}", record.content))
        .field(
            "👤 Author",
            format!(
                "{} ({})",
                user_mention(record.author.id),
                record.author.username
            ),
            true,
        )
        .field("📅 Deleted", timestamp_tag(record.deleted_at, 'R'), true)
        .field("📍 Channel", channel_mention(record.channel_id), true)
        .thumbnail(record.author.avatar_url.clone())
        .footer(SNIPE_FOOTER)
        .timestamp(Utc::now());

    if let Some(list) = attachment_summary(&record.attachments) {
        embed = embed.field("📎 Attachments", list, false);
    }
    embed
}

// ============== Audit notices ==============

pub fn deleted_notice_embed(record: &DeletedMessageRecord, footer: &str) -> Embed {
    let channel = ChannelInfo {
        id: record.channel_id,
        name: record.channel_name.clone(),
    };
    let mut embed = Embed::new(COLOR_DELETED)
        .title("🗑️ Message Deleted")
        .description(format!("**Content:**\n{}", record.content))
        .field(
            "👤 Author",
            format!(
                "{} ({})",
                record.author.username,
                user_mention(record.author.id)
            ),
            true,
        )
        .field("📍 Channel", channel_label(&channel), true)
        .field("🕒 Deleted At", timestamp_tag(record.deleted_at, 'F'), false)
        .footer(footer)
        .timestamp(Utc::now());

    if let Some(list) = attachment_summary(&record.attachments) {
        embed = embed.field("📎 Attachments", list, false);
    }
    embed
}

pub fn snipe_notice_embed(
    invoker: &AuthorInfo,
    channel: &ChannelInfo,
    record: &DeletedMessageRecord,
    command: &str,
    footer: &str,
) -> Embed {
    Embed::new(COLOR_SNIPE)
        .title("🎯 Snipe Command Used")
        .description(format!("**{}** used {command} command", invoker.username))
        .field(
            "👤 User",
            format!("{} ({})", invoker.username, user_mention(invoker.id)),
            true,
        )
        .field("📍 Channel", channel_label(channel), true)
        .field(
            "🎯 Sniped Message",
            format!(
                "From: {}\nContent: {}",
                record.author.username,
                truncate_text(&record.content, PREVIEW_CHARS)
            ),
            false,
        )
        .footer(footer)
        .timestamp(Utc::now())
}
