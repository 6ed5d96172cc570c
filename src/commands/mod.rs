mod batch;
mod config;
mod investigate;
mod ledgers;

use std::time::{Duration, Instant};

use crate::state::Context;

/// Discord caps messages at 2000 chars.
const CHUNK_LIMIT: usize = 1990;

/// Interaction follow-ups are rejected 15 minutes after the command; leave a
/// minute of margin.
const FOLLOW_UP_WINDOW: Duration = Duration::from_secs(14 * 60);

const FENCE: &str = "```";

/// Recon - transaction reconciliation investigator
#[poise::command(
    slash_command,
    subcommands(
        "investigate::investigate",
        "batch::batch",
        "ledgers::ledgers",
        "config::config"
    )
)]
pub async fn recon(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}

/// Send a message in Discord-safe chunks (max 1990 chars).
/// All chunks go through ctx.say() so follow-ups use the interaction webhook,
/// which doesn't require Send Messages channel permission.
pub(crate) async fn send_chunked(ctx: &Context<'_>, text: &str) -> Result<(), anyhow::Error> {
    for chunk in chunks(text, CHUNK_LIMIT) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

/// Like [`send_chunked`], for long-running commands. Once the interaction
/// webhook is about to expire, chunks are posted to the channel instead.
pub(crate) async fn send_chunked_since(
    ctx: &Context<'_>,
    started: Instant,
    text: &str,
) -> Result<(), anyhow::Error> {
    for chunk in chunks(text, CHUNK_LIMIT) {
        if within_follow_up_window(started.elapsed()) {
            ctx.say(chunk).await?;
        } else {
            ctx.channel_id().say(ctx.http(), chunk).await?;
        }
    }
    Ok(())
}

fn within_follow_up_window(elapsed: Duration) -> bool {
    elapsed < FOLLOW_UP_WINDOW
}

/// Split into chunks of at most `max` bytes. A code block cut by a split is
/// closed at the end of its chunk and reopened at the start of the next.
fn chunks(text: &str, max: usize) -> Vec<String> {
    // room for "```\n" in front and "\n```" behind
    let budget = max.saturating_sub(2 * (FENCE.len() + 1)).max(1);
    let mut out = Vec::new();
    let mut in_fence = false;
    for piece in split_text(text, budget) {
        let mut chunk = String::with_capacity(piece.len() + 8);
        if in_fence {
            chunk.push_str(FENCE);
            chunk.push('\n');
        }
        chunk.push_str(piece);
        if piece.matches(FENCE).count() % 2 == 1 {
            in_fence = !in_fence;
        }
        if in_fence {
            if !chunk.ends_with('\n') {
                chunk.push('\n');
            }
            chunk.push_str(FENCE);
        }
        out.push(chunk);
    }
    out
}

/// Split at the last newline (or space) before `max` bytes.
fn split_text(text: &str, max: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        let mut chunk_len = remaining.len().min(max);
        while !remaining.is_char_boundary(chunk_len) {
            chunk_len -= 1;
        }
        let split_at = if chunk_len < remaining.len() {
            remaining[..chunk_len]
                .rfind('\n')
                .or_else(|| remaining[..chunk_len].rfind(' '))
                .map(|i| i + 1)
                .unwrap_or(chunk_len)
        } else {
            chunk_len
        };
        // a multi-byte char wider than `max` still has to go somewhere
        let split_at = if split_at == 0 {
            remaining.chars().next().map_or(0, char::len_utf8)
        } else {
            split_at
        };
        out.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }
    out
}
