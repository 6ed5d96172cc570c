use std::time::Instant;

use futures::StreamExt;
use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use super::send_chunked_since;
use crate::error::ReconError;
use crate::investigate::batch::read_txn_ids;
use crate::investigate::log_batch_finished;
use crate::render;
use crate::state::Context;

/// Largest upload accepted, in bytes.
const MAX_UPLOAD_BYTES: u32 = 1024 * 1024;

/// Investigate every transaction listed in an uploaded CSV
#[poise::command(slash_command, guild_only)]
pub async fn batch(
    ctx: Context<'_>,
    #[description = "CSV file with a 'txn_id' column"] file: serenity::Attachment,
) -> Result<(), anyhow::Error> {
    let started = Instant::now();
    ctx.defer().await?;

    info!(
        user = ctx.author().name,
        file = file.filename,
        size = file.size,
        "batch upload received"
    );

    let txn_ids = match check_upload(&file) {
        Ok(()) => {
            let bytes = file.download().await?;
            read_txn_ids(&bytes)
        }
        Err(e) => Err(e),
    };
    let txn_ids = match txn_ids {
        Ok(ids) => ids,
        Err(e) => {
            warn!(file = file.filename, "{}", e);
            ctx.say(format!("❌ **{}**: {}", e.kind(), e)).await?;
            return Ok(());
        }
    };

    if txn_ids.is_empty() {
        ctx.say("The file contained no transactions.").await?;
        return Ok(());
    }

    ctx.say(format!("Processing {} transactions...", txn_ids.len()))
        .await?;

    let settings = ctx.data().run_config.read().await.settings();
    let investigator = &ctx.data().investigator;
    let mut stream = std::pin::pin!(investigator.investigate_stream(&txn_ids, settings));

    // Reports go out in input order as they finish; the summary follows the last one.
    let mut reports = Vec::with_capacity(txn_ids.len());
    while let Some(report) = stream.next().await {
        send_chunked_since(&ctx, started, &render::transaction_report(&report)).await?;
        reports.push(report);
    }
    log_batch_finished(&reports);

    send_chunked_since(&ctx, started, &render::batch_summary(&reports)).await?;
    Ok(())
}

fn check_upload(file: &serenity::Attachment) -> Result<(), ReconError> {
    if !file.filename.to_lowercase().ends_with(".csv") {
        return Err(ReconError::Input(format!(
            "'{}' is not a .csv file",
            file.filename
        )));
    }
    if file.size > MAX_UPLOAD_BYTES {
        return Err(ReconError::Input(format!(
            "'{}' is {} bytes; the limit is {}",
            file.filename, file.size, MAX_UPLOAD_BYTES
        )));
    }
    Ok(())
}
