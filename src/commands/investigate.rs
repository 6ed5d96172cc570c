use tracing::info;

use super::send_chunked;
use crate::render;
use crate::state::Context;

/// Investigate a single transaction across all ledgers
#[poise::command(slash_command, guild_only)]
pub async fn investigate(
    ctx: Context<'_>,
    #[description = "Transaction ID (e.g. TXN123456)"] txn_id: String,
) -> Result<(), anyhow::Error> {
    let txn_id = txn_id.trim().to_string();
    ctx.defer().await?;

    let timeout = ctx.data().run_config.read().await.settings().timeout;
    info!(user = ctx.author().name, txn_id, "single investigation started");

    let report = ctx.data().investigator.investigate(&txn_id, timeout).await;

    info!(txn_id, stage = %report.stage, "single investigation finished");
    send_chunked(&ctx, &render::transaction_report(&report)).await
}
