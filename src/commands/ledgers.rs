use crate::render;
use crate::state::Context;

/// Show row counts for the loaded ledgers
#[poise::command(slash_command, guild_only)]
pub async fn ledgers(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let stats = ctx.data().investigator.store().stats();
    ctx.say(render::ledger_stats(&stats)).await?;
    Ok(())
}
