use tracing::info;

use crate::state::Context;

/// Configure investigation run parameters (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn config(
    ctx: Context<'_>,
    #[description = "concurrency | timeout_secs"] param: Option<String>,
    #[description = "New value"] value: Option<u64>,
) -> Result<(), anyhow::Error> {
    let user_id = ctx.author().id.get();
    if !ctx.data().is_admin(user_id) {
        ctx.say("This command is admin-only.").await?;
        return Ok(());
    }

    match (param.as_deref(), value) {
        // Show current config
        (None, _) => {
            let config = ctx.data().run_config.read().await;
            ctx.say(format!(
                "**Run Configuration:**\n\
                 `concurrency`: {}\n\
                 `timeout_secs`: {}",
                config.concurrency, config.timeout_secs
            ))
            .await?;
        }
        // Set a parameter
        (Some(key), Some(val)) => {
            let mut config = ctx.data().run_config.write().await;
            let mut updated = config.clone();
            match key {
                "concurrency" => updated.concurrency = val as usize,
                "timeout_secs" => updated.timeout_secs = val,
                _ => {
                    ctx.say(format!(
                        "Unknown param `{}`. Valid: `concurrency`, `timeout_secs`",
                        key
                    ))
                    .await?;
                    return Ok(());
                }
            }
            if let Err(e) = updated.validate() {
                ctx.say(format!("Rejected: {}", e)).await?;
                return Ok(());
            }
            *config = updated;
            info!(user_id, param = key, value = val, "run config updated");
            ctx.say(format!("`{}` set to {}", key, val)).await?;
        }
        (Some(_), None) => {
            ctx.say("Provide both `param` and `value`. Example: `/recon config concurrency 4`")
                .await?;
        }
    }

    Ok(())
}
