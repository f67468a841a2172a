use crate::error::Error;
use crate::permissions::require_admin;
use crate::Context;
use tracing::info;

/// Set the text channel that receives call notifications.
#[poise::command(slash_command, guild_only, check = "require_admin")]
pub async fn set_channel(
    ctx: Context<'_>,
    #[description = "ID of the text channel to post notifications in"] channel_id: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::GuildOnly)?.get();
    let channel = channel_id
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| Error::InvalidChannelId(channel_id.clone()))?;

    ctx.data()
        .settings
        .lock()
        .await
        .set_target_channel(guild_id, channel)?;

    info!(guild_id, channel_id = channel, "Notification channel updated");
    ctx.say(format!("Notifications will be posted in <#{channel}>."))
        .await?;
    Ok(())
}
