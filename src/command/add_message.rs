use crate::error::Error;
use crate::permissions::require_admin;
use crate::Context;
use tracing::info;

/// Attach a short message to every call notification.
#[poise::command(slash_command, guild_only, check = "require_admin")]
pub async fn add_message(
    ctx: Context<'_>,
    #[description = "Message of up to 200 characters"] message: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::GuildOnly)?.get();

    ctx.data()
        .settings
        .lock()
        .await
        .set_additional_message(guild_id, &message)?;

    info!(guild_id, "Additional message updated");
    ctx.say(format!("Additional message set: {message}")).await?;
    Ok(())
}
