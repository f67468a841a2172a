use crate::error::Error;
use crate::Context;

/// Show where call notifications are posted in this server.
#[poise::command(slash_command, guild_only)]
pub async fn show_settings(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::GuildOnly)?.get();

    let settings = ctx.data().settings.lock().await.get(guild_id).cloned();

    let Some(settings) = settings else {
        ctx.say("Call notifications are not configured for this server.")
            .await?;
        return Ok(());
    };

    let mut response = format!(
        "**Notification channel:** <#{}>\n",
        settings.text_channel_id
    );
    match settings.footer() {
        Some(footer) => response.push_str(&format!("**Additional message:** {footer}")),
        None => response.push_str("**Additional message:** none"),
    }

    ctx.say(response).await?;
    Ok(())
}
