use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use serenity::{Member, Permissions};
use tracing::info;

/// Check if a member has admin-level permissions.
pub fn is_admin(member: &Member) -> bool {
    member
        .permissions
        .unwrap_or(Permissions::empty())
        .administrator()
}

/// Authorization gate for every command that mutates guild settings.
/// Non-admins get an ephemeral refusal and the command body does not run.
pub async fn require_admin(ctx: Context<'_>) -> Result<bool, Error> {
    let allowed = match ctx.author_member().await {
        Some(member) => is_admin(&member),
        None => false,
    };

    if !allowed {
        info!(
            user = %ctx.author().name,
            command = %ctx.command().name,
            "Rejected settings command from non-administrator"
        );
        ctx.send(
            poise::CreateReply::default()
                .content("You need administrator permission to use this command.")
                .ephemeral(true),
        )
        .await?;
    }

    Ok(allowed)
}
