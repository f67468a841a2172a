use anyhow::Context as _;
use callbell::config::Config;
use callbell::events::{self, BotEvent, DiscordSink};
use callbell::settings::SettingsStore;
use callbell::{command, Data, Error};
use dotenvy::dotenv;
use poise::serenity_prelude as serenity;
use serenity::GatewayIntents;
use tracing::{error, info};

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!(error = %error, "Failed to start bot");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(command = %ctx.command().name, error = %error, "Command error");
            let reply = poise::CreateReply::default()
                .content(error.user_message())
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                error!(error = %e, "Failed to report command error");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!(error = %e, "Error while handling error");
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("callbell=info")),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let settings = SettingsStore::load(&config.settings_path)
        .context("Failed to load guild settings")?;

    let token = config.discord_token.clone();

    let options = poise::FrameworkOptions {
        commands: command::all(),
        on_error: |error| Box::pin(on_error(error)),
        pre_command: |ctx| {
            Box::pin(async move {
                info!(
                    command = %ctx.command().qualified_name,
                    user = %ctx.author().name,
                    "Executing command"
                );
            })
        },
        event_handler: |ctx, event, framework, data| {
            Box::pin(async move { events::handle_event(ctx, event, framework, data).await })
        },
        ..Default::default()
    };

    let framework = poise::Framework::builder()
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                let data = Data::new(config, settings);

                // poise also forwards this ready event to the event handler;
                // the gate keeps the sync to one attempt at a time.
                let sink = DiscordSink {
                    ctx,
                    commands: &framework.options().commands,
                    guild_id: data.config.guild_id,
                };
                let ready_event = BotEvent::ClientReady {
                    user_name: ready.user.name.clone(),
                };
                events::dispatch(&data, &sink, ready_event).await?;

                let configured = data.settings.lock().await.registry().len();
                info!(guilds = ready.guilds.len(), configured, "Bot is ready");
                Ok(data)
            })
        })
        .options(options)
        .build();

    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .context("Failed to create Discord client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping bot...");
        shard_manager.shutdown_all().await;
    });

    info!("Starting bot...");
    client.start().await?;
    info!("Bot has shut down cleanly");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
