//! Gateway event dispatch.
//!
//! Raw serenity events are decoded into [`BotEvent`] at the boundary; the
//! dispatcher then drives the settings store, the session tracker and the
//! formatter, and hands finished notifications to a [`NotificationSink`].

use crate::notify::{self, Notification};
use crate::session::{ChannelOccupancy, VoiceTransition};
use crate::{Data, Error};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use poise::serenity_prelude as serenity;
use serenity::{ChannelId, CreateMessage, FullEvent, GuildId, VoiceState};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotEvent {
    GuildJoined {
        guild_id: u64,
        guild_name: String,
        system_channel_id: Option<u64>,
    },
    VoiceStateChanged {
        guild_id: u64,
        transition: VoiceTransition,
        now: DateTime<Local>,
    },
    ClientReady {
        user_name: String,
    },
}

/// Outbound side of the dispatcher.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(
        &self,
        guild_id: u64,
        channel_id: u64,
        notification: &Notification,
    ) -> Result<(), Error>;

    async fn sync_commands(&self) -> Result<(), Error>;
}

/// Opens exactly once per process so reconnects don't re-sync commands.
#[derive(Debug, Default)]
pub struct ReadyGate(AtomicBool);

impl ReadyGate {
    pub fn first_ready(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    /// Reopen the gate after a failed sync.
    pub fn release(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub async fn dispatch(
    data: &Data,
    sink: &dyn NotificationSink,
    event: BotEvent,
) -> Result<(), Error> {
    match event {
        BotEvent::GuildJoined {
            guild_id,
            guild_name,
            system_channel_id,
        } => {
            let registered = data
                .settings
                .lock()
                .await
                .register_guild(guild_id, system_channel_id)?;

            if registered {
                info!(
                    guild_id,
                    guild = %guild_name,
                    channel_id = ?system_channel_id,
                    "Registered new guild"
                );
            } else {
                warn!(
                    guild_id,
                    guild = %guild_name,
                    "System channel not found, guild left unconfigured"
                );
            }
        }
        BotEvent::VoiceStateChanged {
            guild_id,
            transition,
            now,
        } => {
            on_voice_state_change(data, sink, guild_id, &transition, now).await;
        }
        BotEvent::ClientReady { user_name } => {
            if !data.ready.first_ready() {
                debug!(bot = %user_name, "Ready event, commands already synced");
                return Ok(());
            }
            // A failed sync must not stop event handling; the next ready retries.
            match sink.sync_commands().await {
                Ok(()) => info!(bot = %user_name, "Logged in, commands synced"),
                Err(e) => {
                    data.ready.release();
                    warn!(bot = %user_name, error = %e, "Failed to sync commands");
                }
            }
        }
    }

    Ok(())
}

async fn on_voice_state_change(
    data: &Data,
    sink: &dyn NotificationSink,
    guild_id: u64,
    transition: &VoiceTransition,
    now: DateTime<Local>,
) {
    let Some(settings) = data.settings.lock().await.get(guild_id).cloned() else {
        debug!(guild_id, "Voice update in unconfigured guild");
        return;
    };

    let events = data
        .sessions
        .lock()
        .await
        .on_occupancy_change(transition, now);

    for event in &events {
        let notification = notify::render(event, settings.footer());
        match sink
            .send(guild_id, settings.text_channel_id, &notification)
            .await
        {
            Ok(()) => debug!(guild_id, title = %notification.title, "Sent call notification"),
            Err(e @ Error::MissingTargetChannel { .. }) => {
                warn!(guild_id, error = %e, "Skipping call notification");
            }
            Err(e) => error!(guild_id, error = %e, "Failed to send call notification"),
        }
    }
}

/// Decode a gateway event. Member counts come from the cache, which serenity
/// updates before the event handler runs.
pub fn decode(ctx: &serenity::Context, event: &FullEvent) -> Option<BotEvent> {
    match event {
        FullEvent::Ready { data_about_bot } => Some(BotEvent::ClientReady {
            user_name: data_about_bot.user.name.clone(),
        }),
        FullEvent::GuildCreate { guild, is_new } => {
            if *is_new != Some(true) {
                return None;
            }
            Some(BotEvent::GuildJoined {
                guild_id: guild.id.get(),
                guild_name: guild.name.clone(),
                system_channel_id: guild.system_channel_id.map(|id| id.get()),
            })
        }
        FullEvent::VoiceStateUpdate { old, new } => {
            let guild_id = new.guild_id?;
            let guild = ctx.cache.guild(guild_id)?;
            let transition = voice_transition(
                old.as_ref(),
                new,
                guild.voice_states.values(),
                |channel_id| guild.channels.get(&channel_id).map(|c| c.name.clone()),
            )?;

            Some(BotEvent::VoiceStateChanged {
                guild_id: guild_id.get(),
                transition,
                now: Local::now(),
            })
        }
        _ => None,
    }
}

/// Build the occupancy transition for one voice state update. `voice_states`
/// must already include `new`. Returns `None` when the member stayed in the
/// same channel.
pub(crate) fn voice_transition<'a>(
    old: Option<&VoiceState>,
    new: &VoiceState,
    voice_states: impl Iterator<Item = &'a VoiceState> + Clone,
    channel_name: impl Fn(ChannelId) -> Option<String>,
) -> Option<VoiceTransition> {
    let before = old.and_then(|state| state.channel_id);
    let after = new.channel_id;
    if before == after {
        return None;
    }

    let actor = new
        .member
        .as_ref()
        .map(|member| member.display_name().to_string())
        .unwrap_or_else(|| format!("User {}", new.user_id));

    let occupancy = |channel_id: ChannelId| ChannelOccupancy {
        id: channel_id.get(),
        name: channel_name(channel_id).unwrap_or_else(|| format!("Channel {}", channel_id)),
        members: voice_states
            .clone()
            .filter(|state| state.channel_id == Some(channel_id))
            .count(),
    };

    Some(VoiceTransition {
        before: before.map(&occupancy),
        after: after.map(&occupancy),
        actor,
    })
}

/// Sends through the Discord HTTP API and syncs the framework's commands.
pub struct DiscordSink<'a> {
    pub ctx: &'a serenity::Context,
    pub commands: &'a [poise::Command<Data, Error>],
    pub guild_id: Option<u64>,
}

#[async_trait]
impl NotificationSink for DiscordSink<'_> {
    async fn send(
        &self,
        guild_id: u64,
        channel_id: u64,
        notification: &Notification,
    ) -> Result<(), Error> {
        let missing = Error::MissingTargetChannel {
            guild_id,
            channel_id,
        };
        if guild_id == 0 || channel_id == 0 {
            return Err(missing);
        }

        let channel = ChannelId::new(channel_id);
        let exists = self
            .ctx
            .cache
            .guild(GuildId::new(guild_id))
            .is_some_and(|guild| guild.channels.contains_key(&channel));
        if !exists {
            return Err(missing);
        }

        let message = CreateMessage::new().embed(notification.to_embed());
        channel.send_message(&self.ctx.http, message).await?;
        Ok(())
    }

    async fn sync_commands(&self) -> Result<(), Error> {
        match self.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                poise::builtins::register_in_guild(self.ctx, self.commands, guild_id).await?;
                info!(guild_id = %guild_id, "Slash commands registered to guild");
            }
            None => {
                poise::builtins::register_globally(self.ctx, self.commands).await?;
                info!("Slash commands registered globally");
            }
        }
        Ok(())
    }
}

/// poise event handler entry point.
pub async fn handle_event(
    ctx: &serenity::Context,
    event: &FullEvent,
    framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    let Some(event) = decode(ctx, event) else {
        return Ok(());
    };

    let sink = DiscordSink {
        ctx,
        commands: &framework.options().commands,
        guild_id: data.config.guild_id,
    };
    dispatch(data, &sink, event).await
}
