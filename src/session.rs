//! Voice call session tracking.
//!
//! A call on a voice channel starts when its occupancy becomes exactly one and
//! ends when it drops to zero. Only those two boundaries matter; every other
//! occupancy change is ignored.

use chrono::{DateTime, Duration, Local};
use std::collections::HashMap;

/// A voice channel as seen by a single voice state update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOccupancy {
    pub id: u64,
    pub name: String,
    /// Members connected once the update has been applied
    pub members: usize,
}

/// One member's move between voice channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceTransition {
    pub before: Option<ChannelOccupancy>,
    pub after: Option<ChannelOccupancy>,
    /// Display name of the member who moved
    pub actor: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceChannel {
    pub id: u64,
    pub name: String,
}

impl From<&ChannelOccupancy> for VoiceChannel {
    fn from(occupancy: &ChannelOccupancy) -> Self {
        Self {
            id: occupancy.id,
            name: occupancy.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    Started {
        channel: VoiceChannel,
        actor: String,
        started_at: DateTime<Local>,
    },
    Ended {
        channel: VoiceChannel,
        started_at: DateTime<Local>,
        ended_at: DateTime<Local>,
        duration: Duration,
    },
    /// The channel emptied but no start was recorded, e.g. after a restart.
    EndedUnknownDuration {
        channel: VoiceChannel,
        ended_at: DateTime<Local>,
    },
}

/// Open call sessions, keyed by voice channel ID. Never persisted.
#[derive(Debug, Default)]
pub struct CallSessionTracker {
    open: HashMap<u64, DateTime<Local>>,
}

impl CallSessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn started_at(&self, channel_id: u64) -> Option<DateTime<Local>> {
        self.open.get(&channel_id).copied()
    }

    #[cfg(test)]
    pub(crate) fn open_sessions(&self) -> usize {
        self.open.len()
    }

    /// Apply one voice state update and report the call boundaries it crossed.
    ///
    /// A move between two channels can both start a call in the destination
    /// and end one in the source; the start is reported first.
    pub fn on_occupancy_change(
        &mut self,
        transition: &VoiceTransition,
        now: DateTime<Local>,
    ) -> Vec<CallEvent> {
        let before_id = transition.before.as_ref().map(|c| c.id);
        let after_id = transition.after.as_ref().map(|c| c.id);
        if before_id == after_id {
            return Vec::new();
        }

        let mut events = Vec::new();

        if let Some(after) = transition.after.as_ref().filter(|c| c.members == 1) {
            self.open.insert(after.id, now);
            events.push(CallEvent::Started {
                channel: after.into(),
                actor: transition.actor.clone(),
                started_at: now,
            });
        }

        if let Some(before) = transition.before.as_ref().filter(|c| c.members == 0) {
            let channel = VoiceChannel::from(before);
            events.push(match self.open.remove(&before.id) {
                Some(started_at) => CallEvent::Ended {
                    channel,
                    started_at,
                    ended_at: now,
                    duration: (now - started_at).max(Duration::zero()),
                },
                None => CallEvent::EndedUnknownDuration {
                    channel,
                    ended_at: now,
                },
            });
        }

        events
    }
}
