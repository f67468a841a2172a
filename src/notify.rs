use crate::session::CallEvent;
use chrono::{DateTime, Duration, Local};
use poise::serenity_prelude as serenity;
use serenity::{CreateEmbed, CreateEmbedFooter};

/// Embed colors for call notifications.
pub struct Colors;

impl Colors {
    pub const STARTED: u32 = 0x2ECC71;
    pub const ENDED: u32 = 0xE74C3C;
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: String,
}

/// A rendered call notification, independent of the Discord embed builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<Field>,
    pub footer: Option<String>,
}

impl Notification {
    fn new(title: &str, description: &str, color: u32) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            color,
            fields: Vec::new(),
            footer: None,
        }
    }

    fn field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    #[cfg(test)]
    pub(crate) fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    pub fn to_embed(&self) -> CreateEmbed {
        let mut embed = CreateEmbed::new()
            .title(&self.title)
            .description(&self.description)
            .color(self.color);

        for field in &self.fields {
            embed = embed.field(&field.name, &field.value, true);
        }

        if let Some(footer) = &self.footer {
            embed = embed.footer(CreateEmbedFooter::new(footer));
        }

        embed
    }
}

/// Build the notification for a call event. An empty footer is dropped.
pub fn render(event: &CallEvent, footer: Option<&str>) -> Notification {
    let notification = match event {
        CallEvent::Started {
            channel,
            actor,
            started_at,
        } => Notification::new("Call started", "A voice call has started.", Colors::STARTED)
            .field("Channel", &channel.name)
            .field("Started at", format_timestamp(started_at))
            .field("Started by", actor),
        CallEvent::Ended {
            channel,
            ended_at,
            duration,
            ..
        } => Notification::new("Call ended", "The voice call has ended.", Colors::ENDED)
            .field("Channel", &channel.name)
            .field("Ended at", format_timestamp(ended_at))
            .field("Duration", format_duration(*duration)),
        CallEvent::EndedUnknownDuration { channel, ended_at } => Notification::new(
            "Call ended",
            "Everyone has left the voice channel.",
            Colors::ENDED,
        )
        .field("Channel", &channel.name)
        .field("Ended at", format_timestamp(ended_at)),
    };

    Notification {
        footer: footer.filter(|f| !f.is_empty()).map(str::to_string),
        ..notification
    }
}

fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.num_seconds().max(0);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::VoiceChannel;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, h, m, s).earliest().unwrap()
    }

    fn lobby() -> VoiceChannel {
        VoiceChannel {
            id: 200,
            name: "Lobby".to_string(),
        }
    }

    #[test]
    fn test_duration_format() {
        assert_eq!(format_duration(Duration::seconds(0)), "0s");
        assert_eq!(format_duration(Duration::seconds(6)), "6s");
        assert_eq!(format_duration(Duration::seconds(245)), "4m 5s");
        assert_eq!(format_duration(Duration::seconds(3723)), "1h 2m 3s");
        assert_eq!(format_duration(Duration::seconds(-5)), "0s");
    }

    #[test]
    fn test_started_notification() {
        let event = CallEvent::Started {
            channel: lobby(),
            actor: "alice".to_string(),
            started_at: at(9, 5, 7),
        };

        let n = render(&event, Some("Join us!"));

        assert_eq!(n.title, "Call started");
        assert_eq!(n.color, Colors::STARTED);
        assert_eq!(n.field_value("Channel"), Some("Lobby"));
        assert_eq!(n.field_value("Started at"), Some("2024-05-01 09:05:07"));
        assert_eq!(n.field_value("Started by"), Some("alice"));
        assert_eq!(n.footer.as_deref(), Some("Join us!"));
    }

    #[test]
    fn test_ended_notification() {
        let event = CallEvent::Ended {
            channel: lobby(),
            started_at: at(9, 0, 0),
            ended_at: at(10, 30, 0),
            duration: Duration::seconds(5400),
        };

        let n = render(&event, None);

        assert_eq!(n.title, "Call ended");
        assert_eq!(n.color, Colors::ENDED);
        assert_eq!(n.field_value("Ended at"), Some("2024-05-01 10:30:00"));
        assert_eq!(n.field_value("Duration"), Some("1h 30m 0s"));
        assert_eq!(n.footer, None);
    }

    #[test]
    fn test_unknown_duration_has_no_duration_field() {
        let event = CallEvent::EndedUnknownDuration {
            channel: lobby(),
            ended_at: at(10, 30, 0),
        };

        let n = render(&event, Some(""));

        assert_eq!(n.description, "Everyone has left the voice channel.");
        assert_eq!(n.field_value("Channel"), Some("Lobby"));
        assert_eq!(n.field_value("Duration"), None);
        assert_eq!(n.footer, None);
    }
}
