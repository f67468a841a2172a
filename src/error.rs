use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No settings registered for guild {0}")]
    UnknownGuild(u64),

    #[error("Additional message is {len} characters long, the limit is {max}")]
    MessageTooLong { len: usize, max: usize },

    #[error("Settings file {} is corrupt: {source}", .path.display())]
    SettingsFileCorrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to access settings file {}: {source}", .path.display())]
    SettingsIo { path: PathBuf, source: io::Error },

    #[error("Target channel {channel_id} of guild {guild_id} is not available")]
    MissingTargetChannel { guild_id: u64, channel_id: u64 },

    #[error("Invalid channel ID: '{0}'")]
    InvalidChannelId(String),

    #[error("This command must be used in a server")]
    GuildOnly,

    #[error("Discord API error: {0}")]
    Discord(#[from] Box<serenity::Error>),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serenity::Error> for Error {
    fn from(err: serenity::Error) -> Self {
        Error::Discord(Box::new(err))
    }
}

impl Error {
    /// Reply text shown to the user who invoked a failing command.
    pub fn user_message(&self) -> String {
        match self {
            Error::UnknownGuild(_) => "No settings were found for this server.".to_string(),
            Error::MessageTooLong { max, .. } => {
                format!("The message must be {max} characters or fewer.")
            }
            Error::InvalidChannelId(raw) => format!("`{raw}` is not a valid channel ID."),
            Error::GuildOnly => "This command can only be used in a server.".to_string(),
            Error::SettingsIo { .. } => {
                "Failed to save the settings. Please try again later.".to_string()
            }
            Error::Discord(_) => "Failed to communicate with Discord. Please try again.".to_string(),
            _ => "Something went wrong. Please try again later.".to_string(),
        }
    }
}
