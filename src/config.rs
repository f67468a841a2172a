use crate::error::Error;
use std::path::PathBuf;

const DEFAULT_SETTINGS_PATH: &str = "settings.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub settings_path: PathBuf,
    /// Register commands in this guild only instead of globally.
    pub guild_id: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `DISCORD_TOKEN`: bot token from the Discord Developer Portal
    ///
    /// Optional:
    /// - `SETTINGS_PATH`: per-guild settings file (default `settings.json`)
    /// - `GUILD_ID`: register slash commands in this guild only
    pub fn from_env() -> Result<Self, Error> {
        let discord_token = std::env::var("DISCORD_TOKEN")
            .map_err(|_| Error::Config("DISCORD_TOKEN environment variable is required".into()))?;

        let settings_path = std::env::var("SETTINGS_PATH")
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.into())
            .into();

        let guild_id = parse_optional_id("GUILD_ID", std::env::var("GUILD_ID").ok())?;

        Ok(Self {
            discord_token,
            settings_path,
            guild_id,
        })
    }
}

fn parse_optional_id(var: &str, value: Option<String>) -> Result<Option<u64>, Error> {
    match value {
        Some(val) if !val.trim().is_empty() => val
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .map(Some)
            .ok_or_else(|| Error::Config(format!("Invalid ID for {var}: '{val}'"))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_optional_id() {
        assert_eq!(parse_optional_id("GUILD_ID", None).unwrap(), None);
        assert_eq!(parse_optional_id("GUILD_ID", Some("".into())).unwrap(), None);
        assert_eq!(
            parse_optional_id("GUILD_ID", Some(" 1234 ".into())).unwrap(),
            Some(1234)
        );
        assert!(parse_optional_id("GUILD_ID", Some("abc".into())).is_err());
        assert!(parse_optional_id("GUILD_ID", Some("0".into())).is_err());
    }
}
