//! Per-guild notification settings backed by a single JSON file.
//!
//! The whole registry is rewritten on every mutation. There is no locking or
//! schema version; the file is a flat object keyed by guild ID.

use crate::error::Error;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Maximum length of the footer message, in characters.
pub const MAX_ADDITIONAL_MESSAGE_LEN: usize = 200;

/// Settings for one guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSettings {
    /// Text channel receiving call notifications
    #[serde(deserialize_with = "deserialize_channel_id")]
    pub text_channel_id: u64,
    /// Footer attached to every notification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_message: Option<String>,
}

impl GuildSettings {
    pub fn new(text_channel_id: u64) -> Self {
        Self {
            text_channel_id,
            additional_message: None,
        }
    }

    /// The footer text, if there is anything to show.
    pub fn footer(&self) -> Option<&str> {
        self.additional_message
            .as_deref()
            .filter(|message| !message.is_empty())
    }
}

/// Older files store the channel as a decimal string.
fn deserialize_channel_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ChannelIdRepr {
        Int(u64),
        Str(String),
    }

    match ChannelIdRepr::deserialize(deserializer)? {
        ChannelIdRepr::Int(id) => Ok(id),
        ChannelIdRepr::Str(raw) => raw.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("invalid text_channel_id '{raw}'"))
        }),
    }
}

/// Guild ID to settings, at most one entry per guild.
pub type SettingsRegistry = BTreeMap<u64, GuildSettings>;

pub struct SettingsStore {
    path: PathBuf,
    registry: SettingsRegistry,
}

impl SettingsStore {
    /// Load the registry from `path`. A missing file yields an empty registry;
    /// anything unreadable or unparsable is an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();

        let registry = match fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str::<SettingsRegistry>(&data).map_err(|source| {
                Error::SettingsFileCorrupt {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No settings file found, starting empty");
                SettingsRegistry::new()
            }
            Err(source) => return Err(Error::SettingsIo { path, source }),
        };

        info!(path = %path.display(), guilds = registry.len(), "Loaded guild settings");

        Ok(Self { path, registry })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn registry(&self) -> &SettingsRegistry {
        &self.registry
    }

    pub fn get(&self, guild_id: u64) -> Option<&GuildSettings> {
        self.registry.get(&guild_id)
    }

    /// Write the full registry, replacing the backing file.
    pub fn save(&self) -> Result<(), Error> {
        write_registry(&self.path, &self.registry).map_err(|source| Error::SettingsIo {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), guilds = self.registry.len(), "Saved guild settings");
        Ok(())
    }

    /// Register a guild that just added the bot. Without a default channel the
    /// guild stays unregistered and `false` is returned.
    pub fn register_guild(
        &mut self,
        guild_id: u64,
        default_channel_id: Option<u64>,
    ) -> Result<bool, Error> {
        let Some(channel_id) = default_channel_id else {
            return Ok(false);
        };

        self.registry.insert(guild_id, GuildSettings::new(channel_id));
        self.save()?;
        Ok(true)
    }

    pub fn set_target_channel(&mut self, guild_id: u64, channel_id: u64) -> Result<(), Error> {
        let settings = self
            .registry
            .get_mut(&guild_id)
            .ok_or(Error::UnknownGuild(guild_id))?;
        settings.text_channel_id = channel_id;
        self.save()
    }

    pub fn set_additional_message(&mut self, guild_id: u64, message: &str) -> Result<(), Error> {
        let len = message.chars().count();
        if len > MAX_ADDITIONAL_MESSAGE_LEN {
            return Err(Error::MessageTooLong {
                len,
                max: MAX_ADDITIONAL_MESSAGE_LEN,
            });
        }

        let settings = self
            .registry
            .get_mut(&guild_id)
            .ok_or(Error::UnknownGuild(guild_id))?;
        settings.additional_message = Some(message.to_string());
        self.save()
    }
}

fn write_registry(path: &Path, registry: &SettingsRegistry) -> io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let file = File::create(&tmp_path)?;
    let mut writer = BufWriter::new(file);

    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    registry
        .serialize(&mut serializer)
        .map_err(io::Error::other)?;
    writer.write_all(b"\n")?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SettingsStore {
        SettingsStore::load(dir.path().join("settings.json")).unwrap()
    }

    #[test]
    fn test_missing_file_is_empty_registry() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.registry().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_corrupt_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let err = SettingsStore::load(&path).err().unwrap();
        assert!(matches!(err, Error::SettingsFileCorrupt { .. }));
    }

    #[test]
    fn test_register_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        assert!(store.register_guild(1, Some(100)).unwrap());
        assert!(store.register_guild(2, Some(200)).unwrap());
        store.set_additional_message(2, "see you at 9").unwrap();

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.registry(), store.registry());
        assert_eq!(reloaded.get(1), Some(&GuildSettings::new(100)));
        assert_eq!(
            reloaded.get(2).unwrap().additional_message.as_deref(),
            Some("see you at 9")
        );
    }

    #[test]
    fn test_register_without_channel_leaves_guild_unregistered() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        assert!(!store.register_guild(1, None).unwrap());
        assert!(store.get(1).is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_register_overwrites_existing_entry() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        store.register_guild(1, Some(100)).unwrap();
        store.set_additional_message(1, "hello").unwrap();
        store.register_guild(1, Some(101)).unwrap();

        assert_eq!(store.get(1), Some(&GuildSettings::new(101)));
    }

    #[test]
    fn test_set_channel_unknown_guild() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.register_guild(1, Some(100)).unwrap();
        let before = store.registry().clone();

        let err = store.set_target_channel(9, 300).unwrap_err();
        assert!(matches!(err, Error::UnknownGuild(9)));
        assert_eq!(store.registry(), &before);
    }

    #[test]
    fn test_set_channel_persists() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.register_guild(1, Some(100)).unwrap();

        store.set_target_channel(1, 300).unwrap();

        assert_eq!(store_in(&dir).get(1).unwrap().text_channel_id, 300);
    }

    #[test]
    fn test_message_length_limit() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.register_guild(1, Some(100)).unwrap();
        store.set_additional_message(1, "original").unwrap();

        let too_long = "a".repeat(201);
        let err = store.set_additional_message(1, &too_long).unwrap_err();
        assert!(matches!(err, Error::MessageTooLong { len: 201, max: 200 }));
        assert_eq!(
            store_in(&dir).get(1).unwrap().additional_message.as_deref(),
            Some("original")
        );

        let exact = "あ".repeat(200);
        store.set_additional_message(1, &exact).unwrap();
        assert_eq!(store.get(1).unwrap().additional_message.as_deref(), Some(exact.as_str()));
    }

    #[test]
    fn test_message_length_checked_before_guild() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        let err = store.set_additional_message(5, &"a".repeat(201)).unwrap_err();
        assert!(matches!(err, Error::MessageTooLong { .. }));

        let err = store.set_additional_message(5, "short").unwrap_err();
        assert!(matches!(err, Error::UnknownGuild(5)));
    }

    #[test]
    fn test_reads_string_channel_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{
    "111": {"text_channel_id": 100},
    "222": {"text_channel_id": "200", "additional_message": "hi"}
}"#,
        )
        .unwrap();

        let store = SettingsStore::load(&path).unwrap();
        assert_eq!(store.get(111).unwrap().text_channel_id, 100);
        assert_eq!(store.get(222).unwrap().text_channel_id, 200);
        assert_eq!(store.get(222).unwrap().footer(), Some("hi"));
    }

    #[test]
    fn test_file_layout() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.register_guild(7, Some(70)).unwrap();

        let written = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            written,
            "{\n    \"7\": {\n        \"text_channel_id\": 70\n    }\n}\n"
        );
    }

    #[test]
    fn test_empty_footer_is_hidden() {
        let mut settings = GuildSettings::new(1);
        assert_eq!(settings.footer(), None);
        settings.additional_message = Some(String::new());
        assert_eq!(settings.footer(), None);
    }
}
