pub mod command;
pub mod config;
pub mod error;
pub mod events;
pub mod notify;
pub mod permissions;
pub mod session;
pub mod settings;

use events::ReadyGate;
use session::CallSessionTracker;
use settings::SettingsStore;
use tokio::sync::Mutex;

/// Shared state for commands and event handlers.
pub struct Data {
    pub settings: Mutex<SettingsStore>,
    pub sessions: Mutex<CallSessionTracker>,
    pub ready: ReadyGate,
    pub config: config::Config,
}

impl Data {
    pub fn new(config: config::Config, settings: SettingsStore) -> Self {
        Self {
            settings: Mutex::new(settings),
            sessions: Mutex::new(CallSessionTracker::new()),
            ready: ReadyGate::default(),
            config,
        }
    }
}

pub type Error = error::Error;
pub type Context<'a> = poise::Context<'a, Data, Error>;
