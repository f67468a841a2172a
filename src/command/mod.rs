pub mod add_message;
pub mod set_channel;
pub mod show_settings;

pub use add_message::add_message;
pub use set_channel::set_channel;
pub use show_settings::show_settings;

/// Every command the framework registers.
pub fn all() -> Vec<poise::Command<crate::Data, crate::Error>> {
    vec![set_channel(), add_message(), show_settings()]
}
