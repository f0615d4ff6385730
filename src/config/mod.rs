//! Runtime Configuration
//!
//! Settings for the discovery service: the local machine identity, the init
//! server list, and the poll/eviction tunables. Settings live in memory
//! behind a shared handle and are mirrored to a JSON file on disk; the
//! in-memory copy stays authoritative when persistence fails.

pub mod persist;
pub mod settings;


use self::settings::Settings;

/// Loads the configuration at process start. Falls back to defaults when the
/// file is missing or unreadable, autodetects the machine address when none
/// is configured, and writes the default file back so operators have
/// something to edit.
pub fn bootstrap() -> Settings {
    let (mut settings, from_file) = persist::load();
    settings.normalize();

    if !from_file {
        tracing::info!("Configuration file not present, creating");
        if let Err(err) = persist::save(&settings) {
            tracing::error!("Cannot save configuration file to disk: {}", err);
        }
    }

    settings
}
