//! Configuration file persistence. The on-disk copy is a convenience for
//! operators; when it cannot be read or written the in-memory settings stay
//! authoritative and the service keeps running.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{error, info};

use super::settings::Settings;

pub const DATA_PATH: &str = "/data";
pub const ENV_DATA_PATH: &str = "FOG_DISCOVERY_DATA_PATH";
pub const CONFIGURATION_FILE_NAME: &str = "fog-discovery.json";

fn data_path() -> PathBuf {
    std::env::var(ENV_DATA_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DATA_PATH))
}

pub fn config_file_path() -> PathBuf {
    data_path().join(CONFIGURATION_FILE_NAME)
}

/// Reads the configuration file. Returns the settings plus whether they
/// actually came from the file; a missing or undecodable file yields
/// defaults.
pub fn load() -> (Settings, bool) {
    let path = config_file_path();
    match load_from(&path) {
        Ok(settings) => {
            info!("Loaded configuration file from {}", path.display());
            (settings, true)
        }
        Err(err) => {
            info!(
                "Cannot read configuration file at {}: {}",
                path.display(),
                err
            );
            (Settings::default(), false)
        }
    }
}

pub fn load_from(path: &Path) -> Result<Settings> {
    let raw = fs::read_to_string(path)?;
    let settings = serde_json::from_str(&raw)?;
    Ok(settings)
}

pub fn save(settings: &Settings) -> Result<()> {
    save_to(&config_file_path(), settings)
}

pub fn save_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let rendered = serde_json::to_string_pretty(settings)?;
    if let Err(err) = fs::write(path, &rendered) {
        error!(
            "Cannot save configuration to file {}: {}",
            path.display(),
            err
        );
        return Err(err.into());
    }

    Ok(())
}
