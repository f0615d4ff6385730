use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

pub const DEFAULT_LISTENING_PORT: u16 = 19000;
/// Seconds between gossip poll cycles.
pub const DEFAULT_POLL_TIME: u64 = 120;
/// Seconds before an outbound probe gives up.
pub const DEFAULT_POLL_TIMEOUT: u64 = 5;
/// Consecutive dead polls after which a machine is removed.
pub const DEFAULT_DEAD_POLLS_EVICTION_THRESHOLD: u32 = 20;

pub const ENV_RUNNING_ENVIRONMENT: &str = "FOG_DISCOVERY_ENV";
pub const RUNNING_ENVIRONMENT_PRODUCTION: &str = "production";
pub const RUNNING_ENVIRONMENT_DEVELOPMENT: &str = "development";

/// The full configuration of one discovery node.
///
/// Serialized as the on-disk configuration file and on the configuration
/// endpoint. Every field has a default, so a partial file (or a partial
/// replacement request) only overrides what it names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address this machine advertises to peers. Autodetected when empty.
    pub machine_ip: String,
    /// Display identifier, derived from the address when not configured.
    pub machine_id: String,
    pub machine_group_name: String,
    /// Seed addresses used to (re)populate the registry.
    pub init_servers: Vec<String>,
    pub poll_time: u64,
    pub poll_timeout: u64,
    pub listening_port: u16,
    pub dead_polls_eviction_threshold: u32,
    pub running_environment: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            machine_ip: String::new(),
            machine_id: String::new(),
            machine_group_name: String::new(),
            init_servers: Vec::new(),
            poll_time: DEFAULT_POLL_TIME,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            listening_port: DEFAULT_LISTENING_PORT,
            dead_polls_eviction_threshold: DEFAULT_DEAD_POLLS_EVICTION_THRESHOLD,
            running_environment: String::new(),
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_time.max(1))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout.max(1))
    }

    pub fn eviction_threshold(&self) -> u32 {
        self.dead_polls_eviction_threshold.max(1)
    }

    /// Fills the fields a configuration file may legitimately leave out: the
    /// running environment (from the environment variable, defaulting to
    /// development), the machine address (autodetected from the local
    /// interfaces), and the machine id (derived from the address).
    pub fn normalize(&mut self) {
        if self.running_environment != RUNNING_ENVIRONMENT_PRODUCTION
            && self.running_environment != RUNNING_ENVIRONMENT_DEVELOPMENT
        {
            self.running_environment = std::env::var(ENV_RUNNING_ENVIRONMENT)
                .ok()
                .filter(|env| {
                    env == RUNNING_ENVIRONMENT_PRODUCTION || env == RUNNING_ENVIRONMENT_DEVELOPMENT
                })
                .unwrap_or_else(|| RUNNING_ENVIRONMENT_DEVELOPMENT.to_string());
        }

        if self.machine_ip.is_empty() {
            match local_ip_address::local_ip() {
                Ok(ip) => {
                    self.machine_ip = ip.to_string();
                    tracing::info!("Detected local machine address: {}", self.machine_ip);
                }
                Err(err) => {
                    tracing::warn!("Cannot detect local machine address: {}", err);
                }
            }
        }

        if self.machine_id.is_empty() && !self.machine_ip.is_empty() {
            self.machine_id = format!("fog-{}", self.machine_ip);
        }
    }

    /// Shallow-merges a JSON replacement request over these settings: every
    /// top-level field present in `patch` wins, everything else is kept.
    /// A body that is not a JSON object is rejected.
    pub fn merged_with(&self, patch: &str) -> Result<Settings, serde_json::Error> {
        let patch: serde_json::Map<String, serde_json::Value> = serde_json::from_str(patch)?;

        let mut base = serde_json::to_value(self)?;
        if let serde_json::Value::Object(base_map) = &mut base {
            for (key, value) in patch {
                base_map.insert(key, value);
            }
        }

        serde_json::from_value(base)
    }
}

/// Shared, replaceable view of the settings. Readers take short clone
/// snapshots; a configuration replacement swaps the whole value.
#[derive(Clone)]
pub struct SettingsHandle {
    inner: Arc<RwLock<Settings>>,
}

impl SettingsHandle {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub fn snapshot(&self) -> Settings {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, settings: Settings) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }
}
