use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MachineError {
    #[error("machine address must not be empty")]
    EmptyAddress,
}

/// A known peer machine in the discovery fabric.
///
/// The `ip` field is the registry key. `dead_polls` counts consecutive failed
/// probes; it is reset to zero on every successful contact and the record is
/// removed once it reaches the configured eviction threshold.
///
/// The wire shape (field names `IP`, `Name`, `GroupName`, `Alive`,
/// `DeadPolls`) is what peers exchange on the listing endpoint. `last_update`
/// is in-memory bookkeeping only and never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    #[serde(rename = "IP")]
    pub ip: String,

    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "GroupName", default)]
    pub group_name: String,

    #[serde(rename = "Alive", default)]
    pub alive: bool,

    #[serde(rename = "DeadPolls", default)]
    pub dead_polls: u32,

    #[serde(skip)]
    pub last_update: Option<Instant>,
}

impl Machine {
    /// A machine freshly confirmed reachable through a direct contact.
    pub fn reachable(
        ip: impl Into<String>,
        name: impl Into<String>,
        group_name: impl Into<String>,
    ) -> Self {
        Self {
            ip: ip.into(),
            name: name.into(),
            group_name: group_name.into(),
            alive: true,
            dead_polls: 0,
            last_update: Some(Instant::now()),
        }
    }
}
