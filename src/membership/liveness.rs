//! Liveness Tracker
//!
//! Applies probe outcomes to registry entries. Each machine moves through a
//! three-state model: reachable, suspect (one or more consecutive failed
//! probes), and evicted (record removed once the dead-poll counter reaches
//! the configured threshold). A success from any state resets the machine to
//! reachable; entries created by seeding or self-registration start there.

use std::sync::Arc;

use super::registry::MachineRegistry;
use super::types::{Machine, MachineError};
use crate::config::settings::SettingsHandle;

/// Result of applying a failed probe to a machine.
#[derive(Debug, PartialEq, Eq)]
pub enum Transition {
    /// Still present; carries the dead-poll count after the increment.
    Suspect(u32),
    /// The increment reached the threshold and the record was removed.
    Evicted(u32),
    /// The address is no longer in the registry.
    Unknown,
}

pub struct LivenessTracker {
    registry: Arc<MachineRegistry>,
    settings: SettingsHandle,
}

impl LivenessTracker {
    pub fn new(registry: Arc<MachineRegistry>, settings: SettingsHandle) -> Self {
        Self { registry, settings }
    }

    /// A successful probe of `machine`: reachable again, counter reset.
    /// Creates the record if the machine was evicted while the probe was in
    /// flight.
    pub fn record_success(&self, machine: Machine) -> Result<(), MachineError> {
        self.registry.register_direct_contact(machine)
    }

    /// A failed probe of `ip`. The read-modify-write runs under the
    /// registry's lock, so concurrent outcomes for the same address never
    /// interleave.
    pub fn record_failure(&self, ip: &str) -> Transition {
        let threshold = self.settings.snapshot().eviction_threshold();

        let mut table = self.registry.table_mut();
        match table.get_mut(ip) {
            Some(machine) => {
                machine.alive = false;
                machine.dead_polls += 1;
                let dead_polls = machine.dead_polls;
                if dead_polls >= threshold {
                    table.remove(ip);
                    Transition::Evicted(dead_polls)
                } else {
                    Transition::Suspect(dead_polls)
                }
            }
            None => Transition::Unknown,
        }
    }
}
