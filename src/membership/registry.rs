//! Machine Registry
//!
//! The authoritative in-process table of known peers, keyed by address. The
//! registry owns every `Machine` record; callers receive clone snapshots and
//! must never depend on iteration order.
//!
//! All mutations go through one mutex so no two updates to the same address
//! interleave and no reader observes a partially written record. A wholesale
//! replacement (`replace_all`, used by the bootstrap seeder) holds the lock
//! for its full duration, so a concurrent poll cycle can never observe a
//! half-cleared table.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::types::{Machine, MachineError};

pub struct MachineRegistry {
    table: Mutex<HashMap<String, Machine>>,
}

impl MachineRegistry {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn table_mut(&self) -> MutexGuard<'_, HashMap<String, Machine>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a direct contact with a machine: a successful probe, a seed
    /// entry, or a self-identifying inbound request.
    ///
    /// Inserts the machine if its address is unknown; otherwise merges the
    /// display fields into the existing record. Either way the machine comes
    /// out reachable with a zeroed dead-poll counter and a fresh
    /// `last_update`.
    pub fn register_direct_contact(&self, machine: Machine) -> Result<(), MachineError> {
        if machine.ip.is_empty() {
            return Err(MachineError::EmptyAddress);
        }

        let mut table = self.table_mut();
        match table.get_mut(&machine.ip) {
            Some(existing) => {
                existing.name = machine.name;
                existing.group_name = machine.group_name;
                existing.alive = true;
                existing.dead_polls = 0;
                existing.last_update = Some(Instant::now());
            }
            None => {
                let mut machine = machine;
                machine.alive = true;
                machine.dead_polls = 0;
                machine.last_update = Some(Instant::now());
                table.insert(machine.ip.clone(), machine);
            }
        }

        Ok(())
    }

    /// Records a machine mentioned inside another peer's reported view.
    ///
    /// A mention is informational discovery, not a reachability proof: a new
    /// address is inserted as reported, but for an existing record only the
    /// display fields and `last_update` are refreshed. The liveness counters
    /// of the existing record are never overwritten by a mention.
    pub fn record_mention(&self, machine: Machine) -> Result<(), MachineError> {
        if machine.ip.is_empty() {
            return Err(MachineError::EmptyAddress);
        }

        let mut table = self.table_mut();
        match table.get_mut(&machine.ip) {
            Some(existing) => {
                existing.name = machine.name;
                existing.group_name = machine.group_name;
                existing.last_update = Some(Instant::now());
            }
            None => {
                let mut machine = machine;
                machine.last_update = Some(Instant::now());
                table.insert(machine.ip.clone(), machine);
            }
        }

        Ok(())
    }

    /// Idempotent; removing an unknown address is a no-op.
    pub fn remove(&self, ip: &str) {
        self.table_mut().remove(ip);
    }

    pub fn remove_all(&self) {
        self.table_mut().clear();
    }

    /// Clears the table and inserts the given machines in one critical
    /// section. Used by the bootstrap seeder so a reseed is atomic with
    /// respect to concurrent probes and inbound registrations.
    pub(crate) fn replace_all(&self, machines: Vec<Machine>) {
        let mut table = self.table_mut();
        table.clear();
        for machine in machines {
            table.insert(machine.ip.clone(), machine);
        }
    }

    pub fn get(&self, ip: &str) -> Option<Machine> {
        self.table_mut().get(ip).cloned()
    }

    /// All machines currently considered reachable, in no guaranteed order.
    pub fn list_alive(&self) -> Vec<Machine> {
        self.table_mut()
            .values()
            .filter(|machine| machine.alive)
            .cloned()
            .collect()
    }

    /// Snapshot of every known address, alive or suspect.
    pub fn addresses(&self) -> Vec<String> {
        self.table_mut().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.table_mut().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table_mut().is_empty()
    }
}

impl Default for MachineRegistry {
    fn default() -> Self {
        Self::new()
    }
}
