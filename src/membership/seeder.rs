//! Bootstrap Seeder
//!
//! (Re)populates the registry from the statically configured init servers.
//! Runs once at startup and again whenever the configuration is replaced
//! wholesale. Seeded machines start reachable and stay that way until the
//! next poll cycle proves otherwise.

use std::net::{IpAddr, SocketAddr};

use tracing::{debug, info, warn};

use super::registry::MachineRegistry;
use super::types::Machine;

/// Outcome of one seeding pass, reported to the operator.
#[derive(Debug, PartialEq, Eq)]
pub struct SeedReport {
    pub seeded: usize,
    pub rejected: usize,
}

/// Clears the registry and seeds it from `init_servers`. Entries that do not
/// parse as a network address are skipped and counted, never fatal. The clear
/// and the inserts happen in one critical section, so concurrent pollers and
/// inbound registrations never observe a half-cleared table.
pub fn reseed(registry: &MachineRegistry, init_servers: &[String]) -> SeedReport {
    let mut machines = Vec::new();
    let mut rejected = 0;

    for entry in init_servers {
        match parse_seed_address(entry) {
            Some(address) => {
                debug!("Added {} as init server", address);
                machines.push(Machine::reachable(address, "", ""));
            }
            None => {
                warn!("Could not add {} as init server: not a valid address", entry);
                rejected += 1;
            }
        }
    }

    let seeded = machines.len();
    registry.replace_all(machines);

    info!(
        "Init registry with {} init servers ({} rejected)",
        seeded, rejected
    );
    SeedReport { seeded, rejected }
}

/// Accepts a bare address ("10.0.0.1") or an address:port pair
/// ("10.0.0.1:19000").
fn parse_seed_address(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.parse::<IpAddr>().is_ok() || trimmed.parse::<SocketAddr>().is_ok() {
        Some(trimmed.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_and_socket_addresses() {
        assert_eq!(
            parse_seed_address(" 10.0.0.1 "),
            Some("10.0.0.1".to_string())
        );
        assert_eq!(
            parse_seed_address("10.0.0.1:19000"),
            Some("10.0.0.1:19000".to_string())
        );
        assert_eq!(parse_seed_address("::1"), Some("::1".to_string()));
        assert_eq!(parse_seed_address("not-an-ip"), None);
        assert_eq!(parse_seed_address(""), None);
    }
}
