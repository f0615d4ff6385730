//! Gossip Poller
//!
//! The recurring task that keeps the registry honest. Each cycle snapshots
//! the known addresses (minus the local machine), probes them all
//! concurrently against their listing endpoint, and applies the outcomes:
//! a reachable peer is reset and its reported membership view is merged in,
//! a failed probe pushes the peer one step closer to eviction.
//!
//! Cycles never overlap: the loop awaits the whole fan-out before sleeping
//! again, and every probe is bounded by the configured timeout, so cycle
//! latency stays bounded by the timeout rather than the peer count.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::api::protocol::{
    ENDPOINT_LIST, HEADER_MACHINE_GROUP_NAME, HEADER_MACHINE_IP, HEADER_MACHINE_NAME,
    USER_AGENT_MACHINE,
};
use crate::config::settings::SettingsHandle;

use super::liveness::{LivenessTracker, Transition};
use super::registry::MachineRegistry;
use super::types::Machine;

/// Everything a single probe needs, detached from the poller so the fan-out
/// tasks own their data.
#[derive(Clone)]
struct ProbeContext {
    client: reqwest::Client,
    local_ip: String,
    local_name: String,
    local_group: String,
    listening_port: u16,
    timeout: Duration,
}

/// A successful probe: the peer's identity echoed in its response headers,
/// plus the membership view it reported.
struct ProbeReply {
    peer_name: String,
    peer_group: String,
    reported: Vec<Machine>,
}

pub struct GossipPoller {
    registry: Arc<MachineRegistry>,
    liveness: LivenessTracker,
    settings: SettingsHandle,
    client: reqwest::Client,
}

impl GossipPoller {
    pub fn new(registry: Arc<MachineRegistry>, settings: SettingsHandle) -> Arc<Self> {
        Arc::new(Self {
            liveness: LivenessTracker::new(registry.clone(), settings.clone()),
            registry,
            settings,
            client: reqwest::Client::new(),
        })
    }

    /// Spawns the recurring poll loop and returns its handle. The loop runs
    /// for the lifetime of the process; there is no graceful drain on
    /// shutdown.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Gossip poller started");
            loop {
                let interval = self.settings.snapshot().poll_interval();
                tokio::time::sleep(interval).await;
                self.run_cycle().await;
            }
        })
    }

    /// Runs one full poll cycle. Public so tests can drive cycles
    /// deterministically without the background loop.
    pub async fn run_cycle(&self) {
        let settings = self.settings.snapshot();
        let context = ProbeContext {
            client: self.client.clone(),
            local_ip: settings.machine_ip.clone(),
            local_name: settings.machine_id.clone(),
            local_group: settings.machine_group_name.clone(),
            listening_port: settings.listening_port,
            timeout: settings.probe_timeout(),
        };

        let targets: Vec<String> = self
            .registry
            .addresses()
            .into_iter()
            .filter(|address| !is_local_address(address, &context.local_ip))
            .collect();

        if targets.is_empty() {
            debug!("No peers to probe");
            return;
        }

        debug!("Probing {} peers", targets.len());
        let mut probes = JoinSet::new();
        for address in targets {
            probes.spawn(probe_peer(context.clone(), address));
        }

        while let Some(joined) = probes.join_next().await {
            let Ok((address, outcome)) = joined else {
                continue;
            };
            match outcome {
                Ok(reply) => self.apply_success(&address, reply, &context.local_ip),
                Err(err) => self.apply_failure(&address, &err),
            }
        }
    }

    /// The probed peer is reachable: reset it, then merge its reported view.
    /// Reported machines are mentions, not reachability proofs, so their
    /// liveness counters are left alone.
    fn apply_success(&self, address: &str, reply: ProbeReply, local_ip: &str) {
        debug!(
            "Peer {} reachable, reported {} machines",
            address,
            reply.reported.len()
        );

        let peer = Machine::reachable(address, reply.peer_name, reply.peer_group);
        if let Err(err) = self.liveness.record_success(peer) {
            debug!("Cannot record success for {}: {}", address, err);
        }

        for machine in reply.reported {
            if machine.ip.is_empty() || is_local_address(&machine.ip, local_ip) {
                continue;
            }
            if let Err(err) = self.registry.record_mention(machine) {
                debug!("Cannot merge reported machine: {}", err);
            }
        }
    }

    fn apply_failure(&self, address: &str, err: &anyhow::Error) {
        match self.liveness.record_failure(address) {
            Transition::Suspect(dead_polls) => {
                warn!(
                    "Probe to {} failed ({}), dead polls now {}",
                    address, err, dead_polls
                );
            }
            Transition::Evicted(dead_polls) => {
                info!(
                    "Machine {} removed after {} consecutive dead polls",
                    address, dead_polls
                );
            }
            Transition::Unknown => {
                debug!("Probe to {} failed but it is no longer known", address);
            }
        }
    }
}

/// One bounded-time probe of `address`'s listing endpoint. Any transport
/// error, non-success status, or undecodable body makes the whole probe fail;
/// nothing is merged from a reply that does not parse completely.
async fn probe_peer(context: ProbeContext, address: String) -> (String, Result<ProbeReply>) {
    let outcome = request_listing(&context, &address).await;
    (address, outcome)
}

async fn request_listing(context: &ProbeContext, address: &str) -> Result<ProbeReply> {
    let url = listing_url(address, context.listening_port);

    let response = context
        .client
        .get(url)
        .timeout(context.timeout)
        .header(reqwest::header::USER_AGENT, USER_AGENT_MACHINE)
        .header(HEADER_MACHINE_IP, context.local_ip.as_str())
        .header(HEADER_MACHINE_NAME, context.local_name.as_str())
        .header(HEADER_MACHINE_GROUP_NAME, context.local_group.as_str())
        .send()
        .await?;

    if !response.status().is_success() {
        bail!("peer replied with status {}", response.status());
    }

    let peer_name = header_value(&response, HEADER_MACHINE_NAME);
    let peer_group = header_value(&response, HEADER_MACHINE_GROUP_NAME);
    let reported = response.json::<Vec<Machine>>().await?;

    Ok(ProbeReply {
        peer_name,
        peer_group,
        reported,
    })
}

fn header_value(response: &reqwest::Response, name: &str) -> String {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Registry keys may be bare addresses or address:port pairs; bare ones get
/// the fabric-wide listening port appended.
fn listing_url(address: &str, listening_port: u16) -> String {
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("http://[{}]:{}{}", v6, listening_port, ENDPOINT_LIST),
        Ok(_) => format!("http://{}:{}{}", address, listening_port, ENDPOINT_LIST),
        Err(_) => format!("http://{}{}", address, ENDPOINT_LIST),
    }
}

/// True when `address` is the local machine itself, with or without a port
/// suffix. The local machine never probes or records itself.
pub(crate) fn is_local_address(address: &str, local_ip: &str) -> bool {
    if local_ip.is_empty() {
        return false;
    }
    address == local_ip
        || address
            .rsplit_once(':')
            .is_some_and(|(host, port)| host == local_ip && port.parse::<u16>().is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_url_appends_port_to_bare_addresses() {
        assert_eq!(
            listing_url("10.0.0.1", 19000),
            "http://10.0.0.1:19000/list"
        );
        assert_eq!(
            listing_url("10.0.0.1:7000", 19000),
            "http://10.0.0.1:7000/list"
        );
        assert_eq!(listing_url("::1", 19000), "http://[::1]:19000/list");
    }

    #[test]
    fn local_address_matches_with_and_without_port() {
        assert!(is_local_address("10.0.0.1", "10.0.0.1"));
        assert!(is_local_address("10.0.0.1:19000", "10.0.0.1"));
        assert!(!is_local_address("10.0.0.2", "10.0.0.1"));
        assert!(!is_local_address("10.0.0.1", ""));
    }
}
