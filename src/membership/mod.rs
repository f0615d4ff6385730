//! Membership & Liveness Module
//!
//! Tracks the set of machines participating in the compute-offload fabric so
//! the load-balancing layer can route work only to currently reachable peers.
//! There is no central directory: every node maintains its own registry and
//! converges with the rest of the fabric through periodic probing and
//! anti-entropy merging of peer-reported views.
//!
//! ## Core Mechanisms
//! - **Registry**: a single mutex-guarded table of known machines keyed by
//!   address, owned exclusively by this module.
//! - **Liveness**: a "Reachable" -> "Suspect" -> "Evicted" transition model.
//!   Every failed probe increments a dead-poll counter; the record is removed
//!   once the counter reaches the configured threshold.
//! - **Gossip Polling**: each cycle probes every known peer concurrently and
//!   merges the membership list the peer reports, so knowledge of machines
//!   propagates transitively.
//! - **Bootstrap Seeding**: the registry is (re)populated from the configured
//!   init servers at startup and whenever the configuration is replaced.

pub mod liveness;
pub mod poller;
pub mod registry;
pub mod seeder;
pub mod types;
