//! Discovery Wire Protocol
//!
//! Endpoint paths, the self-identification headers machines attach to their
//! requests, and the DTOs exchanged over HTTP.
//!
//! A machine probing a peer (or asking it for the membership list) sets the
//! `Machine` user agent plus the three identity headers; the responder uses
//! them to discover the caller, and echoes its own identity back under the
//! same header names. Discovery is therefore mutual: one exchange teaches
//! both sides about each other.

use serde::{Deserialize, Serialize};

/// User-Agent value that marks a request as coming from a fabric machine.
pub const USER_AGENT_MACHINE: &str = "Machine";

/// Header carrying the sender's advertised address.
pub const HEADER_MACHINE_IP: &str = "fog-machine-ip";
/// Header carrying the sender's display identifier.
pub const HEADER_MACHINE_NAME: &str = "fog-machine-name";
/// Header carrying the sender's group.
pub const HEADER_MACHINE_GROUP_NAME: &str = "fog-machine-group-name";

// --- API Endpoints ---

/// Hello banner.
pub const ENDPOINT_HELLO: &str = "/";
/// Membership listing; also the passive-discovery entry point and the target
/// of outbound probes.
pub const ENDPOINT_LIST: &str = "/list";
/// Runtime configuration, readable and replaceable.
pub const ENDPOINT_CONFIGURATION: &str = "/configuration";

// --- Data Transfer Objects ---

/// Body of the hello banner.
#[derive(Debug, Serialize, Deserialize)]
pub struct HelloResponse {
    pub service: String,
    pub version: String,
}
