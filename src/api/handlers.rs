use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::Json;
use axum::extract::Extension;
use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, info};

use crate::config::persist;
use crate::config::settings::SettingsHandle;
use crate::membership::registry::MachineRegistry;
use crate::membership::seeder;
use crate::membership::types::Machine;

use super::errors;
use super::protocol::{
    HEADER_MACHINE_GROUP_NAME, HEADER_MACHINE_IP, HEADER_MACHINE_NAME, HelloResponse,
    USER_AGENT_MACHINE,
};

pub async fn handle_hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// The membership listing. A request self-identifying as a fabric machine is
/// registered on the spot (passive discovery); the body is the JSON array of
/// alive machines and the response headers echo this machine's own identity
/// so the caller discovers us in the same exchange.
pub async fn handle_list(
    headers: HeaderMap,
    Extension(registry): Extension<Arc<MachineRegistry>>,
    Extension(settings): Extension<SettingsHandle>,
) -> Response {
    let settings = settings.snapshot();
    if settings.machine_ip.is_empty() {
        return errors::configuration_not_ready();
    }

    register_caller(&headers, &registry);

    let alive = registry.list_alive();

    let mut reply_headers = HeaderMap::new();
    insert_header(&mut reply_headers, HEADER_MACHINE_IP, &settings.machine_ip);
    insert_header(&mut reply_headers, HEADER_MACHINE_NAME, &settings.machine_id);
    insert_header(
        &mut reply_headers,
        HEADER_MACHINE_GROUP_NAME,
        &settings.machine_group_name,
    );

    (StatusCode::OK, reply_headers, Json(alive)).into_response()
}

pub async fn handle_get_configuration(
    Extension(settings): Extension<SettingsHandle>,
) -> Response {
    let settings = settings.snapshot();
    if settings.machine_ip.is_empty() {
        return errors::configuration_not_ready();
    }

    Json(settings).into_response()
}

/// Replaces the configuration wholesale: merge the request body over the
/// current settings, swap the shared copy, reseed the registry from the new
/// init server list, and mirror the result to disk. A persistence failure is
/// logged; the in-memory configuration stays authoritative.
pub async fn handle_set_configuration(
    Extension(registry): Extension<Arc<MachineRegistry>>,
    Extension(settings): Extension<SettingsHandle>,
    body: String,
) -> Response {
    let updated = match settings.snapshot().merged_with(&body) {
        Ok(updated) => updated,
        Err(err) => {
            error!("Cannot decode passed configuration: {}", err);
            return errors::generic_error();
        }
    };

    settings.replace(updated.clone());

    let report = seeder::reseed(&registry, &updated.init_servers);
    info!(
        "Configuration updated, reseeded {} init servers ({} rejected)",
        report.seeded, report.rejected
    );

    if let Err(err) = persist::save(&updated) {
        error!("Cannot save configuration file to disk: {}", err);
    }

    StatusCode::OK.into_response()
}

/// Passive discovery: a caller with the machine user agent and a valid
/// address header is upserted as reachable. An unparsable header is ignored.
fn register_caller(headers: &HeaderMap, registry: &MachineRegistry) {
    if header_str(headers, USER_AGENT.as_str()) != USER_AGENT_MACHINE {
        return;
    }

    let ip = header_str(headers, HEADER_MACHINE_IP);
    if !is_machine_address(ip) {
        debug!("Requestor is a machine but its address {:?} is not valid", ip);
        return;
    }

    debug!("Machine {} requested list, updating registry", ip);
    let machine = Machine::reachable(
        ip,
        header_str(headers, HEADER_MACHINE_NAME),
        header_str(headers, HEADER_MACHINE_GROUP_NAME),
    );
    if let Err(err) = registry.register_direct_contact(machine) {
        debug!("Cannot add machine {}: {}", ip, err);
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

fn is_machine_address(raw: &str) -> bool {
    raw.parse::<IpAddr>().is_ok() || raw.parse::<SocketAddr>().is_ok()
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(err) => {
            debug!("Cannot set reply header {}: {}", name, err);
        }
    }
}
