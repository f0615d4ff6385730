use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Extension;
use axum::routing::get;
use axum::Router;

use fog_discovery::api::handlers::{
    handle_get_configuration, handle_hello, handle_list, handle_set_configuration,
};
use fog_discovery::api::protocol::{ENDPOINT_CONFIGURATION, ENDPOINT_HELLO, ENDPOINT_LIST};
use fog_discovery::config;
use fog_discovery::config::settings::SettingsHandle;
use fog_discovery::membership::poller::GossipPoller;
use fog_discovery::membership::registry::MachineRegistry;
use fog_discovery::membership::seeder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // 1. Configuration:
    let settings = config::bootstrap();
    tracing::info!(
        "Starting in {} environment as {} ({})",
        settings.running_environment,
        settings.machine_id,
        settings.machine_ip
    );
    let listening_port = settings.listening_port;
    let settings = SettingsHandle::new(settings);

    // 2. Membership registry, seeded from the configured init servers:
    let registry = Arc::new(MachineRegistry::new());
    seeder::reseed(&registry, &settings.snapshot().init_servers);

    // 3. HTTP router:
    let app = Router::new()
        .route(ENDPOINT_HELLO, get(handle_hello))
        .route(ENDPOINT_LIST, get(handle_list))
        .route(
            ENDPOINT_CONFIGURATION,
            get(handle_get_configuration).post(handle_set_configuration),
        )
        .layer(Extension(registry.clone()))
        .layer(Extension(settings.clone()));

    // 4. Gossip poller:
    let poller = GossipPoller::new(registry, settings);
    poller.start();

    // 5. HTTP server; failing to bind is the one fatal error:
    let addr = SocketAddr::from(([0, 0, 0, 0], listening_port));
    tracing::info!("Started listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
