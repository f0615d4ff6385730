//! HTTP API Tests
//!
//! Exercises the listing and configuration endpoints over real loopback
//! listeners, the way peers and operators reach them.

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Router;
    use axum::extract::Extension;
    use axum::routing::get;

    use crate::api::errors::{ERROR_CONFIGURATION_NOT_READY, ErrorReply};
    use crate::api::handlers::{
        handle_get_configuration, handle_hello, handle_list, handle_set_configuration,
    };
    use crate::api::protocol::{
        HEADER_MACHINE_GROUP_NAME, HEADER_MACHINE_IP, HEADER_MACHINE_NAME, HelloResponse,
        USER_AGENT_MACHINE,
    };
    use crate::config::persist;
    use crate::config::settings::{Settings, SettingsHandle};
    use crate::membership::registry::MachineRegistry;
    use crate::membership::types::Machine;

    static TEMP_DIR_SEQ: AtomicUsize = AtomicUsize::new(0);

    fn configured_settings() -> SettingsHandle {
        SettingsHandle::new(Settings {
            machine_ip: "10.0.0.250".to_string(),
            machine_id: "fog-10.0.0.250".to_string(),
            machine_group_name: "edge".to_string(),
            ..Settings::default()
        })
    }

    async fn serve(registry: Arc<MachineRegistry>, settings: SettingsHandle) -> SocketAddr {
        let app = Router::new()
            .route("/", get(handle_hello))
            .route("/list", get(handle_list))
            .route(
                "/configuration",
                get(handle_get_configuration).post(handle_set_configuration),
            )
            .layer(Extension(registry))
            .layer(Extension(settings));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn hello_reports_service_and_version() {
        let addr = serve(Arc::new(MachineRegistry::new()), configured_settings()).await;

        let hello: HelloResponse = reqwest::get(format!("http://{}/", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(hello.service, env!("CARGO_PKG_NAME"));
        assert_eq!(hello.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn list_registers_machine_caller_and_echoes_identity() {
        let registry = Arc::new(MachineRegistry::new());
        registry
            .register_direct_contact(Machine::reachable("10.0.0.1", "seed", ""))
            .unwrap();
        let addr = serve(registry.clone(), configured_settings()).await;

        let client = reqwest::Client::new();
        let request = || {
            client
                .get(format!("http://{}/list", addr))
                .header(reqwest::header::USER_AGENT, USER_AGENT_MACHINE)
                .header(HEADER_MACHINE_IP, "10.9.9.9")
                .header(HEADER_MACHINE_NAME, "caller-9")
                .header(HEADER_MACHINE_GROUP_NAME, "edge")
        };

        let response = request().send().await.unwrap();
        assert!(response.status().is_success());

        // The responder's identity comes back in the reply headers.
        assert_eq!(
            response.headers().get(HEADER_MACHINE_IP).unwrap(),
            "10.0.0.250"
        );
        assert_eq!(
            response.headers().get(HEADER_MACHINE_NAME).unwrap(),
            "fog-10.0.0.250"
        );

        let listed: Vec<Machine> = response.json().await.unwrap();
        assert!(listed.iter().all(|machine| machine.alive));

        // Passive discovery picked the caller up.
        let caller = registry.get("10.9.9.9").unwrap();
        assert!(caller.alive);
        assert_eq!(caller.name, "caller-9");

        // Repeating the request updates in place, no duplicate entry.
        request().send().await.unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn list_ignores_callers_without_machine_identity() {
        let registry = Arc::new(MachineRegistry::new());
        let addr = serve(registry.clone(), configured_settings()).await;
        let client = reqwest::Client::new();

        // Plain client: no registration.
        client
            .get(format!("http://{}/list", addr))
            .send()
            .await
            .unwrap();
        assert!(registry.is_empty());

        // Machine user agent but an address header that does not parse.
        client
            .get(format!("http://{}/list", addr))
            .header(reqwest::header::USER_AGENT, USER_AGENT_MACHINE)
            .header(HEADER_MACHINE_IP, "not-an-address")
            .send()
            .await
            .unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn list_fails_fast_without_machine_address() {
        let registry = Arc::new(MachineRegistry::new());
        let addr = serve(registry, SettingsHandle::new(Settings::default())).await;

        let response = reqwest::get(format!("http://{}/list", addr)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

        let reply: ErrorReply = response.json().await.unwrap();
        assert_eq!(reply.code, ERROR_CONFIGURATION_NOT_READY);
    }

    #[tokio::test]
    async fn configuration_roundtrip_reseeds_and_persists() {
        let data_dir = std::env::temp_dir().join(format!(
            "fog-discovery-test-{}-{}",
            std::process::id(),
            TEMP_DIR_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        // SAFETY: test-only; the variable is process-wide but only the
        // persistence paths read it.
        unsafe {
            std::env::set_var(persist::ENV_DATA_PATH, &data_dir);
        }

        let registry = Arc::new(MachineRegistry::new());
        registry
            .register_direct_contact(Machine::reachable("172.16.0.9", "stale", ""))
            .unwrap();
        let settings = configured_settings();
        let addr = serve(registry.clone(), settings.clone()).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("http://{}/configuration", addr))
            .body(r#"{"init_servers": ["10.0.0.7"], "poll_time": 30}"#)
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());

        // Merge kept the untouched fields and replaced the named ones.
        let updated = settings.snapshot();
        assert_eq!(updated.machine_ip, "10.0.0.250");
        assert_eq!(updated.poll_time, 30);
        assert_eq!(updated.init_servers, vec!["10.0.0.7".to_string()]);

        // Registry reseeded from the new init servers only.
        assert_eq!(registry.len(), 1);
        assert!(registry.get("10.0.0.7").is_some());
        assert!(registry.get("172.16.0.9").is_none());

        // And the file made it to disk.
        let persisted = persist::load_from(&data_dir.join(persist::CONFIGURATION_FILE_NAME));
        assert_eq!(persisted.unwrap().poll_time, 30);

        // A body that is not valid json is rejected and changes nothing.
        let response = client
            .post(format!("http://{}/configuration", addr))
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            reqwest::StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(settings.snapshot().poll_time, 30);
    }

    #[tokio::test]
    async fn configuration_read_requires_machine_address() {
        let registry = Arc::new(MachineRegistry::new());
        let addr = serve(registry, SettingsHandle::new(Settings::default())).await;

        let response = reqwest::get(format!("http://{}/configuration", addr))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    }
}
