// Registration tests against a fake Consul agent capturing what the harness
// sends over the agent HTTP API.
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::put,
};
use serde_json::Value;
use wicket::{adapters::ConsulRegistry, config::models::RegistryConfig};

#[derive(Clone, Default)]
struct AgentState {
    registrations: Arc<Mutex<Vec<Value>>>,
    deregistrations: Arc<Mutex<Vec<String>>>,
}

async fn spawn_fake_agent() -> (SocketAddr, AgentState) {
    let state = AgentState::default();

    let app = Router::new()
        .route(
            "/v1/agent/service/register",
            put(
                |State(state): State<AgentState>, Json(payload): Json<Value>| async move {
                    state.registrations.lock().unwrap().push(payload);
                    "OK"
                },
            ),
        )
        .route(
            "/v1/agent/service/deregister/{id}",
            put(
                |State(state): State<AgentState>, Path(id): Path<String>| async move {
                    state.deregistrations.lock().unwrap().push(id);
                    "OK"
                },
            ),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

fn registry_config(agent: SocketAddr) -> RegistryConfig {
    RegistryConfig {
        address: format!("http://{agent}"),
        service_name: "app".to_string(),
        service_address: Some("10.0.0.7".to_string()),
        service_port: 80,
        check_host: Some("app.internal".to_string()),
        check_interval: "1s".to_string(),
        check_timeout: "100ms".to_string(),
        check_paths: vec!["/info/health".to_string(), "/info/header".to_string()],
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn registers_service_with_checks() {
    let (agent, state) = spawn_fake_agent().await;
    let registry = ConsulRegistry::from_config(&registry_config(agent))
        .unwrap()
        .expect("registry should be configured");

    // The payload is fully built before anything is sent.
    assert_eq!(registry.registration().id, "app@10.0.0.7:80");
    assert_eq!(registry.registration().checks.len(), 2);

    registry.register().await.unwrap();

    let registrations = state.registrations.lock().unwrap();
    assert_eq!(registrations.len(), 1);

    let payload = &registrations[0];
    assert_eq!(payload["ID"], "app@10.0.0.7:80");
    assert_eq!(payload["Name"], "app");
    assert_eq!(payload["Address"], "10.0.0.7");
    assert_eq!(payload["Port"], 80);

    let checks = payload["Checks"].as_array().unwrap();
    assert_eq!(checks.len(), 2);
    assert_eq!(checks[0]["HTTP"], "http://10.0.0.7:80/info/health");
    assert_eq!(checks[0]["Method"], "GET");
    assert_eq!(checks[0]["Interval"], "1s");
    assert_eq!(checks[0]["Timeout"], "100ms");
    assert_eq!(checks[0]["Header"]["Host"][0], "app.internal");
    assert_eq!(checks[1]["HTTP"], "http://10.0.0.7:80/info/header");

    // Registration clears any stale entry under the same id first.
    let deregistrations = state.deregistrations.lock().unwrap();
    assert_eq!(deregistrations.as_slice(), ["app@10.0.0.7:80"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn deregisters_service_by_id() {
    let (agent, state) = spawn_fake_agent().await;
    let registry = ConsulRegistry::from_config(&registry_config(agent))
        .unwrap()
        .expect("registry should be configured");

    registry.register().await.unwrap();
    registry.deregister().await.unwrap();

    let deregistrations = state.deregistrations.lock().unwrap();
    // One pre-registration sweep plus the explicit deregister.
    assert_eq!(deregistrations.len(), 2);
    assert!(deregistrations.iter().all(|id| id == "app@10.0.0.7:80"));
}

#[tokio::test(flavor = "multi_thread")]
async fn registration_failure_is_an_error_not_a_panic() {
    // Nothing listens on this port; reqwest should fail to connect.
    let config = RegistryConfig {
        address: "http://127.0.0.1:1".to_string(),
        ..registry_config("127.0.0.1:1".parse().unwrap())
    };
    let registry = ConsulRegistry::from_config(&config).unwrap().unwrap();

    assert!(registry.register().await.is_err());
}
