//! Diagnostic endpoints for the sample backend.
//!
//! Three read-only endpoints make proxy behavior observable from the outside:
//! the headers the backend actually received (the interesting one when the
//! gateway rewrites `Host`), the process environment, and a liveness payload.
use std::collections::BTreeMap;

use axum::{Json, Router, http::HeaderMap, routing::get};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

/// Build the diagnostics router.
pub fn router() -> Router {
    Router::new()
        .route("/info/header", get(get_header))
        .route("/info/env", get(get_env))
        .route("/info/health", get(get_health))
        .layer(TraceLayer::new_for_http())
}

/// Echo the inbound request headers as a JSON object (header name → values).
async fn get_header(headers: HeaderMap) -> Json<BTreeMap<String, Vec<String>>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        tracing::info!("{}::\t{}", name, value);
        map.entry(name.as_str().to_string()).or_default().push(value);
    }
    Json(map)
}

/// Dump the process environment variables.
async fn get_env() -> Json<BTreeMap<String, String>> {
    let vars: BTreeMap<String, String> = std::env::vars().collect();
    for (key, value) in &vars {
        tracing::info!("{}={}", key, value);
    }
    Json(vars)
}

/// Liveness payload: machine name and the current local time.
async fn get_health() -> Json<Value> {
    Json(json!({
        "machine_name": std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string()),
        "now": chrono::Local::now().to_rfc3339(),
    }))
}
