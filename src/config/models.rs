//! Configuration data structures for Wicket.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files. They are
//! intentionally serde‑friendly and include defaults so that minimal configs remain concise.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An upstream header find/replace rule attached to a downstream route.
///
/// The gateway currently acts on the single rule whose `key` matches `host`
/// case‑insensitively; other rules are carried through untouched so configs
/// written for a fuller gateway stay loadable.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HeaderFindReplace {
    /// Header name the rule targets (matched case‑insensitively).
    pub key: String,
    /// Literal replacement value.
    pub replace: String,
}

/// One downstream target a matched request may be forwarded to.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DownstreamRoute {
    /// Absolute base URL of the backend, e.g. `http://app:80`.
    pub target: String,
    /// Header rules applied to the outbound (upstream → downstream) request.
    #[serde(default)]
    pub upstream_headers: Option<Vec<HeaderFindReplace>>,
}

/// Route definition: the ordered downstream descriptors for an upstream prefix.
/// The proxy dispatches to the first descriptor; selection among several is
/// an external balancer's job and is not implemented here.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RouteConfig {
    pub downstream: Vec<DownstreamRoute>,
}

/// Top level configuration for the gateway binary.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub listen_addr: String,
    /// Routes keyed by upstream path prefix (longest prefix wins).
    pub routes: HashMap<String, RouteConfig>,
    #[serde(default)]
    pub registry: Option<RegistryConfig>,
}

impl GatewayConfig {
    /// Create a new gateway configuration builder.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }
}

/// Builder for `GatewayConfig` to allow for cleaner configuration creation.
#[derive(Default)]
pub struct GatewayConfigBuilder {
    listen_addr: Option<String>,
    routes: HashMap<String, RouteConfig>,
    registry: Option<RegistryConfig>,
}

impl GatewayConfigBuilder {
    /// Set the listen address.
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = Some(addr.into());
        self
    }

    /// Add a route with the given upstream prefix and downstream descriptors.
    pub fn route(mut self, prefix: impl Into<String>, downstream: Vec<DownstreamRoute>) -> Self {
        self.routes
            .insert(prefix.into(), RouteConfig { downstream });
        self
    }

    /// Set the service registry configuration.
    pub fn registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the final `GatewayConfig`.
    pub fn build(self) -> Result<GatewayConfig, String> {
        let listen_addr = self
            .listen_addr
            .ok_or_else(|| "listen_addr is required".to_string())?;

        if self.routes.is_empty() {
            return Err("At least one route must be configured".to_string());
        }

        Ok(GatewayConfig {
            listen_addr,
            routes: self.routes,
            registry: self.registry,
        })
    }
}

/// Top level configuration for the diagnostics backend binary.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub listen_addr: String,
    #[serde(default)]
    pub registry: Option<RegistryConfig>,
}

fn default_check_interval() -> String {
    "1s".to_string()
}

fn default_check_timeout() -> String {
    "100ms".to_string()
}

fn default_check_paths() -> Vec<String> {
    vec![
        "/info/health".to_string(),
        "/info/header".to_string(),
        "/info/env".to_string(),
    ]
}

/// Consul agent registration settings. The agent owns check scheduling; this
/// config only declares the checks it should run.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RegistryConfig {
    /// Base URL of the Consul agent HTTP API, e.g. `http://consul01:8500`.
    pub address: String,
    /// Service name to register under.
    pub service_name: String,
    /// Address the agent should advertise for this service. Falls back to the
    /// `SERVICE_ADDRESS` environment variable when absent.
    #[serde(default)]
    pub service_address: Option<String>,
    /// Port the agent should advertise for this service.
    pub service_port: u16,
    /// `Host` header the agent sends with each HTTP check (virtual-host
    /// routed backends reject probes without it).
    #[serde(default)]
    pub check_host: Option<String>,
    /// Check interval as a humantime string, e.g. `1s`.
    #[serde(default = "default_check_interval")]
    pub check_interval: String,
    /// Check timeout as a humantime string, e.g. `100ms`.
    #[serde(default = "default_check_timeout")]
    pub check_timeout: String,
    /// Paths probed by the agent, one HTTP check per entry.
    #[serde(default = "default_check_paths")]
    pub check_paths: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_listen_addr_and_routes() {
        assert!(GatewayConfig::builder().build().is_err());
        assert!(
            GatewayConfig::builder()
                .listen_addr("127.0.0.1:8080")
                .build()
                .is_err()
        );

        let config = GatewayConfig::builder()
            .listen_addr("127.0.0.1:8080")
            .route(
                "/svc",
                vec![DownstreamRoute {
                    target: "http://app:80".to_string(),
                    upstream_headers: None,
                }],
            )
            .build()
            .unwrap();
        assert_eq!(config.routes.len(), 1);
    }

    #[test]
    fn registry_defaults_apply() {
        let toml = r#"
            address = "http://consul01:8500"
            service_name = "app"
            service_port = 80
        "#;
        let registry: RegistryConfig = ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(registry.check_interval, "1s");
        assert_eq!(registry.check_timeout, "100ms");
        assert_eq!(registry.check_paths.len(), 3);
        assert!(registry.service_address.is_none());
    }
}
