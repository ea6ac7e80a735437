//! Consul agent registration.
//!
//! The harness does not poll anything itself: it registers the service plus a
//! set of HTTP checks with the local Consul agent and lets the agent do the
//! health checking. Field names follow the agent's `/v1/agent/service/register`
//! JSON schema.
use std::collections::HashMap;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::models::RegistryConfig;

/// Environment variable consulted when `service_address` is not configured.
pub const SERVICE_ADDRESS_ENV: &str = "SERVICE_ADDRESS";

/// Service registration payload for the Consul agent API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceRegistration {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub checks: Vec<ServiceCheck>,
}

/// A single agent-scheduled HTTP check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceCheck {
    #[serde(rename = "HTTP")]
    pub http: String,
    pub method: String,
    pub interval: String,
    pub timeout: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub header: HashMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Client for registering a service with a Consul agent.
pub struct ConsulRegistry {
    client: reqwest::Client,
    agent_base: String,
    registration: ServiceRegistration,
}

impl ConsulRegistry {
    /// Build a registry client from configuration. Returns `Ok(None)` when no
    /// advertisable service address can be resolved; running unregistered is
    /// a supported mode for local development.
    pub fn from_config(config: &RegistryConfig) -> Result<Option<Self>> {
        let address = match config
            .service_address
            .clone()
            .or_else(|| std::env::var(SERVICE_ADDRESS_ENV).ok())
        {
            Some(address) if !address.is_empty() => address,
            _ => {
                tracing::warn!(
                    "No service address configured and {} is unset, skipping registry registration",
                    SERVICE_ADDRESS_ENV
                );
                return Ok(None);
            }
        };

        let registration = build_registration(config, &address);
        let client = reqwest::Client::new();

        Ok(Some(Self {
            client,
            agent_base: config.address.trim_end_matches('/').to_string(),
            registration,
        }))
    }

    /// The payload this client will register (exposed for diagnostics).
    pub fn registration(&self) -> &ServiceRegistration {
        &self.registration
    }

    /// Register the service with the agent. A stale entry under the same id
    /// is deregistered first so restarts do not accumulate duplicates.
    pub async fn register(&self) -> Result<()> {
        tracing::info!(
            "Registering service {} with URL {}:{}",
            self.registration.name,
            self.registration.address,
            self.registration.port
        );

        // Best effort: a missing stale entry is not a failure.
        if let Err(e) = self.deregister().await {
            tracing::debug!("Pre-registration deregister failed (ignored): {e:#}");
        }

        self.client
            .put(format!("{}/v1/agent/service/register", self.agent_base))
            .json(&self.registration)
            .send()
            .await
            .wrap_err("Failed to reach Consul agent")?
            .error_for_status()
            .wrap_err("Consul agent rejected service registration")?;

        Ok(())
    }

    /// Remove the service from the agent.
    pub async fn deregister(&self) -> Result<()> {
        tracing::info!(
            "Unregistering service {} with URL {}:{}",
            self.registration.name,
            self.registration.address,
            self.registration.port
        );

        self.client
            .put(format!(
                "{}/v1/agent/service/deregister/{}",
                self.agent_base, self.registration.id
            ))
            .send()
            .await
            .wrap_err("Failed to reach Consul agent")?
            .error_for_status()
            .wrap_err("Consul agent rejected service deregistration")?;

        Ok(())
    }
}

fn build_registration(config: &RegistryConfig, address: &str) -> ServiceRegistration {
    let check_header: HashMap<String, Vec<String>> = config
        .check_host
        .as_ref()
        .map(|host| HashMap::from([("Host".to_string(), vec![host.clone()])]))
        .unwrap_or_default();

    let checks = config
        .check_paths
        .iter()
        .map(|path| ServiceCheck {
            http: format!("http://{}:{}{}", address, config.service_port, path),
            method: "GET".to_string(),
            interval: config.check_interval.clone(),
            timeout: config.check_timeout.clone(),
            header: check_header.clone(),
            name: Some(path.trim_start_matches('/').to_string()),
        })
        .collect();

    ServiceRegistration {
        id: format!(
            "{}@{}:{}",
            config.service_name, address, config.service_port
        ),
        name: config.service_name.clone(),
        address: address.to_string(),
        port: config.service_port,
        checks,
    }
}
