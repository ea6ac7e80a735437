//! Wicket - a demonstration gateway harness.
//!
//! Wicket wires pre-built pieces into a small, observable mesh demo: a sample
//! diagnostics backend (request headers, environment, health), a reverse
//! proxy in front of it, and registration of the backend against a Consul
//! agent that does the actual health polling. The one piece of original
//! request-path logic is the **outbound Host-header rewrite**: a route's
//! downstream descriptor may carry upstream header find/replace rules, and
//! when exactly one of them targets `host` the proxied request's `Host`
//! header is replaced just before dispatch.
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use arc_swap::ArcSwap;
//! use wicket::{
//!     adapters::{GatewayHandler, HttpClientAdapter},
//!     config::GatewayConfig,
//!     ports::http_client::HttpClient,
//! };
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let config: GatewayConfig = wicket::config::load_config("gateway.toml").await?;
//! let holder = Arc::new(ArcSwap::new(Arc::new(config)));
//! let client: Arc<dyn HttpClient> = Arc::new(HttpClientAdapter::new()?);
//! let handler = GatewayHandler::new(holder, client);
//! // Wire `handler` into an axum catch-all route (see the binary crate).
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations)
//! and keeps the rewrite logic inside `core`, where it is pure and testable
//! without any I/O. The gateway handler resolves a route and attaches a typed
//! [`core::RoutingContext`] to the outbound request; the client adapter reads
//! it synchronously, immediately before transmission.
//!
//! # Error Handling
//! Fallible wiring returns `eyre::Result<T>`; port boundaries use domain
//! error enums. The Host rewrite itself never errors: any missing or
//! ambiguous routing data degrades to "no rewrite" and the request proceeds
//! with the header it already had.
pub mod config;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod app;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{ConsulRegistry, FileConfigProvider, GatewayHandler, HttpClientAdapter},
    core::RoutingContext,
    ports::http_client::HttpClient,
    utils::GracefulShutdown,
};
