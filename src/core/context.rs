//! Per-request routing context.
//!
//! The routing stage attaches a [`RoutingContext`] to the outbound request's
//! extensions; the client adapter reads it immediately before dispatch. The
//! context is a plain typed struct rather than an untyped key/value bag, so
//! downstream consumers can't misspell a lookup key.
use crate::config::models::{DownstreamRoute, RouteConfig};

/// Routing metadata for a single proxied request. Created once by the gateway
/// handler when a route matches, discarded with the request.
#[derive(Debug, Clone, Default)]
pub struct RoutingContext {
    /// The matched upstream prefix (diagnostics only).
    pub route_prefix: String,
    /// The resolved downstream route holder, absent when routing failed.
    pub downstream: Option<DownstreamRouteHolder>,
}

/// The downstream route descriptors resolved for a request. Consumers use the
/// first descriptor; keeping the full list mirrors route configuration shape.
#[derive(Debug, Clone)]
pub struct DownstreamRouteHolder {
    pub routes: Vec<DownstreamRoute>,
}

impl DownstreamRouteHolder {
    pub fn from_route(route: &RouteConfig) -> Self {
        Self {
            routes: route.downstream.clone(),
        }
    }
}

impl RoutingContext {
    pub fn new(route_prefix: impl Into<String>, route: &RouteConfig) -> Self {
        Self {
            route_prefix: route_prefix.into(),
            downstream: Some(DownstreamRouteHolder::from_route(route)),
        }
    }
}
