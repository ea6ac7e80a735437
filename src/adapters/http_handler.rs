use std::{net::SocketAddr, sync::Arc};

use arc_swap::ArcSwap;
use axum::{
    body::Body as AxumBody,
    http::{StatusCode, header},
};
use eyre::{Result, WrapErr};
use hyper::{Request, Response};

use crate::{
    config::models::{GatewayConfig, RouteConfig},
    core::RoutingContext,
    ports::http_client::HttpClient,
};

/// Delegating request handler for the Wicket gateway.
///
/// Matches the inbound path against the configured upstream prefixes, rewrites
/// the URI to the first downstream descriptor's target, attaches the routing
/// context for the outbound client, and forwards the response back unchanged.
pub struct GatewayHandler {
    config: Arc<ArcSwap<GatewayConfig>>,
    http_client: Arc<dyn HttpClient>,
}

impl GatewayHandler {
    pub fn new(config: Arc<ArcSwap<GatewayConfig>>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Main request handler: resolve a route and proxy downstream.
    pub async fn handle_request(
        &self,
        mut req: Request<AxumBody>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<AxumBody>, eyre::Error> {
        let config = self.config.load_full();
        let path = req.uri().path().to_string();

        tracing::info!("Handling {} request to {}", req.method(), path);

        let Some((prefix, route)) = find_matching_route(&config, &path) else {
            tracing::debug!("No route matches {}", path);
            return Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(AxumBody::from("No matching route"))
                .wrap_err("Failed to build 404 response");
        };

        // The descriptor list is validated non-empty at load time, but a
        // hot-reloaded config is not re-validated here.
        let Some(downstream) = route.downstream.first() else {
            return Response::builder()
                .status(StatusCode::BAD_GATEWAY)
                .body(AxumBody::from("Route has no downstream target"))
                .wrap_err("Failed to build 502 response");
        };

        let original_uri = req.uri().clone();
        let inbound_host = req
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let backend_uri = format!(
            "{}{}",
            downstream.target.trim_end_matches('/'),
            original_uri.path_and_query().map_or("", |pq| pq.as_str())
        );

        *req.uri_mut() = backend_uri
            .parse()
            .wrap_err("Failed to parse backend URI")?;

        let headers = req.headers_mut();
        if let Some(addr) = client_addr {
            if let Ok(value) = addr.ip().to_string().parse() {
                headers.insert("X-Forwarded-For", value);
            }
        }
        if let Ok(value) = "http".parse() {
            headers.insert("X-Forwarded-Proto", value);
        }
        if let Some(host) = inbound_host {
            if let Ok(value) = host.parse() {
                headers.insert("X-Forwarded-Host", value);
            }
        }

        // Routing metadata rides on the request itself; the client adapter
        // reads it right before transmission for the Host rewrite.
        req.extensions_mut()
            .insert(RoutingContext::new(prefix, route));

        match self.http_client.send_request(req).await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::error!("Backend request failed: {}", e);
                Response::builder()
                    .status(StatusCode::BAD_GATEWAY)
                    .body(AxumBody::from("Backend request failed"))
                    .wrap_err("Failed to build bad gateway response")
            }
        }
    }
}

impl Clone for GatewayHandler {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            http_client: self.http_client.clone(),
        }
    }
}

/// Longest‑prefix match to find a route configuration for an incoming path.
pub fn find_matching_route<'a>(
    config: &'a GatewayConfig,
    path: &str,
) -> Option<(&'a str, &'a RouteConfig)> {
    config
        .routes
        .iter()
        .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(prefix, route)| (prefix.as_str(), route))
}
