use async_trait::async_trait;
use axum::body::Body as AxumBody;
use eyre::Result;
use hyper::{Request, Response, Version, header, header::HeaderValue};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tracing::Instrument;

use crate::{
    core::{RoutingContext, apply_host_header, resolve_host_replacement},
    ports::http_client::{HttpClient, HttpClientError, HttpClientResult},
};

/// Outbound HTTP client adapter over hyper with rustls.
///
/// Owns the final pre-send mutations on a proxied request: the default `Host`
/// derived from the target URI, then the per-route Host rewrite when the
/// routing context carries exactly one `host` rule. Retries and circuit
/// breaking are out of scope for this harness.
pub struct HttpClientAdapter {
    client: Client<HttpsConnector<HttpConnector>, AxumBody>,
}

impl HttpClientAdapter {
    pub fn new() -> Result<Self> {
        // Idempotent; another component may have installed a provider first.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false);

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(client_tls_config())
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build::<_, AxumBody>(https_connector);

        tracing::info!("outbound HTTP client ready");
        Ok(Self { client })
    }

    /// Final outbound mutations, run synchronously just before transmission:
    /// set the default `Host` from the URI authority, then apply the
    /// configured replacement if the request's routing context resolves one.
    fn prepare_outbound(req: &mut Request<AxumBody>) -> HttpClientResult<()> {
        let Some(host) = req.uri().host() else {
            tracing::error!(uri = %req.uri(), "outgoing URI has no host");
            return Err(HttpClientError::InvalidRequest(
                "outgoing URI has no host".to_string(),
            ));
        };

        let default_host = match req.uri().port() {
            Some(port) => format!("{host}:{}", port.as_u16()),
            None => host.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&default_host) {
            req.headers_mut().insert(header::HOST, value);
        }

        // The routing context rides on the request extensions; a request that
        // never went through the routing stage simply has none.
        let replacement = req
            .extensions()
            .get::<RoutingContext>()
            .and_then(|ctx| resolve_host_replacement(ctx).map(str::to_owned));
        apply_host_header(req.headers_mut(), replacement.as_deref());

        Ok(())
    }
}

fn client_tls_config() -> rustls::ClientConfig {
    let mut roots = rustls::RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();

    for cert in native.certs {
        if roots.add(cert).is_err() {
            tracing::warn!("skipping unparseable native root certificate");
        }
    }
    if !native.errors.is_empty() {
        tracing::warn!(errors = ?native.errors, "some native certificates failed to load");
    }
    tracing::debug!(count = roots.len(), "native root certificates loaded");

    rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth()
}

#[async_trait]
impl HttpClient for HttpClientAdapter {
    async fn send_request(
        &self,
        mut req: Request<AxumBody>,
    ) -> HttpClientResult<Response<AxumBody>> {
        let span = tracing::info_span!(
            "backend_request",
            http.method = %req.method(),
            http.url = %req.uri(),
            http.status_code = tracing::field::Empty,
        );

        span.in_scope(|| Self::prepare_outbound(&mut req))?;

        let (mut parts, body) = req.into_parts();
        parts.version = Version::HTTP_11;
        // Extensions are request-scoped plumbing the backend never sees.
        parts.extensions.remove::<RoutingContext>();

        tracing::debug!(headers = ?parts.headers, "outgoing request headers");

        let method = parts.method.clone();
        let uri = parts.uri.clone();
        let outgoing = Request::from_parts(parts, body);

        match self.client.request(outgoing).instrument(span.clone()).await {
            Ok(response) => {
                span.record("http.status_code", response.status().as_u16());

                let (mut parts, body) = response.into_parts();
                // The proxied body is re-framed on the way back out.
                parts.headers.remove(header::TRANSFER_ENCODING);

                Ok(Response::from_parts(parts, AxumBody::new(body)))
            }
            Err(e) => {
                span.record("http.status_code", 599u16);
                tracing::error!("backend request {method} {uri} failed: {e}");
                Err(HttpClientError::ConnectionError(format!(
                    "request to {method} {uri} failed: {e}"
                )))
            }
        }
    }
}
