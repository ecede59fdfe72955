//! Request forwarding to backends.
//!
//! # Responsibilities
//! - Rewrite the inbound URI onto the matched route's target
//! - Stream the inbound body upstream unchanged
//! - Relay the backend status, headers and body back unchanged
//!
//! # Design Decisions
//! - Exactly one attempt per request, no retries
//! - Every backend call has a deadline; expiry maps to 504
//! - Connection failures map to 502

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, Response, Version},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TimeoutConfig;
use crate::http::response::GatewayError;
use crate::routing::Route;
use crate::security::headers::{prepare_upstream_headers, strip_hop_by_hop};

/// Forwards requests to route targets over a pooled HTTP client.
#[derive(Clone)]
pub struct Dispatcher {
    client: Client<HttpConnector, Body>,
    upstream_timeout: Duration,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("upstream_timeout", &self.upstream_timeout)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            upstream_timeout: Duration::from_secs(timeouts.upstream_secs),
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        self.upstream_timeout
    }

    /// Send `request` to `route`'s backend and hand back its response.
    pub async fn forward(&self, request: Request<Body>, route: &Route) -> Result<Response<Body>, GatewayError> {
        let (mut parts, body) = request.into_parts();

        parts.uri = route.upstream_uri(&parts.uri)?;
        parts.version = Version::HTTP_11;
        prepare_upstream_headers(&mut parts.headers);

        tracing::debug!(route = %route.name(), upstream = %parts.uri, method = %parts.method, "Forwarding request");

        let upstream = Request::from_parts(parts, body);

        let response: Response<Incoming> = match tokio::time::timeout(self.upstream_timeout, self.client.request(upstream)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(GatewayError::BackendUnavailable {
                    route: route.name().to_string(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(GatewayError::BackendTimeout {
                    route: route.name().to_string(),
                    timeout_secs: self.upstream_timeout.as_secs(),
                });
            }
        };

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
