//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, timeout)
//! - Dispatch requests through the route table and the key gate
//! - Forward requests to upstream backends
//! - Observability (metrics, correlation IDs)

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header::InvalidHeaderName, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    timeout::{ResponseBodyTimeoutLayer, TimeoutLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::forward::Dispatcher;
use crate::http::health::get_health;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::response::GatewayError;
use crate::lifecycle::signals::shutdown_requested;
use crate::observability::metrics;
use crate::routing::{RouteTable, RoutingError};
use crate::security::{ApiKeyGate, GateDecision};

/// Errors that stop the gateway from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("invalid api key header: {0}")]
    ApiKeyHeader(#[from] InvalidHeaderName),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub gate: Arc<ApiKeyGate>,
    pub dispatcher: Arc<Dispatcher>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        let state = AppState {
            routes: Arc::new(RouteTable::from_config(&config.routes)?),
            gate: Arc::new(ApiKeyGate::from_config(&config.api_key)?),
            dispatcher: Arc::new(Dispatcher::new(&config.timeouts)),
        };

        tracing::info!(
            routes = state.routes.len(),
            api_key_gate = config.api_key.enabled,
            protected_prefix = %config.api_key.protected_prefix,
            "Gateway initialized"
        );
        if state.routes.is_empty() {
            tracing::warn!("No routes configured; every proxied request will be answered with 404");
        }

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(get_health))
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            // Bounds each wait for a body frame; the dispatcher only bounds the response head.
            .layer(ResponseBodyTimeoutLayer::new(Duration::from_secs(config.timeouts.upstream_secs)))
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until a shutdown signal or `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_requested(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Main proxy handler.
/// Looks up route, applies the key gate, and forwards request.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request.request_id().unwrap_or("unknown").to_string();
    let path = request.uri().path().to_string();
    let method = request.method().clone();

    tracing::debug!(request_id = %request_id, method = %method, path = %path, "Proxying request");

    // 1. Match Route
    let route = match state.routes.resolve(&path) {
        Ok(route) => route,
        Err(e) => {
            tracing::warn!(request_id = %request_id, path = %path, "No route matched");
            let err = GatewayError::from(e);
            metrics::record_request(method.as_str(), err.status().as_u16(), "none", start_time);
            return err.into_response();
        }
    };

    // 2. Key Gate
    if let GateDecision::Reject(api_error) = state.gate.authorize_mutation(&path, &method, request.headers()) {
        metrics::record_request(method.as_str(), StatusCode::UNAUTHORIZED.as_u16(), route.name(), start_time);
        return api_error.with_status(StatusCode::UNAUTHORIZED);
    }

    // 3. Forward
    match state.dispatcher.forward(request, route).await {
        Ok(response) => {
            metrics::record_request(method.as_str(), response.status().as_u16(), route.name(), start_time);
            response
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, route = %route.name(), error = %e, "Upstream error");
            metrics::record_request(method.as_str(), e.status().as_u16(), route.name(), start_time);
            e.into_response()
        }
    }
}
