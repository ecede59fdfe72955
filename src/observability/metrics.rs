//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, rejections)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_rejections_total` (counter): gate/guard rejections by code
//! - `gateway_tokens_issued_total` (counter): tokens signed
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op
//! - Labels for route, status code, rejection code

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("route", route.to_string()),
    ];
    metrics::counter!("gateway_requests_total", &labels).increment(1);
    metrics::histogram!("gateway_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

/// Record a request turned away by the key gate or the owner guard.
pub fn record_rejection(code: &'static str) {
    metrics::counter!("gateway_rejections_total", "code" => code).increment(1);
}

/// Record a freshly signed token.
pub fn record_token_issued() {
    metrics::counter!("gateway_tokens_issued_total").increment(1);
}
