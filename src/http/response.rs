//! Response handling and transformation.
//!
//! # Responsibilities
//! - Structured `ApiError` body shared by the gates
//! - Map gateway errors to appropriate HTTP status codes
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Backend connection failures result in 502 Bad Gateway
//! - Backend timeouts result in 504 Gateway Timeout

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::RoutingError;

/// Error body returned by the key gate and the resource-owner guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Short error code, e.g. `API_KEY_MISSING`.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Header required for this API.
    pub required_header: String,
    /// Additional details or remediation guidance.
    pub details: String,
    /// When the error occurred.
    pub timestamp: DateTime<Utc>,
}

impl ApiError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        required_header: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            required_header: required_header.into(),
            details: details.into(),
            timestamp: Utc::now(),
        }
    }

    /// Pair this body with a status code.
    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Failures of the gateway's own request pipeline.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no matching route for '{0}'")]
    RouteNotFound(String),

    #[error("backend for route '{route}' is unavailable: {reason}")]
    BackendUnavailable { route: String, reason: String },

    #[error("backend for route '{route}' timed out after {timeout_secs}s")]
    BackendTimeout { route: String, timeout_secs: u64 },

    #[error("bad upstream request: {0}")]
    BadUpstreamRequest(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::BackendUnavailable { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::BackendTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::BadUpstreamRequest(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::RouteNotFound(_) => "ROUTE_NOT_FOUND",
            GatewayError::BackendUnavailable { .. } => "BACKEND_UNAVAILABLE",
            GatewayError::BackendTimeout { .. } => "BACKEND_TIMEOUT",
            GatewayError::BadUpstreamRequest(_) => "BAD_UPSTREAM_REQUEST",
        }
    }
}

impl From<RoutingError> for GatewayError {
    fn from(err: RoutingError) -> Self {
        match err {
            RoutingError::RouteNotFound(path) => GatewayError::RouteNotFound(path),
            other => GatewayError::BadUpstreamRequest(other.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
            "status": status.as_u16(),
            "timestamp": Utc::now(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_wire_format() {
        let err = ApiError::new("API_KEY_MISSING", "Missing or invalid API key", "X-API-KEY", "details");
        let value = serde_json::to_value(&err).unwrap();

        assert_eq!(value["code"], "API_KEY_MISSING");
        assert_eq!(value["message"], "Missing or invalid API key");
        assert_eq!(value["requiredHeader"], "X-API-KEY");
        assert_eq!(value["details"], "details");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_gateway_error_status() {
        assert_eq!(GatewayError::RouteNotFound("/x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            GatewayError::BackendUnavailable { route: "r".into(), reason: "refused".into() }.status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::BackendTimeout { route: "r".into(), timeout_secs: 1 }.status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_routing_error_conversion() {
        let err: GatewayError = RoutingError::RouteNotFound("/nope".into()).into();
        assert!(matches!(err, GatewayError::RouteNotFound(p) if p == "/nope"));
    }
}
