//! Shared-secret header gate for mutating requests.
//!
//! Reads are never gated. Every other method under the protected prefix must
//! carry the configured header with exactly the configured value.

use axum::http::{header::InvalidHeaderName, HeaderMap, HeaderName, Method};

use crate::config::ApiKeyConfig;
use crate::http::response::ApiError;
use crate::observability::metrics;
use crate::routing::matcher::PathPrefixMatcher;

pub const API_KEY_MISSING: &str = "API_KEY_MISSING";
pub const API_KEY_INVALID: &str = "API_KEY_INVALID";

/// Outcome of the gate for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Reject(ApiError),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }
}

/// The key gate, built once from configuration.
#[derive(Debug, Clone)]
pub struct ApiKeyGate {
    enabled: bool,
    header_name: HeaderName,
    header_label: String,
    expected_value: String,
    protected: PathPrefixMatcher,
    read_method: String,
}

impl ApiKeyGate {
    pub fn from_config(config: &ApiKeyConfig) -> Result<Self, InvalidHeaderName> {
        Ok(Self {
            enabled: config.enabled,
            header_name: HeaderName::from_bytes(config.header_name.as_bytes())?,
            header_label: config.header_name.clone(),
            expected_value: config.expected_value.clone(),
            protected: PathPrefixMatcher::new(config.protected_prefix.as_str()),
            read_method: config.read_method.clone(),
        })
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    /// Decide whether a request may proceed.
    pub fn authorize_mutation(&self, path: &str, method: &Method, headers: &HeaderMap) -> GateDecision {
        if !self.enabled || !self.protected.matches_path(path) {
            return GateDecision::Allow;
        }
        if method.as_str().eq_ignore_ascii_case(&self.read_method) {
            return GateDecision::Allow;
        }

        let code = match headers.get(&self.header_name) {
            None => API_KEY_MISSING,
            // Plain byte equality, not constant-time.
            Some(provided) if provided.as_bytes() == self.expected_value.as_bytes() => {
                return GateDecision::Allow;
            }
            Some(_) => API_KEY_INVALID,
        };

        tracing::warn!(method = %method, path = %path, code, "Missing or invalid API key");
        metrics::record_rejection(code);

        GateDecision::Reject(ApiError::new(
            code,
            "Missing or invalid API key",
            self.header_label.clone(),
            format!(
                "Provide the {} header with a valid API key. Contact the API owner to obtain a key.",
                self.header_label
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn gate() -> ApiKeyGate {
        ApiKeyGate::from_config(&ApiKeyConfig::default()).unwrap()
    }

    fn with_key(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(value).unwrap());
        headers
    }

    fn rejected_code(decision: GateDecision) -> String {
        match decision {
            GateDecision::Reject(err) => err.code,
            GateDecision::Allow => panic!("expected rejection"),
        }
    }

    #[test]
    fn test_reads_are_never_gated() {
        let gate = gate();
        for headers in [HeaderMap::new(), with_key("wrong"), with_key("demo-secret-key")] {
            assert!(gate.authorize_mutation("/api/products/1", &Method::GET, &headers).is_allowed());
        }
    }

    #[test]
    fn test_mutations_with_secret_allowed() {
        let gate = gate();
        let headers = with_key("demo-secret-key");
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
            assert!(gate.authorize_mutation("/api/products", &method, &headers).is_allowed());
        }
    }

    #[test]
    fn test_missing_key_rejected() {
        let decision = gate().authorize_mutation("/api/products", &Method::POST, &HeaderMap::new());
        let GateDecision::Reject(err) = decision else {
            panic!("expected rejection");
        };
        assert_eq!(err.code, API_KEY_MISSING);
        assert_eq!(err.required_header, "X-API-KEY");
        assert_eq!(err.message, "Missing or invalid API key");
        assert!(err.details.contains("X-API-KEY"));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let gate = gate();
        for value in ["wrong", "DEMO-SECRET-KEY", "demo-secret-key ", ""] {
            let decision = gate.authorize_mutation("/api/products/9", &Method::DELETE, &with_key(value));
            assert_eq!(rejected_code(decision), API_KEY_INVALID, "value {value:?}");
        }
    }

    #[test]
    fn test_other_paths_pass_through() {
        let gate = gate();
        assert!(gate
            .authorize_mutation("/api/orders", &Method::POST, &HeaderMap::new())
            .is_allowed());
        assert!(gate
            .authorize_mutation("/api/productsX", &Method::POST, &HeaderMap::new())
            .is_allowed());
    }

    #[test]
    fn test_disabled_gate_allows_everything() {
        let config = ApiKeyConfig {
            enabled: false,
            ..Default::default()
        };
        let gate = ApiKeyGate::from_config(&config).unwrap();
        assert!(gate
            .authorize_mutation("/api/products", &Method::POST, &HeaderMap::new())
            .is_allowed());
    }

    #[test]
    fn test_custom_header_and_read_method() {
        let config = ApiKeyConfig {
            header_name: "X-Service-Token".into(),
            expected_value: "s3cret".into(),
            protected_prefix: "/api/inventory".into(),
            read_method: "get".into(),
            ..Default::default()
        };
        let gate = ApiKeyGate::from_config(&config).unwrap();

        assert!(gate
            .authorize_mutation("/api/inventory", &Method::GET, &HeaderMap::new())
            .is_allowed());

        let mut headers = HeaderMap::new();
        headers.insert("x-service-token", HeaderValue::from_static("s3cret"));
        assert!(gate.authorize_mutation("/api/inventory/3", &Method::PUT, &headers).is_allowed());

        let decision = gate.authorize_mutation("/api/inventory/3", &Method::PUT, &HeaderMap::new());
        let GateDecision::Reject(err) = decision else {
            panic!("expected rejection");
        };
        assert_eq!(err.required_header, "X-Service-Token");
    }
}
