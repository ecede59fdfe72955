//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway
//! and the accounts service. All types derive Serde traits for
//! deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration shared by the gateway and the accounts service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration for the gateway.
    pub listener: ListenerConfig,

    /// Route definitions, matched in declaration order.
    pub routes: Vec<RouteConfig>,

    /// Shared-secret header gate for mutating requests.
    pub api_key: ApiKeyConfig,

    /// Bearer token signing and validation.
    pub tokens: TokenConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Accounts service settings.
    pub accounts: AccountsConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Route configuration mapping a path prefix to a backend base address.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path prefix to match (segment-aware).
    pub path_prefix: String,

    /// Backend base URL (e.g., "http://localhost:8081").
    pub target: String,

    /// Remove the matched prefix before forwarding.
    #[serde(default)]
    pub strip_prefix: bool,
}

impl RouteConfig {
    pub fn new(
        name: impl Into<String>,
        path_prefix: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path_prefix: path_prefix.into(),
            target: target.into(),
            strip_prefix: false,
        }
    }
}

/// Shared-secret gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiKeyConfig {
    /// Enable the gate.
    pub enabled: bool,

    /// Header carrying the shared secret.
    pub header_name: String,

    /// Expected header value.
    pub expected_value: String,

    /// Only paths under this prefix are gated.
    pub protected_prefix: String,

    /// Method that is never gated.
    pub read_method: String,
}

impl Default for ApiKeyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            header_name: "X-API-KEY".to_string(),
            // WARNING: This is a placeholder! Change this in production.
            expected_value: "demo-secret-key".to_string(),
            protected_prefix: "/api/products".to_string(),
            read_method: "GET".to_string(),
        }
    }
}

/// Token service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Signing secret. A random key is generated per process when unset.
    pub secret: Option<String>,

    /// Token lifetime in seconds.
    pub lifetime_secs: u64,

    /// Require the token's subject id to equal the target resource id on
    /// updates, in addition to the subject name check.
    pub bind_subject_id: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: None,
            lifetime_secs: 86_400,
            bind_subject_id: false,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Deadline for a single backend call in seconds.
    pub upstream_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
            request_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Accounts service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccountsConfig {
    /// Accounts service bind address.
    pub bind_address: String,

    /// Load the demo accounts into the in-memory store at startup.
    pub seed_demo_accounts: bool,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8082".to_string(),
            seed_demo_accounts: true,
        }
    }
}
