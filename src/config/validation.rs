//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate route prefixes and backend URLs
//! - Validate value ranges (timeouts > 0, lifetimes > 0)
//! - Detect routes shadowed by an earlier prefix
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use axum::http::HeaderName;
use thiserror::Error;
use url::Url;

use crate::auth::token::MAX_LIFETIME_SECS;
use crate::config::schema::GatewayConfig;
use crate::routing::matcher::PathPrefixMatcher;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route '{0}' is declared more than once")]
    DuplicateRoute(String),

    #[error("route '{route}': path prefix '{prefix}' must start with '/'")]
    InvalidPrefix { route: String, prefix: String },

    #[error("route '{route}': target '{target}' is not an http(s) URL")]
    InvalidTarget { route: String, target: String },

    #[error("route '{route}' is unreachable: prefix '{prefix}' is shadowed by earlier route '{shadowed_by}'")]
    ShadowedRoute {
        route: String,
        prefix: String,
        shadowed_by: String,
    },

    #[error("api key header '{0}' is not a valid header name")]
    InvalidHeaderName(String),

    #[error("api key gate is enabled but no expected value is configured")]
    EmptyApiKey,

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("tokens.lifetime_secs ({0}) exceeds the maximum of {MAX_LIFETIME_SECS}")]
    LifetimeTooLong(u64),

    #[error("timeouts.request_secs ({request_secs}) must be greater than timeouts.upstream_secs ({upstream_secs})")]
    RequestTimeoutTooShort { request_secs: u64, upstream_secs: u64 },
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        if !seen.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }

        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPrefix {
                route: route.name.clone(),
                prefix: route.path_prefix.clone(),
            });
        }

        let target_ok = Url::parse(&route.target)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
            .unwrap_or(false);
        if !target_ok {
            errors.push(ValidationError::InvalidTarget {
                route: route.name.clone(),
                target: route.target.clone(),
            });
        }

        // First match wins, so an earlier prefix covering this one makes it dead.
        if let Some(earlier) = config.routes[..i]
            .iter()
            .find(|r| PathPrefixMatcher::new(r.path_prefix.as_str()).matches_path(&route.path_prefix))
        {
            errors.push(ValidationError::ShadowedRoute {
                route: route.name.clone(),
                prefix: route.path_prefix.clone(),
                shadowed_by: earlier.name.clone(),
            });
        }
    }

    if config.api_key.enabled {
        if HeaderName::from_bytes(config.api_key.header_name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName(
                config.api_key.header_name.clone(),
            ));
        }
        if config.api_key.expected_value.is_empty() {
            errors.push(ValidationError::EmptyApiKey);
        }
    }

    if config.tokens.lifetime_secs == 0 {
        errors.push(ValidationError::ZeroValue("tokens.lifetime_secs"));
    }
    if config.tokens.lifetime_secs > MAX_LIFETIME_SECS {
        errors.push(ValidationError::LifetimeTooLong(config.tokens.lifetime_secs));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.upstream_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.request_secs"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.connect_secs"));
    }
    // Backend timeouts must fire before the whole-request timeout.
    let timeouts = &config.timeouts;
    if timeouts.upstream_secs > 0 && timeouts.request_secs <= timeouts.upstream_secs {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request_secs: timeouts.request_secs,
            upstream_secs: timeouts.upstream_secs,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
