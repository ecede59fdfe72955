//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for a request path
//! - Return matched route or explicit no-match
//! - Build the upstream URI for a matched route
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan in declaration order (acceptable for typical route counts)
//! - Explicit RouteNotFound rather than silent default

use axum::http::Uri;
use thiserror::Error;
use url::{Position, Url};

use crate::config::RouteConfig;
use crate::routing::matcher::PathPrefixMatcher;

/// Errors raised while building or consulting the route table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("no route matches path '{0}'")]
    RouteNotFound(String),

    #[error("route '{route}' has an invalid target '{target}'")]
    InvalidTarget { route: String, target: String },

    #[error("cannot build upstream URI '{0}'")]
    InvalidUpstreamUri(String),
}

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    matcher: PathPrefixMatcher,
    target: Url,
    strip_prefix: bool,
}

impl Route {
    pub fn from_config(config: &RouteConfig) -> Result<Self, RoutingError> {
        let target = Url::parse(&config.target).map_err(|_| RoutingError::InvalidTarget {
            route: config.name.clone(),
            target: config.target.clone(),
        })?;

        Ok(Self {
            name: config.name.clone(),
            matcher: PathPrefixMatcher::new(config.path_prefix.as_str()),
            target,
            strip_prefix: config.strip_prefix,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path_prefix(&self) -> &str {
        self.matcher.prefix()
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches_path(path)
    }

    /// Rewrite an inbound URI onto this route's backend.
    ///
    /// The inbound path (or only the remainder, with `strip_prefix`) and query
    /// are appended to the target's own path.
    pub fn upstream_uri(&self, inbound: &Uri) -> Result<Uri, RoutingError> {
        let path = inbound.path();
        let forwarded = if self.strip_prefix {
            self.matcher
                .remainder(path)
                .ok_or_else(|| RoutingError::RouteNotFound(path.to_string()))?
        } else {
            path
        };

        let origin = &self.target[..Position::BeforePath];
        let base_path = self.target.path().trim_end_matches('/');
        let mut upstream = format!("{}{}{}", origin, base_path, forwarded);
        if let Some(query) = inbound.query() {
            upstream.push('?');
            upstream.push_str(query);
        }

        Uri::try_from(upstream.as_str()).map_err(|_| RoutingError::InvalidUpstreamUri(upstream))
    }
}

/// Immutable, ordered route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile routes from configuration, preserving declaration order.
    pub fn from_config(configs: &[RouteConfig]) -> Result<Self, RoutingError> {
        let routes = configs
            .iter()
            .map(Route::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        for route in &routes {
            tracing::debug!(
                route = %route.name,
                prefix = %route.path_prefix(),
                target = %route.target,
                "Route compiled"
            );
        }

        Ok(Self { routes })
    }

    /// First route, in declaration order, whose prefix covers `path`.
    pub fn resolve(&self, path: &str) -> Result<&Route, RoutingError> {
        self.routes
            .iter()
            .find(|r| r.matches(path))
            .ok_or_else(|| RoutingError::RouteNotFound(path.to_string()))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
