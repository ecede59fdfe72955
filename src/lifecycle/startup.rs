//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging before anything else logs
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Without a config file, defaults plus `GATEWAY_*` overrides are used

use std::path::Path;

use crate::config::{load_config, load_from_env, ConfigError, GatewayConfig};
use crate::observability::logging::init_logging;

/// Load configuration and install logging.
pub fn bootstrap(config_path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let config = match config_path {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    init_logging(&config.observability);

    match config_path {
        Some(path) => tracing::info!(path = %path.display(), "Configuration loaded"),
        None => tracing::info!("No config file given; using defaults and environment"),
    }

    Ok(config)
}
