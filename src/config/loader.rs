//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "GATEWAY_";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    Env { key: String, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, applying environment
/// overrides on top.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;
    finalize(config, std::env::vars())
}

/// Build the configuration from defaults and environment overrides only.
pub fn load_from_env() -> Result<GatewayConfig, ConfigError> {
    finalize(GatewayConfig::default(), std::env::vars())
}

fn finalize<I>(mut config: GatewayConfig, vars: I) -> Result<GatewayConfig, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    apply_env_overrides(&mut config, vars)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `GATEWAY_*` overrides to a configuration.
///
/// Recognized keys:
/// - `GATEWAY_API_KEY`
/// - `GATEWAY_TOKEN_SECRET`
/// - `GATEWAY_TOKEN_LIFETIME_SECS`
/// - `GATEWAY_ROUTE_<NAME>_URL` (name is matched case-insensitively, `-` as `_`)
pub fn apply_env_overrides<I>(config: &mut GatewayConfig, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };

        match name {
            "API_KEY" => config.api_key.expected_value = value,
            "TOKEN_SECRET" => config.tokens.secret = Some(value),
            "TOKEN_LIFETIME_SECS" => {
                config.tokens.lifetime_secs = value
                    .parse()
                    .map_err(|_| ConfigError::Env { key: key.clone(), value: value.clone() })?;
            }
            _ => {
                let Some(route_name) = name
                    .strip_prefix("ROUTE_")
                    .and_then(|rest| rest.strip_suffix("_URL"))
                else {
                    continue;
                };
                match config
                    .routes
                    .iter_mut()
                    .find(|r| r.name.to_uppercase().replace('-', "_") == route_name)
                {
                    Some(route) => {
                        tracing::debug!(route = %route.name, target = %value, "Route target overridden from environment");
                        route.target = value;
                    }
                    None => tracing::warn!(key = %key, "Override does not match any configured route"),
                }
            }
        }
    }
    Ok(())
}
