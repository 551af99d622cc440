//! Configuration loading from disk and the environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides `routing.api_root`.
pub const ENV_API_ROOT: &str = "API_ROOT";
/// Overrides the port of `listener.bind_address`.
pub const ENV_API_PORT: &str = "API_PORT";
/// Overrides `observability.log_level`.
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, apply environment overrides, and validate a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: AppConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Defaults plus environment overrides, validated; used without a file.
pub fn load_default_config() -> Result<AppConfig, ConfigError> {
    let mut config = AppConfig::default();
    apply_env_overrides(&mut config)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `API_ROOT`, `API_PORT` and `LOG_LEVEL` from the process environment.
pub fn apply_env_overrides(config: &mut AppConfig) -> Result<(), ConfigError> {
    apply_overrides_from(config, |var| std::env::var(var).ok())
}

/// Apply overrides from an arbitrary variable lookup.
pub fn apply_overrides_from<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(root) = lookup(ENV_API_ROOT).filter(|v| !v.is_empty()) {
        config.routing.api_root = PathBuf::from(root);
    }

    if let Some(port) = lookup(ENV_API_PORT).filter(|v| !v.is_empty()) {
        let port: u16 = port.parse().map_err(|_| ConfigError::InvalidEnv {
            var: ENV_API_PORT,
            value: port.clone(),
        })?;
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{}:{}", host, port);
    }

    if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.is_empty()) {
        config.observability.log_level = level;
    }

    Ok(())
}
