//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber
//! - Pick pretty or JSON output from configuration
//! - Resolve the log filter (`RUST_LOG` first, then configured level)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::schema::{LogFormat, ObservabilityConfig};
use crate::observability::ObservabilityError;

/// Build the filter: `RUST_LOG` when set, otherwise the configured level.
pub fn build_filter(level: &str) -> Result<EnvFilter, ObservabilityError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| ObservabilityError::InvalidFilter {
        filter: level.to_string(),
        message: e.to_string(),
    })
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), ObservabilityError> {
    let filter = build_filter(&config.log_level)?;

    let layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| ObservabilityError::Subscriber(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(build_filter("info").is_ok());
        assert!(build_filter("api_dispatch=debug,tower_http=warn").is_ok());
        assert!(matches!(
            build_filter("=[bad"),
            Err(ObservabilityError::InvalidFilter { .. })
        ));
    }
}
