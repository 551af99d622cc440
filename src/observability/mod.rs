//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, per-request spans)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through every span
//! - Metrics are cheap (no-ops until a recorder is installed)

pub mod logging;
pub mod metrics;

use thiserror::Error;

/// Errors raised while installing logging or metrics.
#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("failed to install subscriber: {0}")]
    Subscriber(String),

    #[error("invalid metrics address '{0}'")]
    InvalidAddress(String),

    #[error("failed to install metrics exporter: {0}")]
    Exporter(String),
}
