//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), optional
//!     → loader.rs (parse & deserialize, apply API_ROOT / API_PORT / LOG_LEVEL)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → consumed once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; route reload does not re-read it
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_default_config, ConfigError};
pub use schema::{AppConfig, DispatchConfig, ExplicitRoute, ListenerConfig, LogFormat, ObservabilityConfig, RoutingConfig, TimeoutConfig};
