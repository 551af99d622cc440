//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! dispatcher. All types derive Serde traits for deserialization from
//! config files, and every section has defaults so a minimal (or empty)
//! file is valid.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::routing::ignore::DEFAULT_IGNORE_PATTERNS;
use crate::routing::resolver::ConflictPolicy;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Route discovery settings.
    pub routing: RoutingConfig,

    /// Request handling settings.
    pub dispatch: DispatchConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// A route declared explicitly instead of discovered from files.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ExplicitRoute {
    /// URL pattern (`/users/:id`, `/users/{id}` or `/users/[id]`).
    pub endpoint: String,

    /// Module key whose handlers serve this route.
    pub module: String,
}

/// Route discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Directory whose layout defines the routes.
    pub api_root: PathBuf,

    /// Glob patterns for files and directories that are never routes.
    pub ignore: Vec<String>,

    /// File stems that map to their directory (`users/index.rs` → `/users`).
    pub index_stems: Vec<String>,

    /// What to do when two files resolve to the same route.
    pub on_conflict: ConflictPolicy,

    /// Re-resolve routes when the api root changes.
    pub watch: bool,

    /// Explicit routes; when non-empty, the filesystem is not scanned.
    pub routes: Vec<ExplicitRoute>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            api_root: PathBuf::from("./api"),
            ignore: DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string()).collect(),
            index_stems: vec!["index".to_string(), "mod".to_string()],
            on_conflict: ConflictPolicy::Error,
            watch: false,
            routes: Vec::new(),
        }
    }
}

/// Request handling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Parse cookies and JSON / urlencoded / text bodies before dispatch.
    pub load_standard_middleware: bool,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            load_standard_middleware: true,
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "error".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
