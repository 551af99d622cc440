//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check ignore globs compile
//! - Detect duplicate explicit routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AppConfig;
use crate::routing::grammar::RoutePattern;
use crate::routing::ignore::IgnoreRules;

/// A single semantic problem, naming the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration, collecting every error.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let routing = &config.routing;
    if routing.api_root.as_os_str().is_empty() && routing.routes.is_empty() {
        errors.push(ValidationError::new("routing.api_root", "must not be empty"));
    }

    if let Err(e) = IgnoreRules::new(routing.ignore.iter().cloned()) {
        errors.push(ValidationError::new("routing.ignore", e.to_string()));
    }

    for (i, stem) in routing.index_stems.iter().enumerate() {
        if stem.is_empty() || stem.contains('/') {
            errors.push(ValidationError::new(
                format!("routing.index_stems[{}]", i),
                format!("'{}' is not a file stem", stem),
            ));
        }
    }

    let mut shapes: HashMap<String, &str> = HashMap::new();
    for (i, route) in routing.routes.iter().enumerate() {
        if !route.endpoint.starts_with('/') {
            errors.push(ValidationError::new(
                format!("routing.routes[{}].endpoint", i),
                format!("'{}' must start with '/'", route.endpoint),
            ));
        }
        if route.module.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("routing.routes[{}].module", i),
                "must not be empty",
            ));
        }
        let shape = RoutePattern::parse(&route.endpoint).shape();
        if let Some(first) = shapes.insert(shape, &route.endpoint) {
            errors.push(ValidationError::new(
                format!("routing.routes[{}].endpoint", i),
                format!("'{}' overlaps '{}'", route.endpoint, first),
            ));
        }
    }

    if config.dispatch.max_body_size == 0 {
        errors.push(ValidationError::new("dispatch.max_body_size", "must be greater than 0"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.observability.log_level.trim().is_empty() {
        errors.push(ValidationError::new("observability.log_level", "must not be empty"));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ExplicitRoute;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.timeouts.request_secs = 0;
        config.routing.index_stems = vec!["a/b".into()];
        config.routing.routes = vec![
            ExplicitRoute { endpoint: "/users/:id".into(), module: "users/[id]".into() },
            ExplicitRoute { endpoint: "/users/{name}".into(), module: "users/[name]".into() },
            ExplicitRoute { endpoint: "orders".into(), module: "".into() },
        ];

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "routing.index_stems[0]",
                "routing.routes[1].endpoint",
                "routing.routes[2].endpoint",
                "routing.routes[2].module",
                "timeouts.request_secs",
            ]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = AppConfig::default();
        config.observability.metrics_address = "bogus".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
