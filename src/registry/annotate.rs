//! Annotation helpers.
//!
//! Each helper returns a [`HandlerConfig`] fragment; attach as many as
//! needed and they merge through the registry's merge policy.
//!
//! ```
//! use api_dispatch::registry::annotate;
//!
//! let fragment = annotate::path("id")
//!     .and(annotate::query("id"))
//!     .and(annotate::optional("verbose"));
//! assert_eq!(fragment.params["id"].sources.len(), 2);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::dispatch::middleware::Middleware;
use crate::registry::config::HandlerConfig;
use crate::registry::requirement::{ParameterRequirement, SourcePath};

fn fragment(name: &str, requirement: ParameterRequirement) -> HandlerConfig {
    HandlerConfig {
        params: BTreeMap::from([(name.to_string(), requirement)]),
        ..HandlerConfig::default()
    }
}

fn source(name: &str, path: SourcePath) -> HandlerConfig {
    fragment(name, ParameterRequirement::source(path, true))
}

/// Run `middleware` before the handler, after any attached earlier.
pub fn use_middleware<M: Middleware>(middleware: M) -> HandlerConfig {
    use_middleware_arc(Arc::new(middleware))
}

pub fn use_middleware_arc(middleware: Arc<dyn Middleware>) -> HandlerConfig {
    HandlerConfig {
        middleware: vec![middleware],
        ..HandlerConfig::default()
    }
}

/// Attach a full requirement for one parameter.
pub fn param(name: &str, requirement: ParameterRequirement) -> HandlerConfig {
    fragment(name, requirement)
}

pub fn optional(name: &str) -> HandlerConfig {
    fragment(name, ParameterRequirement::required(false))
}

pub fn required(name: &str) -> HandlerConfig {
    fragment(name, ParameterRequirement::required(true))
}

pub fn auto_convert(name: &str) -> HandlerConfig {
    fragment(
        name,
        ParameterRequirement {
            auto_convert: Some(true),
            ..ParameterRequirement::default()
        },
    )
}

/// Read `name` from the request body.
pub fn body(name: &str) -> HandlerConfig {
    source(name, SourcePath::request(["body", name]))
}

/// Bind the entire request body to `name`.
pub fn whole_body(name: &str) -> HandlerConfig {
    source(name, SourcePath::request(["body"]))
}

pub fn query(name: &str) -> HandlerConfig {
    source(name, SourcePath::request(["query", name]))
}

pub fn all_query(name: &str) -> HandlerConfig {
    source(name, SourcePath::request(["query"]))
}

/// Read `name` from the path captures.
pub fn path(name: &str) -> HandlerConfig {
    source(name, SourcePath::request(["params", name]))
}

pub fn all_path(name: &str) -> HandlerConfig {
    source(name, SourcePath::request(["params"]))
}

/// Read a header with the same name as the parameter.
pub fn header(name: &str) -> HandlerConfig {
    header_named(name, name)
}

/// Read header `header_name` into parameter `name`.
pub fn header_named(name: &str, header_name: &str) -> HandlerConfig {
    source(
        name,
        SourcePath::request(["headers".to_string(), header_name.to_ascii_lowercase()]),
    )
}

pub fn all_headers(name: &str) -> HandlerConfig {
    source(name, SourcePath::request(["headers"]))
}

pub fn cookie(name: &str) -> HandlerConfig {
    source(name, SourcePath::request(["cookies", name]))
}

/// Bind the request's log context to `name`.
pub fn logger(name: &str) -> HandlerConfig {
    fragment(
        name,
        ParameterRequirement::source(SourcePath::response(["locals", "logger"]), false),
    )
}

/// Bind `response.locals.<key>` (set by middleware) to `name`.
pub fn local(name: &str, key: &str) -> HandlerConfig {
    fragment(
        name,
        ParameterRequirement::source(SourcePath::response(["locals", key]), false),
    )
}

/// Replace the default envelope for this handler.
pub fn format_response<F>(formatter: F) -> HandlerConfig
where
    F: Fn(Value, StatusCode) -> Value + Send + Sync + 'static,
{
    HandlerConfig {
        response_formatter: Some(Arc::new(formatter)),
        ..HandlerConfig::default()
    }
}

pub fn content_type(content_type: &str) -> HandlerConfig {
    HandlerConfig {
        response_content_type: Some(content_type.to_string()),
        ..HandlerConfig::default()
    }
}

/// Attach free-form documentation metadata.
pub fn docs(docs: Value) -> HandlerConfig {
    HandlerConfig {
        docs: Some(docs),
        ..HandlerConfig::default()
    }
}

pub fn description(text: &str) -> HandlerConfig {
    docs(json!({ "description": text }))
}

pub fn tag(tag: &str) -> HandlerConfig {
    docs(json!({ "tags": [tag] }))
}
