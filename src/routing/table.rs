//! Route table and request-time lookup.
//!
//! # Responsibilities
//! - Store resolved routes in match order
//! - Match a request path against route shapes (first match wins)
//! - Capture and percent-decode path parameters
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in precedence order (acceptable for typical route counts)
//! - Explicit `None` rather than a silent default route

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::routing::grammar::RoutePattern;

/// A single resolved route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    /// URL pattern like `/users/:id`.
    #[serde(rename = "endpoint")]
    pub pattern: String,
    /// Absolute path of the source file.
    #[serde(rename = "file")]
    pub source_file: PathBuf,
    /// Registry address of the handlers serving this route.
    #[serde(rename = "module")]
    pub module_key: String,
    /// Match precedence (higher = checked first).
    pub precedence: u64,
    #[serde(skip)]
    compiled: RoutePattern,
}

impl Route {
    pub fn new(compiled: RoutePattern, source_file: PathBuf, module_key: impl Into<String>) -> Self {
        Self {
            pattern: compiled.to_string(),
            precedence: compiled.precedence(),
            source_file,
            module_key: module_key.into(),
            compiled,
        }
    }

    pub fn compiled(&self) -> &RoutePattern {
        &self.compiled
    }

    pub fn source_file(&self) -> &Path {
        &self.source_file
    }
}

/// Path parameters captured by a match, in pattern order.
pub type PathParams = Vec<(String, String)>;

/// Result of matching a path against the table.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: PathParams,
}

/// Ordered, immutable route table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Wrap routes that are already in match order.
    pub fn from_routes(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Find the first route whose shape matches `path`.
    ///
    /// Trailing, doubled and backslash separators are tolerated.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        let normalized = path.replace('\\', "/");
        let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();

        self.routes.iter().find_map(|route| {
            route.compiled.capture(&segments).map(|captures| RouteMatch {
                route,
                params: captures
                    .into_iter()
                    .map(|(name, raw)| {
                        let value = urlencoding::decode(raw)
                            .map(|v| v.into_owned())
                            .unwrap_or_else(|_| raw.to_string());
                        (name, value)
                    })
                    .collect(),
            })
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
