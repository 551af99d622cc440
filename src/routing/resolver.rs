//! Filesystem route resolution.
//!
//! # Responsibilities
//! - Walk the api root depth-first, lexicographically
//! - Drop ignored entries before conversion
//! - Convert each file into a route via the path grammar
//! - Detect shape conflicts and apply the conflict policy
//! - Sort by precedence (stable, so discovery order breaks ties)
//!
//! # Design Decisions
//! - Never mutates the filesystem; safe to call repeatedly
//! - Any failure is fatal for this run; callers decide whether to keep an
//!   older table
//! - Directories are never routes

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::schema::{ExplicitRoute, RoutingConfig};
use crate::routing::grammar::{pattern_from_path, RoutePattern};
use crate::routing::ignore::IgnoreRules;
use crate::routing::table::{Route, RouteTable};

/// Errors that make a route table impossible to build.
#[derive(Debug, Error)]
pub enum RouteResolutionError {
    /// The api root does not exist.
    #[error("api root '{0}' does not exist")]
    MissingRoot(PathBuf),

    /// The api root exists but is not a directory.
    #[error("api root '{0}' is not a directory")]
    NotADirectory(PathBuf),

    /// The api root or an entry below it could not be read.
    #[error("failed to read '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two source files resolve to the same URL shape.
    #[error("route conflict: '{first}' and '{second}' both resolve to {pattern}")]
    Conflict {
        pattern: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// An ignore glob failed to compile.
    #[error("invalid ignore pattern: {0}")]
    InvalidIgnorePattern(#[from] glob::PatternError),
}

/// What to do when two files produce the same route shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Fail resolution, naming both files.
    #[default]
    Error,
    /// Keep the earlier-discovered file and log a warning.
    FirstWins,
}

/// Options controlling route discovery.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub ignore: IgnoreRules,
    pub index_stems: Vec<String>,
    pub conflict_policy: ConflictPolicy,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            ignore: IgnoreRules::standard(),
            index_stems: vec!["index".to_string(), "mod".to_string()],
            conflict_policy: ConflictPolicy::Error,
        }
    }
}

/// Walks an api root and produces an ordered route table.
#[derive(Debug, Clone)]
pub struct RouteResolver {
    root: PathBuf,
    options: ResolverOptions,
}

impl RouteResolver {
    pub fn new(root: impl Into<PathBuf>, options: ResolverOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    /// Build a resolver from the routing section of the configuration.
    pub fn from_config(config: &RoutingConfig) -> Result<Self, RouteResolutionError> {
        let options = ResolverOptions {
            ignore: IgnoreRules::new(config.ignore.iter().cloned())?,
            index_stems: config.index_stems.clone(),
            conflict_policy: config.on_conflict,
        };
        Ok(Self::new(&config.api_root, options))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the route table for the current state of the tree.
    pub fn resolve(&self) -> Result<RouteTable, RouteResolutionError> {
        let root = self.canonical_root()?;
        let mut candidates: Vec<Route> = Vec::new();

        let walker = WalkDir::new(&root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !self
                    .options
                    .ignore
                    .is_ignored(&entry.file_name().to_string_lossy())
            });

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                RouteResolutionError::Unreadable {
                    path,
                    source: e.into(),
                }
            })?;

            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path
                .strip_prefix(&root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");

            let pattern = pattern_from_path(&relative, &self.options.index_stems);
            let module_key = crate::routing::grammar::module_key(&relative);

            tracing::trace!(file = %relative, pattern = %pattern, "Discovered route file");
            candidates.push(Route::new(pattern, path.to_path_buf(), module_key));
        }

        let mut routes = apply_conflict_policy(self.options.conflict_policy, candidates)?;
        // Stable: equal precedence keeps discovery order
        routes.sort_by(|a, b| b.precedence.cmp(&a.precedence));

        tracing::debug!(root = %root.display(), routes = routes.len(), "Route table resolved");
        Ok(RouteTable::from_routes(routes))
    }

    fn canonical_root(&self) -> Result<PathBuf, RouteResolutionError> {
        let metadata = std::fs::metadata(&self.root).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RouteResolutionError::MissingRoot(self.root.clone()),
            _ => RouteResolutionError::Unreadable {
                path: self.root.clone(),
                source: e,
            },
        })?;

        if !metadata.is_dir() {
            return Err(RouteResolutionError::NotADirectory(self.root.clone()));
        }

        std::fs::canonicalize(&self.root).map_err(|source| RouteResolutionError::Unreadable {
            path: self.root.clone(),
            source,
        })
    }
}

/// Drop or reject routes whose shape was already seen.
///
/// Shapes erase capture names, so `/users/:id` and `/users/:name` collide.
fn apply_conflict_policy(
    policy: ConflictPolicy,
    candidates: Vec<Route>,
) -> Result<Vec<Route>, RouteResolutionError> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut routes: Vec<Route> = Vec::with_capacity(candidates.len());

    for route in candidates {
        let shape = route.compiled().shape();
        if let Some(&idx) = seen.get(&shape) {
            let first = &routes[idx];
            match policy {
                ConflictPolicy::Error => {
                    return Err(RouteResolutionError::Conflict {
                        pattern: route.pattern.clone(),
                        first: first.source_file.clone(),
                        second: route.source_file.clone(),
                    });
                }
                ConflictPolicy::FirstWins => {
                    tracing::warn!(
                        pattern = %route.pattern,
                        kept = %first.source_file.display(),
                        dropped = %route.source_file.display(),
                        "Conflicting routes, keeping the first"
                    );
                    continue;
                }
            }
        }
        seen.insert(shape, routes.len());
        routes.push(route);
    }

    Ok(routes)
}

/// Build a table from explicitly configured routes, keeping their order.
///
/// `file` is reported relative to `root`; nothing is read from disk.
/// Endpoints sharing a shape go through the same conflict policy as
/// discovered files.
pub fn resolve_explicit(
    routes: &[ExplicitRoute],
    root: &Path,
    policy: ConflictPolicy,
) -> Result<RouteTable, RouteResolutionError> {
    let candidates = routes
        .iter()
        .map(|r| Route::new(RoutePattern::parse(&r.endpoint), root.join(&r.module), r.module.clone()))
        .collect();
    Ok(RouteTable::from_routes(apply_conflict_policy(policy, candidates)?))
}

/// Build the route table the configuration asks for.
///
/// Explicit routes take priority over filesystem discovery.
pub fn resolve_from_config(config: &RoutingConfig) -> Result<RouteTable, RouteResolutionError> {
    if !config.routes.is_empty() {
        return resolve_explicit(&config.routes, &config.api_root, config.on_conflict);
    }
    RouteResolver::from_config(config)?.resolve()
}
