//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Discovery (at startup, and on api root changes):
//!     api root directory
//!     → resolver.rs (walk, ignore, conflict check)
//!     → grammar.rs (file path → URL pattern + precedence)
//!     → table.rs (freeze as ordered RouteTable)
//!
//! Incoming Request (path)
//!     → table.rs (first route whose shape matches)
//!     → Return: RouteMatch with decoded params, or None
//! ```
//!
//! # Design Decisions
//! - Tables are immutable; reload swaps a whole table
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same tree always yields the same table
//! - First match wins (ordered by precedence)

pub mod grammar;
pub mod ignore;
pub mod resolver;
pub mod table;
pub mod watcher;

pub use grammar::RoutePattern;
pub use resolver::{resolve_from_config, ConflictPolicy, ResolverOptions, RouteResolutionError, RouteResolver};
pub use table::{PathParams, Route, RouteMatch, RouteTable};
pub use watcher::RouteWatcher;
