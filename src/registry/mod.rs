//! Handler metadata registry.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     annotate.rs (config fragments)
//!     → store.rs MetadataStore (attach / map_verb / register, merged)
//!     → freeze()
//!     → HandlerRegistry (immutable, shared via Arc)
//!
//! Per request:
//!     (module key, method) → HandlerRegistry::resolve → ResolvedHandler
//! ```
//!
//! # Design Decisions
//! - Explicit registration replaces runtime reflection: each handler
//!   declares its ordered parameter names
//! - Fragments merge: lists append, scalars are last-wins

pub mod annotate;
pub mod config;
pub mod requirement;
pub mod store;

pub use config::HandlerConfig;
pub use requirement::{Namespace, ParameterRequirement, SourcePath};
pub use store::{HandlerBuilder, HandlerKey, HandlerRegistry, MetadataStore, ModuleBuilder, ResolvedHandler};
