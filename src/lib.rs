//! Convention-driven request dispatch.
//!
//! Files under an api root become routes; handlers register per module key
//! with their parameter requirements; the dispatcher runs middleware,
//! resolves parameters and wraps results in a uniform envelope.
//!
//! ```text
//! api root ──▶ routing (resolver → RouteTable) ──┐
//!                                                 ▼
//! HTTP ──▶ http (adapt) ──▶ dispatch (match → middleware → params → handler → envelope)
//!                                                 ▲
//! handler code ──▶ registry (MetadataStore → HandlerRegistry)
//! ```

// Core subsystems
pub mod dispatch;
pub mod registry;
pub mod routing;

// Entry points
pub mod auth;
pub mod http;
pub mod lifecycle;

// Cross-cutting concerns
pub mod config;
pub mod observability;

pub use config::schema::AppConfig;
pub use dispatch::{handler_fn, sync_handler, ApiError, Args, Dispatcher, Flow, Middleware};
pub use http::HttpServer;
pub use lifecycle::{serve, Shutdown};
pub use registry::{annotate, HandlerRegistry, MetadataStore};
pub use routing::{RouteResolver, RouteTable};
