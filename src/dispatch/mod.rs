//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! http::request (axum Request → IncomingRequest)
//!     → dispatcher.rs (route match, handler lookup)
//!     → context.rs (RequestContext: request namespace + response state)
//!     → middleware.rs (Flow: Continue / Abort / Handled)
//!     → params.rs (sources, fallback, auto-convert)
//!     → handler.rs (positional Args → Result<Value, ApiError>)
//!     → response.rs (envelope or custom formatter; error responder)
//! ```

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod logger;
pub mod middleware;
pub mod params;
pub mod response;

pub use context::{IncomingRequest, RequestContext};
pub use dispatcher::Dispatcher;
pub use error::{ApiError, BoxError};
pub use handler::{handler_fn, sync_handler, Args, Handler};
pub use logger::{LogContextHook, RequestLogger};
pub use middleware::{from_fn, from_sync_fn, Flow, Middleware};
pub use response::{envelope, ResponseFormatter};
