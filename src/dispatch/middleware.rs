//! Handler middleware.
//!
//! Middleware runs strictly in sequence before parameter resolution. Each
//! one decides whether the request continues, aborts with an error, or has
//! already been answered.
//!
//! # Example
//!
//! ```ignore
//! use api_dispatch::dispatch::{from_fn, Flow};
//!
//! let audit = from_fn("audit", |ctx| Box::pin(async move {
//!     ctx.logger().info("audited");
//!     Ok(Flow::Continue)
//! }));
//! ```

use std::fmt;

use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::dispatch::context::RequestContext;
use crate::dispatch::error::ApiError;

/// Outcome of one middleware step.
#[derive(Debug)]
pub enum Flow {
    /// Run the next middleware, then the handler.
    Continue,
    /// Stop and answer through the error responder.
    Abort(ApiError),
    /// Stop; the middleware produced the response itself.
    Handled(Response),
}

/// A single middleware step.
///
/// Returning `Err` is treated exactly like [`Flow::Abort`].
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str {
        "anonymous"
    }

    fn handle<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, Result<Flow, ApiError>>;
}

impl fmt::Debug for dyn Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Middleware({})", self.name())
    }
}

/// Middleware built from an async closure.
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

/// Wrap an async closure as middleware.
pub fn from_fn<F>(name: &'static str, func: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<Flow, ApiError>>
        + Send
        + Sync
        + 'static,
{
    FnMiddleware { name, func }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<Flow, ApiError>>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn handle<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, Result<Flow, ApiError>> {
        (self.func)(ctx)
    }
}

/// Middleware built from a synchronous closure.
pub struct SyncFnMiddleware<F> {
    name: &'static str,
    func: F,
}

/// Wrap a synchronous closure as middleware.
pub fn from_sync_fn<F>(name: &'static str, func: F) -> SyncFnMiddleware<F>
where
    F: Fn(&mut RequestContext) -> Result<Flow, ApiError> + Send + Sync + 'static,
{
    SyncFnMiddleware { name, func }
}

impl<F> Middleware for SyncFnMiddleware<F>
where
    F: Fn(&mut RequestContext) -> Result<Flow, ApiError> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn handle<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, Result<Flow, ApiError>> {
        let outcome = (self.func)(ctx);
        Box::pin(std::future::ready(outcome))
    }
}
