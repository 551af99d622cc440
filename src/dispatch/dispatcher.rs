//! Request dispatcher.
//!
//! # Data Flow
//! ```text
//! IncomingRequest
//!     → RouteTable::match_path      (none → NotFound)
//!     → HandlerRegistry::resolve    (no module / verb → NotFound)
//!     → middleware, in order        (Abort / Err / panic → error responder,
//!                                    Handled → response as-is)
//!     → resolve_parameters          (missing required → MissingParameter)
//!     → Handler::call               (Err / panic → error responder)
//!     → render (formatter or envelope)
//! ```
//!
//! # Design Decisions
//! - Exactly one response per request; every failure goes through
//!   `error_response`
//! - Route table behind `ArcSwap`; a reload never blocks requests
//! - Panics in middleware or handlers become a 500, not a dropped connection

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::response::Response;
use futures_util::FutureExt;
use tracing::Instrument;

use crate::dispatch::context::{IncomingRequest, RequestContext};
use crate::dispatch::error::ApiError;
use crate::dispatch::handler::Args;
use crate::dispatch::logger::{LogContextHook, RequestLogger};
use crate::dispatch::middleware::Flow;
use crate::dispatch::params::resolve_parameters;
use crate::dispatch::response::{error_response, render};
use crate::observability::metrics;
use crate::registry::store::{HandlerRegistry, ResolvedHandler};
use crate::routing::table::RouteTable;

/// Route label used in metrics when nothing matched.
const UNMATCHED_ROUTE: &str = "none";

/// Dispatches requests against the current route table and registry.
pub struct Dispatcher {
    routes: ArcSwap<RouteTable>,
    registry: Arc<HandlerRegistry>,
    log_context: Option<LogContextHook>,
}

impl Dispatcher {
    pub fn new(routes: RouteTable, registry: Arc<HandlerRegistry>) -> Self {
        metrics::set_route_table_size(routes.len());
        Self {
            routes: ArcSwap::from_pointee(routes),
            registry,
            log_context: None,
        }
    }

    /// Add fields to every request's log context.
    pub fn with_log_context(mut self, hook: LogContextHook) -> Self {
        self.log_context = Some(hook);
        self
    }

    /// Atomically replace the route table.
    pub fn replace_routes(&self, routes: RouteTable) {
        let unregistered = self.registry.unregistered(&routes).len();
        if unregistered > 0 {
            tracing::warn!(count = unregistered, "Routes without registered handlers");
        }
        metrics::set_route_table_size(routes.len());
        tracing::info!(routes = routes.len(), "Route table replaced");
        self.routes.store(Arc::new(routes));
    }

    /// Snapshot of the current route table.
    pub fn routes(&self) -> Arc<RouteTable> {
        self.routes.load_full()
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Handle one request, always producing exactly one response.
    pub async fn dispatch(&self, request: IncomingRequest) -> Response {
        let start = Instant::now();
        let method = request.method.to_string();
        let logger = RequestLogger::for_request(&request, self.log_context.as_ref());
        let span = logger.span().clone();

        let (response, route) = self.run(request, logger).instrument(span).await;

        metrics::record_request(&method, response.status().as_u16(), &route, start);
        response
    }

    async fn run(&self, request: IncomingRequest, logger: RequestLogger) -> (Response, String) {
        let routes = self.routes.load_full();

        let Some(matched) = routes.match_path(request.uri.path()) else {
            tracing::debug!(path = %request.uri.path(), "No route matched");
            return (
                error_response(&ApiError::NotFound, Some(&logger)),
                UNMATCHED_ROUTE.to_string(),
            );
        };
        let route = matched.route.pattern.clone();

        let handler = match self.registry.resolve(&matched.route.module_key, &request.method) {
            Ok(handler) => handler,
            Err(err) => {
                tracing::debug!(
                    module = %matched.route.module_key,
                    method = %request.method,
                    "No handler for verb"
                );
                return (error_response(&err, Some(&logger)), route);
            }
        };

        let mut ctx = RequestContext::new(request, matched.params, logger);
        let response = match execute(&handler, &mut ctx).await {
            Ok(response) => response,
            Err(err) => error_response(&err, Some(ctx.logger())),
        };
        (response, route)
    }
}

async fn execute(handler: &ResolvedHandler, ctx: &mut RequestContext) -> Result<Response, ApiError> {
    for middleware in &handler.config.middleware {
        let step = &mut *ctx;
        let outcome = AssertUnwindSafe(async move { middleware.handle(step).await })
            .catch_unwind()
            .await
            .map_err(|panic| {
                ApiError::internal(format!(
                    "middleware '{}' panicked: {}",
                    middleware.name(),
                    panic_message(&*panic)
                ))
            })??;

        match outcome {
            Flow::Continue => {}
            Flow::Abort(err) => {
                tracing::debug!(middleware = middleware.name(), "Middleware aborted request");
                return Err(err);
            }
            Flow::Handled(response) => {
                tracing::debug!(middleware = middleware.name(), "Middleware answered request");
                return Ok(response);
            }
        }
    }

    let resolved = resolve_parameters(ctx, &handler.requirements)?;
    let values = handler
        .param_names
        .iter()
        .map(|name| {
            let value = resolved
                .iter()
                .find(|(n, _)| n == name)
                .and_then(|(_, v)| v.clone());
            (name.clone(), value)
        })
        .collect();
    let args = Args::new(values, ctx.logger().clone());

    let output = AssertUnwindSafe(async move { handler.handler.call(args).await })
        .catch_unwind()
        .await
        .map_err(|panic| {
            ApiError::internal(format!(
                "handler '{}' panicked: {}",
                handler.key,
                panic_message(&*panic)
            ))
        })??;

    Ok(render(
        output,
        ctx.status(),
        handler.config.response_formatter.as_ref(),
        handler.config.response_content_type.as_deref(),
        ctx.response_headers(),
    ))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(RouteTable::default(), Arc::new(HandlerRegistry::default()))
    }
}
