//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with one catch-all route feeding the dispatcher
//! - Wire up middleware (request ID, tracing)
//! - Bound each request by the configured timeout, answering with the
//!   failure envelope when it elapses
//! - Adapt requests (body limit, cookie and body parsing)
//! - Swap in new route tables while serving
//! - Shut down gracefully on the shutdown signal

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::dispatch::dispatcher::Dispatcher;
use crate::dispatch::error::ApiError;
use crate::dispatch::response::error_response;
use crate::http::request::adapt_request;
use crate::lifecycle::shutdown::stopped;
use crate::registry::store::HandlerRegistry;
use crate::routing::resolver::{resolve_from_config, RouteResolutionError};
use crate::routing::table::RouteTable;

/// Application state injected into the catch-all handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub standard_parsing: bool,
    pub max_body_size: usize,
    pub request_timeout: Duration,
}

/// HTTP entry point for the dispatcher.
pub struct HttpServer {
    router: Router,
    dispatcher: Arc<Dispatcher>,
    config: AppConfig,
}

impl HttpServer {
    /// Resolve routes from configuration and build the server.
    pub fn new(config: AppConfig, registry: Arc<HandlerRegistry>) -> Result<Self, RouteResolutionError> {
        let routes = resolve_from_config(&config.routing)?;
        for route in registry.unregistered(&routes) {
            tracing::warn!(
                endpoint = %route.pattern,
                module = %route.module_key,
                "Route has no registered handlers"
            );
        }
        Ok(Self::with_dispatcher(config, Dispatcher::new(routes, registry)))
    }

    /// Build the server around a ready dispatcher.
    pub fn with_dispatcher(config: AppConfig, dispatcher: Dispatcher) -> Self {
        let dispatcher = Arc::new(dispatcher);
        let state = AppState {
            dispatcher: dispatcher.clone(),
            standard_parsing: config.dispatch.load_standard_middleware,
            max_body_size: config.dispatch.max_body_size,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };
        let router = Self::build_router(state);
        Self {
            router,
            dispatcher,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Route tables received on `route_updates` replace the active table.
    /// Returns once `shutdown` fires and in-flight requests drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut route_updates: mpsc::UnboundedReceiver<RouteTable>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.dispatcher.routes().len(),
            "HTTP server starting"
        );

        let dispatcher = self.dispatcher.clone();
        let updater = tokio::spawn(async move {
            while let Some(table) = route_updates.recv().await {
                dispatcher.replace_routes(table);
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                stopped(shutdown).await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        updater.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: adapt the request, then dispatch it within the
/// request timeout.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let work = async {
        match adapt_request(request, state.standard_parsing, state.max_body_size).await {
            Ok(incoming) => state.dispatcher.dispatch(incoming).await,
            Err(err) => error_response(&err, None),
        }
    };

    match tokio::time::timeout(state.request_timeout, work).await {
        Ok(response) => response,
        Err(elapsed) => error_response(
            &ApiError::with_source("Request timed out", StatusCode::REQUEST_TIMEOUT, elapsed),
            None,
        ),
    }
}
