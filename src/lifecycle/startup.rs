//! Startup orchestration.
//!
//! Order: logging, metrics, route resolution, listener bind, optional
//! api root watcher, then serve until a signal arrives.

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::{logging, metrics, ObservabilityError};
use crate::registry::store::HandlerRegistry;
use crate::routing::resolver::{RouteResolutionError, RouteResolver};
use crate::routing::watcher::RouteWatcher;

/// Fatal startup or serving errors.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Observability(#[from] ObservabilityError),

    #[error(transparent)]
    Routes(#[from] RouteResolutionError),

    #[error("failed to watch api root: {0}")]
    Watch(#[from] notify::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serve `registry` with the given configuration until Ctrl+C or SIGTERM.
pub async fn serve(config: AppConfig, registry: Arc<HandlerRegistry>) -> Result<(), ServeError> {
    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-dispatch starting");

    if config.observability.metrics_enabled {
        metrics::init_metrics(&config.observability.metrics_address)?;
    }

    let server = HttpServer::new(config.clone(), registry)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        api_root = %config.routing.api_root.display(),
        "Listening for connections"
    );

    // Explicit routes never change, so there is nothing to watch.
    let (_watcher, route_updates) = if config.routing.watch && config.routing.routes.is_empty() {
        let (watcher, updates) = RouteWatcher::new(RouteResolver::from_config(&config.routing)?);
        (Some(watcher.run()?), updates)
    } else {
        let (_, updates) = mpsc::unbounded_channel();
        (None, updates)
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    server.run(listener, route_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
