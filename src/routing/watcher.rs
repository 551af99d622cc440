//! Api root watcher for route table hot reload.

use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::routing::resolver::RouteResolver;
use crate::routing::table::RouteTable;

/// Watches the api root and re-resolves routes whenever files change.
pub struct RouteWatcher {
    resolver: RouteResolver,
    update_tx: mpsc::UnboundedSender<RouteTable>,
}

impl RouteWatcher {
    /// Create a new RouteWatcher.
    ///
    /// Returns the watcher and a receiver for fresh route tables.
    pub fn new(resolver: RouteResolver) -> (Self, mpsc::UnboundedReceiver<RouteTable>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (Self { resolver, update_tx }, update_rx)
    }

    /// Start watching in a background thread.
    ///
    /// The returned handle must be kept alive for events to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let resolver = self.resolver.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        tracing::info!(paths = ?event.paths, "Api root change detected, resolving routes...");
                        match resolver.resolve() {
                            Ok(table) => {
                                let _ = tx.send(table);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to resolve routes. Keeping current table.");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(self.resolver.root(), RecursiveMode::Recursive)?;

        tracing::info!(root = %self.resolver.root().display(), "Route watcher started");
        Ok(watcher)
    }
}
