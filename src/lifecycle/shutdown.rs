//! Stop signal shared by the server and the signal listener.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::lifecycle::signals::wait_for_signal;

/// Fan-out stop signal.
///
/// Cloning shares the same channel; any clone may fire it.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal, returning how many receivers were listening.
    pub fn trigger(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }

    /// Fire once Ctrl+C or SIGTERM arrives.
    pub fn trigger_on_signal(&self) -> JoinHandle<()> {
        let shutdown = self.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            let notified = shutdown.trigger();
            tracing::info!(notified, "Shutdown requested");
        })
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve when the signal fires or every `Shutdown` handle is gone.
pub async fn stopped(mut rx: broadcast::Receiver<()>) {
    // Lagged only happens after a send, so any outcome means stop.
    let _ = rx.recv().await;
}
