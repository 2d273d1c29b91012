//! Shutdown coordination for the proxy.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// The listener subscribes and stops accepting when triggered; sessions
/// already running are left to finish on their own.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

/// Room for repeated triggers before a slow subscriber lags.
const SIGNAL_CAPACITY: usize = 16;

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal. Safe to call more than once.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
