//! Graceful shutdown fan-out.
//!
//! The signal task owns a [`Shutdown`]; the HTTP server and any background
//! task hold a receiver from [`Shutdown::subscribe`] and stop once it fires.

use tokio::sync::broadcast;

#[derive(Debug, Clone)]
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

    /// Fire once. A trigger with nobody subscribed is dropped.
    pub fn trigger(&self) {
        if self.tx.send(()).is_err() {
            tracing::debug!("Shutdown triggered with no listeners");
        }
    }

    /// Receivers not yet dropped.
    pub fn listeners(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Resolves when `rx` is triggered or its sender is gone.
    pub async fn notified(mut rx: broadcast::Receiver<()>) {
        let _ = rx.recv().await;
        tracing::info!("Shutdown signal received");
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
