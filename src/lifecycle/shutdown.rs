//! Shutdown signalling for feature worker tasks.

use tokio::sync::broadcast;

/// Hand-off a feature's stop hook uses to interrupt its worker tasks.
///
/// Wraps a broadcast channel so a single trigger reaches every subscribed
/// task without blocking the stopping side.
pub struct ShutdownSignal {
    tx: broadcast::Sender<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe before spawning a worker task.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger shutdown. A send error just means no worker is running,
    /// which makes triggering safe even if start never completed.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_reaches_subscriber() {
        let signal = ShutdownSignal::new();
        let mut rx = signal.subscribe();
        signal.trigger();
        assert!(rx.recv().await.is_ok());
    }

    #[test]
    fn trigger_without_subscribers_is_benign() {
        let signal = ShutdownSignal::new();
        signal.trigger();
    }
}
