//! Shutdown on SIGTERM / SIGINT (Ctrl+C elsewhere).

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Turns process signals into a shutdown notification.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Spawns the task that listens for termination signals.
    #[cfg(unix)]
    pub fn spawn_listener(&self) {
        let handle = self.clone();

        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};

            let (mut sigterm, mut sigint) =
                match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                    (Ok(term), Ok(int)) => (term, int),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!("failed to install signal handlers: {}", e);
                        return;
                    }
                };

            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("received SIGINT, shutting down"),
            }
            handle.trigger();
            debug!("signal listener stopped");
        });
    }

    #[cfg(not(unix))]
    pub fn spawn_listener(&self) {
        let handle = self.clone();

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("received Ctrl+C, shutting down");
                handle.trigger();
            }
        });
    }

    /// Requests shutdown without a signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Completes once shutdown has been requested.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        // An error means every sender is gone; nothing can trigger us anymore.
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn wait_blocks_until_triggered() {
        let handle = ShutdownHandle::new();
        let waited = tokio::time::timeout(Duration::from_millis(20), handle.wait()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn trigger_wakes_waiters() {
        let handle = ShutdownHandle::new();
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.wait().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.trigger();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("waiter should finish")
            .unwrap();
    }

    #[tokio::test]
    async fn wait_after_trigger_returns_immediately() {
        let handle = ShutdownHandle::new();
        handle.trigger();
        tokio::time::timeout(Duration::from_millis(100), handle.wait())
            .await
            .unwrap();
    }
}
