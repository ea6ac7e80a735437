//! Process shutdown coordination.
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::Result;
use tokio::{signal, sync::broadcast};

/// Why the process is going down.
#[derive(Debug, Clone, Copy)]
pub enum ShutdownReason {
    /// SIGINT / SIGTERM, or an explicit trigger.
    Graceful,
    /// The broadcast channel closed without a signal being published.
    Force,
}

/// Fan-out point for shutdown notifications. One instance per process: tasks
/// subscribe, the OS signal handler (or a test) publishes.
pub struct GracefulShutdown {
    tx: broadcast::Sender<ShutdownReason>,
    initiated: AtomicBool,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(8);
        Self {
            tx,
            initiated: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownReason> {
        self.tx.subscribe()
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.initiated.load(Ordering::Relaxed)
    }

    /// Publish a shutdown exactly once; later calls are ignored.
    pub fn trigger_shutdown(&self, reason: ShutdownReason) -> Result<()> {
        if self
            .initiated
            .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            tracing::info!(?reason, "shutdown triggered");
            // No subscribers is fine; the select in main may already be gone.
            let _ = self.tx.send(reason);
        }
        Ok(())
    }

    /// Block on SIGINT / SIGTERM and publish a graceful shutdown for
    /// whichever arrives first.
    pub async fn run_signal_handler(&self) -> Result<()> {
        tokio::select! {
            _ = signal::ctrl_c() => tracing::info!("SIGINT received"),
            _ = sigterm() => tracing::info!("SIGTERM received"),
        }
        self.trigger_shutdown(ShutdownReason::Graceful)
    }

    /// Wait until some task publishes a shutdown.
    pub async fn wait_for_shutdown_signal(&self) -> ShutdownReason {
        match self.subscribe().recv().await {
            Ok(reason) => reason,
            Err(_) => {
                tracing::warn!("shutdown channel closed without a signal");
                ShutdownReason::Force
            }
        }
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn sigterm() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::error!("failed to register SIGTERM handler: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn sigterm() {
    // Only Ctrl+C is available here.
    std::future::pending::<()>().await;
}
