//! Shutdown coordination for the gateway.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Holds the process-wide "shutting down" flag and a broadcast channel that
/// every long-running task can wait on. The flag flips exactly once; later
/// triggers are no-ops.
#[derive(Debug, Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    triggered: AtomicBool,
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            inner: Arc::new(Inner {
                triggered: AtomicBool::new(false),
                tx,
            }),
        }
    }

    /// Subscribe to the shutdown signal.
    ///
    /// A receiver created after the trigger never sees the broadcast; use
    /// [`Shutdown::wait`] unless the subscription predates the trigger.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.inner.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    ///
    /// Returns `true` for the call that actually flipped the flag.
    pub fn trigger(&self) -> bool {
        if self.inner.triggered.swap(true, Ordering::SeqCst) {
            return false;
        }
        let _ = self.inner.tx.send(());
        true
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown has been triggered, including if it already was.
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        if self.is_shutting_down() {
            return;
        }
        // The sender lives in `inner`, so only the trigger wakes this.
        let _ = rx.recv().await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
