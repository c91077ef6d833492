//! In-flight request tracking for the shutdown drain.
//!
//! # Responsibilities
//! - Count requests admitted past authentication
//! - Refuse admission once shutdown has begun
//! - Let the drain wait until the count reaches zero
//!
//! # Design Decisions
//! - Count lives in a watch channel so waiters wake on change, no polling
//! - Guards decrement on drop, so every exit path of a request is counted

use std::sync::Arc;

use tokio::sync::watch;

use crate::lifecycle::shutdown::Shutdown;

/// Shared in-flight counter.
#[derive(Debug, Clone)]
pub struct InFlight {
    tx: Arc<watch::Sender<usize>>,
}

impl InFlight {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Take a slot unless shutdown has begun.
    ///
    /// The slot is taken before the flag is checked, so a request racing the
    /// trigger is either refused or visible to [`InFlight::wait_idle`].
    pub fn admit(&self, shutdown: &Shutdown) -> Option<InFlightGuard> {
        let guard = self.track();
        if shutdown.is_shutting_down() {
            return None;
        }
        Some(guard)
    }

    /// Take a slot unconditionally. Released when the guard drops.
    pub fn track(&self) -> InFlightGuard {
        self.tx.send_modify(|n| *n += 1);
        InFlightGuard {
            tx: Arc::clone(&self.tx),
        }
    }

    pub fn count(&self) -> usize {
        *self.tx.borrow()
    }

    /// Resolve once no request is in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.tx.subscribe();
        // The sender is held by `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for InFlight {
    fn default() -> Self {
        Self::new()
    }
}

/// One admitted request. Decrements the count when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    tx: Arc<watch::Sender<usize>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tx.send_modify(|n| *n -= 1);
        tracing::trace!("Request left flight");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn guards_count_requests() {
        let inflight = InFlight::new();
        assert_eq!(inflight.count(), 0);

        let g1 = inflight.track();
        let g2 = inflight.track();
        assert_eq!(inflight.count(), 2);

        drop(g1);
        assert_eq!(inflight.count(), 1);
        drop(g2);
        assert_eq!(inflight.count(), 0);
    }

    #[test]
    fn admission_refused_after_shutdown() {
        let inflight = InFlight::new();
        let shutdown = Shutdown::new();

        let admitted = inflight.admit(&shutdown);
        assert!(admitted.is_some());

        shutdown.trigger();
        assert!(inflight.admit(&shutdown).is_none());
        assert_eq!(inflight.count(), 1);
    }

    #[tokio::test]
    async fn wait_idle_blocks_until_last_guard() {
        let inflight = InFlight::new();
        let guard = inflight.track();

        let waiter = {
            let inflight = inflight.clone();
            tokio::spawn(async move { inflight.wait_idle().await })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("drained")
            .unwrap();
    }

    #[tokio::test]
    async fn wait_idle_with_nothing_in_flight() {
        let inflight = InFlight::new();
        tokio::time::timeout(Duration::from_millis(100), inflight.wait_idle())
            .await
            .expect("idle");
    }
}
