//! The outlet: a fixed-capacity queue between ingress and forwarders.
//!
//! Capacity is the only backpressure mechanism. Producers wait for a slot
//! until a deadline and then give up; the queue never grows.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{timeout_at, Instant};

use crate::delivery::payload::Payload;
use crate::observability::metrics;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OutletError {
    /// No slot freed up before the deadline.
    #[error("Timeout delivering message")]
    Timeout,
    /// Every forwarder has stopped.
    #[error("Outlet closed")]
    Closed,
}

/// Create an outlet with room for `capacity` payloads.
pub fn outlet(capacity: usize) -> (Outlet, OutletReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let depth = Arc::new(AtomicUsize::new(0));
    (
        Outlet {
            tx,
            depth: Arc::clone(&depth),
        },
        OutletReceiver {
            rx: Arc::new(Mutex::new(rx)),
            depth,
        },
    )
}

/// Producer side, cloned into every request task.
#[derive(Debug, Clone)]
pub struct Outlet {
    tx: mpsc::Sender<Payload>,
    depth: Arc<AtomicUsize>,
}

impl Outlet {
    /// Enqueue `payload`, waiting for a free slot until `deadline`.
    ///
    /// On failure the payload is dropped; nothing reached a forwarder.
    pub async fn send_until(&self, payload: Payload, deadline: Instant) -> Result<(), OutletError> {
        // Counted before the send so a fast consumer never sees it go negative.
        let queued = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        let result = match timeout_at(deadline, self.tx.send(payload)).await {
            Ok(Ok(())) => {
                metrics::record_outlet_depth(queued);
                return Ok(());
            }
            Ok(Err(_)) => Err(OutletError::Closed),
            Err(_) => Err(OutletError::Timeout),
        };
        self.depth.fetch_sub(1, Ordering::SeqCst);
        result
    }

    /// Payloads queued, plus any producer currently waiting for a slot.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

/// Consumer side, shared by the forwarder workers.
///
/// Each payload is handed to exactly one worker and never requeued.
#[derive(Debug, Clone)]
pub struct OutletReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Payload>>>,
    depth: Arc<AtomicUsize>,
}

impl OutletReceiver {
    /// Next payload, or `None` once every producer is gone and the queue
    /// is empty.
    pub async fn recv(&self) -> Option<Payload> {
        let payload = self.rx.lock().await.recv().await?;
        let queued = self.depth.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::record_outlet_depth(queued);
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn payload(id: &str) -> Payload {
        Payload::new("", id, Vec::new()).0
    }

    #[tokio::test]
    async fn full_outlet_times_out() {
        let (tx, _rx) = outlet(1);
        let deadline = Instant::now() + Duration::from_millis(50);

        assert_eq!(tx.send_until(payload("a"), deadline).await, Ok(()));
        assert_eq!(tx.depth(), 1);
        assert_eq!(
            tx.send_until(payload("b"), deadline).await,
            Err(OutletError::Timeout)
        );
        assert_eq!(tx.depth(), 1);
    }

    #[tokio::test]
    async fn dequeue_frees_a_slot() {
        let (tx, rx) = outlet(1);
        let deadline = Instant::now() + Duration::from_secs(1);
        tx.send_until(payload("a"), deadline).await.unwrap();

        let sender = tx.clone();
        let pending = tokio::spawn(async move { sender.send_until(payload("b"), deadline).await });

        assert_eq!(rx.recv().await.unwrap().request_id, "a");
        assert_eq!(pending.await.unwrap(), Ok(()));
        assert_eq!(rx.recv().await.unwrap().request_id, "b");
    }

    #[tokio::test]
    async fn closed_outlet_rejects() {
        let (tx, rx) = outlet(4);
        drop(rx);
        let deadline = Instant::now() + Duration::from_secs(1);
        assert_eq!(
            tx.send_until(payload("a"), deadline).await,
            Err(OutletError::Closed)
        );
    }

    #[tokio::test]
    async fn receiver_ends_after_producers_drop() {
        let (tx, rx) = outlet(4);
        let deadline = Instant::now() + Duration::from_secs(1);
        tx.send_until(payload("a"), deadline).await.unwrap();
        drop(tx);

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }
}
