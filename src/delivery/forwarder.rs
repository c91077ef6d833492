//! Forwarder workers.
//!
//! # Responsibilities
//! - Drain the outlet with a fixed pool of tasks
//! - Hand each payload body to the worker's transport
//! - Complete every dequeued payload exactly once, delivered or not
//!
//! # Design Decisions
//! - Workers exit once the outlet is closed and empty
//! - A failed delivery is logged and counted, never requeued

use std::time::Instant;

use tokio::task::JoinHandle;

use crate::delivery::outlet::OutletReceiver;
use crate::delivery::transport::Transport;
use crate::observability::metrics;

/// A running pool of forwarder workers.
#[derive(Debug)]
pub struct ForwarderSet {
    handles: Vec<JoinHandle<()>>,
}

impl ForwarderSet {
    /// Spawn `count` workers, each with its own transport from `make_transport`.
    pub fn start<T, F>(count: usize, outlet: OutletReceiver, mut make_transport: F) -> Self
    where
        T: Transport,
        F: FnMut(usize) -> T,
    {
        let handles = (0..count)
            .map(|id| tokio::spawn(run_worker(id, outlet.clone(), make_transport(id))))
            .collect();
        tracing::info!(forwarders = count, "Forwarders started");
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to finish. Workers finish once all outlet
    /// producers are dropped and the queue is drained.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Forwarder task failed");
            }
        }
    }
}

async fn run_worker<T: Transport>(id: usize, outlet: OutletReceiver, mut transport: T) {
    while let Some(payload) = outlet.recv().await {
        let started = Instant::now();
        match transport.transmit(&payload.body).await {
            Ok(()) => {
                metrics::record_delivery(true, started);
                tracing::debug!(
                    forwarder = id,
                    request_id = %payload.request_id,
                    bytes = payload.body.len(),
                    "Payload delivered"
                );
            }
            Err(e) => {
                metrics::record_delivery(false, started);
                tracing::error!(
                    forwarder = id,
                    request_id = %payload.request_id,
                    remote_addr = %payload.source_addr,
                    error = %e,
                    "Payload delivery failed"
                );
            }
        }
        payload.complete();
    }
    tracing::debug!(forwarder = id, "Forwarder stopped");
}
