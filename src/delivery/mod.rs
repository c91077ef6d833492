//! Delivery pipeline.
//!
//! # Data Flow
//! ```text
//! ingress request task
//!     → payload.rs (Payload + Acknowledgement)
//!     → outlet.rs (bounded queue, deadline-limited enqueue)
//!     → forwarder.rs (worker pool, one payload per worker at a time)
//!     → transport.rs (TCP drain, reconnect with backoff)
//!     → Payload::complete → Acknowledgement::wait in the request task
//! ```
//!
//! # Design Decisions
//! - Outlet capacity is the only backpressure; nothing grows unbounded
//! - At-most-once hand-off: a dequeued payload is never requeued
//! - No ordering across payloads; frame order within one is preserved

pub mod forwarder;
pub mod outlet;
pub mod payload;
pub mod transport;

pub use forwarder::ForwarderSet;
pub use outlet::{outlet, Outlet, OutletError, OutletReceiver};
pub use payload::{Abandoned, Acknowledgement, Payload};
pub use transport::{TcpTransport, Transport, TransportError};
