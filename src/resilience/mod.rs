//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarder transmit failure:
//!     → backoff.rs (exponential delay with jitter)
//!     → transport reconnects and retries until attempts run out
//! ```
//!
//! # Design Decisions
//! - Jittered backoff keeps forwarders from reconnecting in lockstep
//! - Delays are capped; the per-request deadline bounds the total wait

pub mod backoff;
