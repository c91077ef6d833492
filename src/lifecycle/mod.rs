//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger (once)
//!
//! Shutdown (shutdown.rs):
//!     flag flips → new admissions and health checks get 503
//!     broadcast → HTTP server and main loop wake
//!
//! Drain (inflight.rs):
//!     main waits until every admitted request has finished → exit
//! ```
//!
//! # Design Decisions
//! - Two phases: stop admission first, then drain in-flight requests
//! - Admission takes its slot before checking the flag, so no request
//!   slips between the trigger and the drain

pub mod inflight;
pub mod shutdown;
pub mod signals;

pub use inflight::{InFlight, InFlightGuard};
pub use shutdown::Shutdown;
