//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, body limit, tracing)
//!     → logs.rs (admission → fixer → outlet → acknowledgment)
//!     → health.rs (serving / shutting down)
//!     → error.rs (IngressError → status + plain-text body)
//! ```

pub mod error;
pub mod health;
pub mod logs;
pub mod server;

pub use error::IngressError;
pub use server::{AppState, HttpServer};
