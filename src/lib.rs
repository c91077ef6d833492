//! Logplex Gateway Library
//!
//! Accepts batches of logplex frames over authenticated HTTP, rewrites them
//! into octet-counted syslog frames and forwards them through a bounded
//! outlet to a downstream drain.

pub mod config;
pub mod delivery;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod syslog;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::{InFlight, Shutdown};
