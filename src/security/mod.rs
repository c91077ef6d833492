//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (X-Forwarded-Proto check, client address, ids)
//!     → credentials.rs (HTTP Basic against the token table)
//!     → Credential passed on to the fixer for deprecation tagging
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any check failure
//! - Token table is read-only after startup
//! - Secrets are compared in constant time and never logged

pub mod credentials;
pub mod headers;

pub use credentials::{AuthError, Credential, CredentialStore};
