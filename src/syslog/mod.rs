//! Logplex to syslog rewriting.
//!
//! # Data Flow
//! ```text
//! request body (BufRead)
//!     → frame.rs (LogplexReader: length-prefixed frames, lazily)
//!     → fixer.rs (rewrite header, clip fields, append elements)
//!         ↳ metadata.rs (origin + query metadata elements, once per request)
//!     → FixResult { frames, truncations, has_metadata, bytes }
//! ```
//!
//! # Design Decisions
//! - Pure transform: no I/O beyond the reader it is given
//! - Any iterator of `Result<LogFrame, FrameError>` can feed the fixer
//! - Field caps are byte caps, so length prefixes stay exact

pub mod fixer;
pub mod frame;
pub mod metadata;

pub use fixer::{fix, fix_frames, FixError, FixParams, FixResult, Truncations};
pub use frame::{FrameError, LogFrame, LogplexReader};
