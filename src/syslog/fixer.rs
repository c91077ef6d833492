//! Frame fixer: logplex frames in, octet-counted syslog frames out.
//!
//! Each frame is rewritten in a fixed field order:
//!
//! ```text
//! <len> PRIVAL/VERSION TIMESTAMP HOSTNAME APP-NAME PROCID MSGID [origin ...][<id> ...] MESSAGE
//! ```
//!
//! Header fields are clipped to raw byte caps so the emitted length prefix is
//! exact regardless of the field encoding. Frame order is preserved.

use std::io::{BufRead, Write};

use thiserror::Error;

use crate::config::schema::MetadataConfig;
use crate::security::credentials::Credential;
use crate::syslog::frame::{FrameError, LogFrame, LogplexReader};
use crate::syslog::metadata::{metadata_element, origin_element};

/// Hostname logplex substitutes when the real one is unknown.
pub const LOGPLEX_DEFAULT_HOST: &[u8] = b"host";

pub const MAX_HOSTNAME_LEN: usize = 255;
pub const MAX_APPNAME_LEN: usize = 48;
pub const MAX_PROCID_LEN: usize = 128;
pub const MAX_MSGID_LEN: usize = 32;

/// Per-field truncation counts for one request.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Truncations {
    pub hostname: u64,
    pub app_name: u64,
    pub proc_id: u64,
    pub msg_id: u64,
}

/// Output of a fix pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FixResult {
    /// Frames rewritten.
    pub frames: u64,
    pub truncations: Truncations,
    /// Whether the query metadata element was emitted.
    pub has_metadata: bool,
    /// Octet-counted syslog frames, concatenated.
    pub bytes: Vec<u8>,
}

/// A parse failure, with everything assembled before it.
#[derive(Debug, Error)]
#[error("problem fixing body: {source}")]
pub struct FixError {
    pub partial: FixResult,
    pub source: FrameError,
}

/// Per-request inputs to the fixer.
#[derive(Debug, Clone, Copy)]
pub struct FixParams<'a> {
    pub metadata: &'a MetadataConfig,
    /// Decoded query pairs in request order.
    pub query: &'a [(String, String)],
    pub credential: Option<&'a Credential>,
    /// Client address; empty omits the origin element.
    pub remote_addr: &'a str,
    /// `Logplex-Drain-Token`; empty disables hostname substitution.
    pub drain_token: &'a str,
}

/// Rewrite a logplex body read from `reader`.
pub fn fix<R: BufRead>(params: &FixParams<'_>, reader: R) -> Result<FixResult, FixError> {
    fix_frames(params, LogplexReader::new(reader))
}

/// Rewrite frames from any decoder producing logplex frames.
///
/// Stops at the first decoder error.
pub fn fix_frames<I>(params: &FixParams<'_>, frames: I) -> Result<FixResult, FixError>
where
    I: IntoIterator<Item = Result<LogFrame, FrameError>>,
{
    let origin = origin_element(params.remote_addr);
    let metadata = metadata_element(params.metadata, params.query, params.credential);

    let mut result = FixResult {
        has_metadata: metadata.is_some(),
        ..FixResult::default()
    };
    let mut scratch = Vec::with_capacity(1024);

    for frame in frames {
        let frame = match frame {
            Ok(frame) => frame,
            Err(source) => {
                return Err(FixError {
                    partial: result,
                    source,
                })
            }
        };

        scratch.clear();
        rewrite_frame(
            &mut scratch,
            &frame,
            params.drain_token.as_bytes(),
            &origin,
            metadata.as_deref(),
            &mut result.truncations,
        );

        // Writing to a Vec cannot fail.
        let _ = write!(result.bytes, "{} ", scratch.len());
        result.bytes.extend_from_slice(&scratch);
        result.frames += 1;
    }

    Ok(result)
}

fn rewrite_frame(
    out: &mut Vec<u8>,
    frame: &LogFrame,
    drain_token: &[u8],
    origin: &[u8],
    metadata: Option<&[u8]>,
    truncations: &mut Truncations,
) {
    out.extend_from_slice(frame.prival_version());
    out.push(b' ');
    out.extend_from_slice(frame.timestamp());
    out.push(b' ');

    let host = if frame.hostname() == LOGPLEX_DEFAULT_HOST && !drain_token.is_empty() {
        drain_token
    } else {
        frame.hostname()
    };
    if write_field(out, host, MAX_HOSTNAME_LEN) {
        truncations.hostname += 1;
    }
    out.push(b' ');
    if write_field(out, frame.app_name(), MAX_APPNAME_LEN) {
        truncations.app_name += 1;
    }
    out.push(b' ');
    if write_field(out, frame.proc_id(), MAX_PROCID_LEN) {
        truncations.proc_id += 1;
    }
    out.push(b' ');
    if write_field(out, frame.msg_id(), MAX_MSGID_LEN) {
        truncations.msg_id += 1;
    }

    let message = frame.message();
    if origin.is_empty() && metadata.is_none() {
        if !message.is_empty() {
            out.push(b' ');
            out.extend_from_slice(message);
        }
        return;
    }

    out.push(b' ');
    out.extend_from_slice(origin);
    if let Some(metadata) = metadata {
        out.extend_from_slice(metadata);
    }

    // Nil structured data is superseded by the elements just written. A bare
    // `- ` leaves nothing behind, not even its separator.
    let message = match message {
        b"-" => &[][..],
        [b'-', b' ', rest @ ..] => rest,
        other => other,
    };
    if let Some(&first) = message.first() {
        if first != b'[' {
            out.push(b' ');
        }
        out.extend_from_slice(message);
    }
}

/// Write `value` clipped to `max` bytes. Returns true if it was clipped.
fn write_field(out: &mut Vec<u8>, value: &[u8], max: usize) -> bool {
    if value.len() > max {
        out.extend_from_slice(&value[..max]);
        true
    } else {
        out.extend_from_slice(value);
        false
    }
}
