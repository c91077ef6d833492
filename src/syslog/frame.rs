//! Streaming logplex frame decoder.
//!
//! A logplex body is a run of `<len> <frame>` units, where `<len>` is the
//! ASCII-decimal byte length of `<frame>`. Each frame is an RFC 5424 syslog
//! line whose first six space-separated tokens form the header:
//!
//! ```text
//! <PRI>VERSION TIMESTAMP HOSTNAME APP-NAME PROCID MSGID [STRUCTURED-DATA] MSG
//! ```
//!
//! The decoder pulls bytes from a [`BufRead`] one frame at a time, so a body
//! never has to be resident in memory as a whole.

use std::io::{self, BufRead, Read};
use std::ops::Range;

use thiserror::Error;

/// Longest length prefix accepted, in digits.
const MAX_PREFIX_DIGITS: usize = 10;

/// Number of space-terminated header tokens preceding the message.
const HEADER_FIELDS: usize = 6;

/// Errors produced while decoding a logplex body.
///
/// Frame numbers are 1-based and count frames in body order.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The length prefix was missing, non-numeric or unterminated.
    #[error("malformed length prefix for frame {frame}")]
    BadLength { frame: usize },

    /// The body ended before the declared frame length was read.
    #[error("frame {frame} truncated: declared {declared} bytes, read {actual}")]
    Truncated {
        frame: usize,
        declared: usize,
        actual: usize,
    },

    /// The frame did not carry the six syslog header fields.
    #[error("frame {frame} has {found} of 6 header fields")]
    MalformedHeader { frame: usize, found: usize },

    /// The underlying reader failed (body stream or decompression).
    #[error("body read failed: {0}")]
    Io(#[from] io::Error),
}

/// One decoded logplex frame.
///
/// Owns the frame bytes; the header accessors return slices into them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFrame {
    buf: Vec<u8>,
    header: [Range<usize>; HEADER_FIELDS],
    message: usize,
}

impl LogFrame {
    /// Split a frame into header tokens and message.
    ///
    /// On failure returns how many header fields were found.
    pub fn parse(buf: Vec<u8>) -> Result<Self, usize> {
        let mut header: [Range<usize>; HEADER_FIELDS] = Default::default();
        let mut pos = 0;

        for (i, slot) in header.iter_mut().enumerate() {
            match buf[pos..].iter().position(|&b| b == b' ') {
                Some(offset) => {
                    *slot = pos..pos + offset;
                    pos += offset + 1;
                }
                // MSGID may close the frame without a trailing space.
                None if i == HEADER_FIELDS - 1 && pos < buf.len() => {
                    *slot = pos..buf.len();
                    pos = buf.len();
                }
                None => {
                    let found = if pos < buf.len() { i + 1 } else { i };
                    return Err(found);
                }
            }
        }

        Ok(Self {
            buf,
            header,
            message: pos,
        })
    }

    pub fn prival_version(&self) -> &[u8] {
        &self.buf[self.header[0].clone()]
    }

    pub fn timestamp(&self) -> &[u8] {
        &self.buf[self.header[1].clone()]
    }

    pub fn hostname(&self) -> &[u8] {
        &self.buf[self.header[2].clone()]
    }

    pub fn app_name(&self) -> &[u8] {
        &self.buf[self.header[3].clone()]
    }

    pub fn proc_id(&self) -> &[u8] {
        &self.buf[self.header[4].clone()]
    }

    pub fn msg_id(&self) -> &[u8] {
        &self.buf[self.header[5].clone()]
    }

    /// Structured data and message: everything after the MSGID separator.
    pub fn message(&self) -> &[u8] {
        &self.buf[self.message..]
    }
}

/// Lazy, non-restartable iterator over the frames of a logplex body.
///
/// Yields `Ok(frame)` per frame and stops after the first `Err`.
/// ASCII whitespace between frames is skipped.
pub struct LogplexReader<R> {
    inner: R,
    frames: usize,
    done: bool,
}

impl<R: BufRead> LogplexReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            frames: 0,
            done: false,
        }
    }

    /// Number of frames started so far, including a failed one.
    pub fn frames_read(&self) -> usize {
        self.frames
    }

    /// Skip inter-frame whitespace. Returns false at a clean end of body.
    fn skip_whitespace(&mut self) -> Result<bool, FrameError> {
        loop {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                return Ok(false);
            }
            let skip = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
            let more = skip < buf.len();
            self.inner.consume(skip);
            if more {
                return Ok(true);
            }
        }
    }

    fn read_length(&mut self) -> Result<usize, FrameError> {
        let frame = self.frames;
        let mut len: usize = 0;
        let mut digits = 0;

        loop {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                return Err(FrameError::BadLength { frame });
            }

            let mut used = 0;
            let mut terminated = false;
            for &b in buf {
                used += 1;
                match b {
                    b'0'..=b'9' if digits < MAX_PREFIX_DIGITS => {
                        let next = len
                            .checked_mul(10)
                            .and_then(|n| n.checked_add(usize::from(b - b'0')));
                        len = match next {
                            Some(n) => n,
                            None => return Err(FrameError::BadLength { frame }),
                        };
                        digits += 1;
                    }
                    b' ' if digits > 0 => {
                        terminated = true;
                        break;
                    }
                    _ => return Err(FrameError::BadLength { frame }),
                }
            }

            self.inner.consume(used);
            if terminated {
                return Ok(len);
            }
        }
    }

    fn read_frame(&mut self) -> Result<Option<LogFrame>, FrameError> {
        if !self.skip_whitespace()? {
            return Ok(None);
        }
        self.frames += 1;
        let frame = self.frames;

        let declared = self.read_length()?;

        // Grow with the bytes actually read rather than trusting the prefix.
        let mut buf = Vec::with_capacity(declared.min(64 * 1024));
        let actual = (&mut self.inner).take(declared as u64).read_to_end(&mut buf)?;
        if actual < declared {
            return Err(FrameError::Truncated {
                frame,
                declared,
                actual,
            });
        }

        LogFrame::parse(buf)
            .map(Some)
            .map_err(|found| FrameError::MalformedHeader { frame, found })
    }
}

impl<R: BufRead> Iterator for LogplexReader<R> {
    type Item = Result<LogFrame, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
