//! Ready-token framing of the worker's merged output.
//!
//! [`split_frame`] is the pure scan: it never allocates and can be called
//! again on the same bytes. [`FrameSplitter`] owns the accumulation buffer and
//! a resume cursor so a slowly growing frame is not rescanned from the start.

use super::error::{WorkerError, WorkerResult};

/// Outcome of one scan.
#[derive(Debug, PartialEq, Eq)]
pub enum Split<'a> {
    /// No token yet; nothing was consumed.
    NeedMore,
    /// A complete frame and the number of bytes it consumed, token included.
    Frame { frame: &'a [u8], consumed: usize },
    /// The stream ended on a frame boundary.
    Finished,
}

/// Scan `data` for the first `token`.
///
/// At end of stream with leftover bytes and no token, the worker died or wrote
/// malformed output mid-query, which is reported as a desync.
pub fn split_frame<'a>(data: &'a [u8], token: &[u8], at_eof: bool) -> WorkerResult<Split<'a>> {
    match find(data, token) {
        Some(i) => Ok(Split::Frame {
            frame: &data[..i],
            consumed: i + token.len(),
        }),
        None if at_eof && !data.is_empty() => Err(WorkerError::desync(
            "ready token not found at end of stream",
        )),
        None if at_eof => Ok(Split::Finished),
        None => Ok(Split::NeedMore),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Incremental frame scanner over an accumulation buffer.
#[derive(Debug)]
pub struct FrameSplitter {
    token: Vec<u8>,
    buf: Vec<u8>,
    scanned: usize,
    max_frame: usize,
}

impl FrameSplitter {
    /// Create a splitter with a pre-allocated buffer and a frame ceiling.
    pub fn new(token: impl Into<Vec<u8>>, initial_capacity: usize, max_frame: usize) -> Self {
        Self {
            token: token.into(),
            buf: Vec::with_capacity(initial_capacity),
            scanned: 0,
            max_frame,
        }
    }

    /// Append freshly read bytes.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes waiting for a token.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Take the next complete frame, if any.
    ///
    /// Returns `Ok(None)` when more input is needed, or when the stream ended
    /// cleanly with nothing buffered.
    pub fn next_frame(&mut self, at_eof: bool) -> WorkerResult<Option<Vec<u8>>> {
        // A token may straddle the previous scan boundary.
        let from = self.scanned.saturating_sub(self.token.len().saturating_sub(1));
        let found = match split_frame(&self.buf[from..], &self.token, false)? {
            Split::Frame { frame, consumed } => Some((from + frame.len(), from + consumed)),
            Split::NeedMore | Split::Finished => None,
        };

        if let Some((end, consumed)) = found {
            if end > self.max_frame {
                return Err(WorkerError::OversizedFrame {
                    limit: self.max_frame,
                });
            }
            let frame = self.buf[..end].to_vec();
            self.buf.drain(..consumed);
            self.scanned = 0;
            return Ok(Some(frame));
        }

        self.scanned = self.buf.len();
        // The tail may hold the start of a token that is still arriving.
        if self.buf.len() > self.max_frame + self.token.len().saturating_sub(1) {
            return Err(WorkerError::OversizedFrame {
                limit: self.max_frame,
            });
        }
        if at_eof && !self.buf.is_empty() {
            return Err(WorkerError::desync("ready token not found at end of stream"));
        }
        Ok(None)
    }
}
