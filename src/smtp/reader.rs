//! Buffered, resumable reading of command lines.

use std::io::{ErrorKind, Read};

/// Maximum length of a command line including CRLF (RFC 5321 §4.5.3.1.4).
pub const MAX_COMMAND_LINE: usize = 512;

/// Headroom past the command-line limit so a terminator arriving right at
/// the boundary still fits.
const LINE_SLACK: usize = 4;

/// Outcome of a single read attempt.
#[derive(Debug)]
pub enum ReadOutcome {
    /// Bytes were appended to the buffer.
    Data(usize),
    /// Nothing available right now; retry on the next readiness event.
    WouldBlock,
    /// The peer closed its end of the stream.
    Closed,
    /// Unrecoverable stream error.
    Failed(std::io::Error),
}

/// Accumulates raw bytes until a full `\n`-terminated line is available.
///
/// Capacity is fixed. An unterminated line that reaches the command-line
/// limit shows up through [`LineBuffer::is_over_limit`] and must be
/// discarded by the caller, which bounds memory against hostile input.
#[derive(Debug)]
pub struct LineBuffer {
    buf: [u8; MAX_COMMAND_LINE + LINE_SLACK],
    len: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self { buf: [0; MAX_COMMAND_LINE + LINE_SLACK], len: 0 }
    }

    /// Number of buffered, not yet consumed bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether a command-line's worth of bytes is buffered with no
    /// terminator found.
    pub fn is_over_limit(&self) -> bool {
        self.len >= MAX_COMMAND_LINE
    }

    /// Discards everything buffered so far.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Issues one read attempt into the remaining capacity.
    ///
    /// `Interrupted` is retried on the spot; would-block is a non-error
    /// outcome. A zero-byte read means the peer shut down.
    pub fn fill_from<S: Read>(&mut self, stream: &mut S) -> ReadOutcome {
        if self.len == self.buf.len() {
            return ReadOutcome::WouldBlock;
        }
        loop {
            match stream.read(&mut self.buf[self.len..]) {
                Ok(0) => return ReadOutcome::Closed,
                Ok(n) => {
                    self.len += n;
                    return ReadOutcome::Data(n);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return ReadOutcome::WouldBlock,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return ReadOutcome::Failed(e),
            }
        }
    }

    /// Extracts the first complete line, without its `\n` terminator.
    ///
    /// Bytes after the consumed line are shifted to the front and stay
    /// buffered for the next cycle. Scans for a single line per call, which
    /// is what keeps replies at one per classified line.
    pub fn take_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.buf[..self.len].iter().position(|&b| b == b'\n')?;
        let line = self.buf[..pos].to_vec();
        self.buf.copy_within(pos + 1..self.len, 0);
        self.len -= pos + 1;
        Some(line)
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}
