//! Resumable transmission of reply lines.

use std::io::{ErrorKind, Write};

use bytes::Bytes;

/// Outcome of a single write attempt.
#[derive(Debug)]
pub enum WriteOutcome {
    /// The whole payload has now been transmitted.
    Complete,
    /// Some bytes were accepted; call again to continue.
    Partial,
    /// The socket cannot take anything right now; retry on the next
    /// readiness event.
    WouldBlock,
    /// Unrecoverable stream error.
    Failed(std::io::Error),
}

/// Resumable writer for a single reply.
///
/// Holds the payload and a cursor of bytes already accepted by the socket,
/// so one reply can straddle any number of event-loop iterations. At most
/// one `ReplyWriter` exists per connection at a time.
#[derive(Debug)]
pub struct ReplyWriter {
    payload: Bytes,
    written: usize,
}

impl ReplyWriter {
    pub fn new(payload: Bytes) -> Self {
        Self { payload, written: 0 }
    }

    /// Bytes not yet accepted by the socket.
    pub fn remaining(&self) -> usize {
        self.payload.len() - self.written
    }

    /// Issues one write attempt for the remaining bytes.
    ///
    /// `Interrupted` is retried on the spot. A zero-byte write outside of
    /// would-block means the peer is gone and counts as failure.
    pub fn write_to<S: Write>(&mut self, stream: &mut S) -> WriteOutcome {
        loop {
            match stream.write(&self.payload[self.written..]) {
                Ok(0) => return WriteOutcome::Failed(ErrorKind::WriteZero.into()),
                Ok(n) => {
                    self.written += n;
                    return if self.written == self.payload.len() {
                        WriteOutcome::Complete
                    } else {
                        WriteOutcome::Partial
                    };
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return WriteOutcome::WouldBlock,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return WriteOutcome::Failed(e),
            }
        }
    }
}

/// Fires one write attempt for a final notice and ignores the result.
///
/// Used on the way to closing a connection, where nothing can be done about
/// a failure anymore.
pub fn send_best_effort<S: Write>(stream: &mut S, payload: &[u8]) {
    let _ = stream.write(payload);
}
