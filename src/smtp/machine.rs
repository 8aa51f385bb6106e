//! Per-connection protocol state machine.

use std::io::{Read, Write};

use bytes::Bytes;
use tracing::debug;

use crate::smtp::command::Command;
use crate::smtp::reader::{LineBuffer, ReadOutcome};
use crate::smtp::reply::Replies;
use crate::smtp::writer::{ReplyWriter, WriteOutcome};

/// Which step of the refusal conversation a connection is at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The 554 greeting has not finished going out yet.
    Greeting,
    /// Waiting for, or mid-way through, a command line.
    AwaitLine,
    /// Sending the 221 goodbye; close once it is out.
    QuitReply,
    /// Sending the 250 acknowledgement; then back to reading.
    NoopReply,
    /// Sending the 500 error; then back to reading.
    SyntaxReply,
    /// Sending the 503 refusal; then back to reading.
    BadSequenceReply,
    /// Conversation over; the connection is to be closed.
    Done,
    /// Stream failure; one best-effort 421, then close.
    Failed,
}

/// Readiness permissions granted for one invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Readiness {
    pub can_read: bool,
    pub can_write: bool,
}

/// What the dispatcher should do with the connection afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    KeepOpen,
    Close,
}

/// Result of driving the machine once.
#[derive(Debug)]
pub struct Driven {
    pub signal: Signal,
    /// Whether any read or write made progress; refreshes the idle deadline.
    pub progressed: bool,
}

/// Whether an I/O step can hand control back to the phase loop or has to
/// yield back to the dispatcher.
enum Step {
    Advance,
    Yield,
}

/// The protocol state for one connection.
///
/// All resumable I/O state lives here, so the machine can be re-entered on
/// every readiness event without hazards: a partially sent reply keeps its
/// cursor, a partially received line keeps its bytes.
#[derive(Debug)]
pub struct Machine {
    phase: Phase,
    line: LineBuffer,
    pending: Option<ReplyWriter>,
}

impl Machine {
    pub fn new() -> Self {
        Self {
            phase: Phase::Greeting,
            line: LineBuffer::new(),
            pending: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Runs phase transitions until no further progress is possible with the
    /// granted permissions, or a terminal phase is reached.
    ///
    /// Under edge-triggered readiness this draining is mandatory: returning
    /// with doable work left would strand the connection waiting for a
    /// notification that never comes.
    pub fn drive<S>(&mut self, stream: &mut S, ready: Readiness, replies: &Replies) -> Driven
    where
        S: Read + Write,
    {
        let mut progressed = false;
        loop {
            match self.phase {
                Phase::Greeting => {
                    if !ready.can_write {
                        return keep_open(progressed);
                    }
                    if let Step::Yield =
                        self.step_write(stream, &replies.greeting, Phase::AwaitLine, &mut progressed)
                    {
                        return keep_open(progressed);
                    }
                }

                Phase::AwaitLine => {
                    if !ready.can_read {
                        return keep_open(progressed);
                    }
                    let mut stalled = false;
                    match self.line.fill_from(stream) {
                        ReadOutcome::Data(_) => progressed = true,
                        ReadOutcome::WouldBlock => stalled = true,
                        ReadOutcome::Closed => {
                            self.fail();
                            continue;
                        }
                        ReadOutcome::Failed(e) => {
                            debug!("read failed: {}", e);
                            self.fail();
                            continue;
                        }
                    }

                    if let Some(line) = self.line.take_line() {
                        self.phase = match Command::classify(&line) {
                            Command::Quit => Phase::QuitReply,
                            Command::Noop => Phase::NoopReply,
                            Command::Empty => Phase::SyntaxReply,
                            Command::Unknown => Phase::BadSequenceReply,
                        };
                        continue;
                    }
                    if self.line.is_over_limit() {
                        self.line.clear();
                        self.phase = Phase::SyntaxReply;
                        continue;
                    }
                    if stalled {
                        return keep_open(progressed);
                    }
                    // no complete line yet, but the socket may hold more
                }

                Phase::QuitReply => {
                    if !ready.can_write {
                        return keep_open(progressed);
                    }
                    if let Step::Yield =
                        self.step_write(stream, &replies.quit, Phase::Done, &mut progressed)
                    {
                        return keep_open(progressed);
                    }
                }

                Phase::NoopReply => {
                    if !ready.can_write {
                        return keep_open(progressed);
                    }
                    if let Step::Yield =
                        self.step_write(stream, &replies.noop, Phase::AwaitLine, &mut progressed)
                    {
                        return keep_open(progressed);
                    }
                }

                Phase::SyntaxReply => {
                    if !ready.can_write {
                        return keep_open(progressed);
                    }
                    if let Step::Yield = self.step_write(
                        stream,
                        &replies.syntax_error,
                        Phase::AwaitLine,
                        &mut progressed,
                    ) {
                        return keep_open(progressed);
                    }
                }

                Phase::BadSequenceReply => {
                    if !ready.can_write {
                        return keep_open(progressed);
                    }
                    if let Step::Yield = self.step_write(
                        stream,
                        &replies.bad_sequence,
                        Phase::AwaitLine,
                        &mut progressed,
                    ) {
                        return keep_open(progressed);
                    }
                }

                Phase::Done => {
                    return Driven { signal: Signal::Close, progressed };
                }

                Phase::Failed => {
                    // One best-effort attempt, not retried beyond immediate
                    // availability.
                    if ready.can_write {
                        let mut writer = ReplyWriter::new(replies.unavailable.clone());
                        let _ = writer.write_to(stream);
                    }
                    return Driven { signal: Signal::Close, progressed };
                }
            }
        }
    }

    /// Drives the pending reply, installing it first if none is in flight.
    ///
    /// Partial writes are retried immediately within the invocation; a
    /// would-block keeps the cursor for the next one.
    fn step_write<S: Write>(
        &mut self,
        stream: &mut S,
        payload: &Bytes,
        next: Phase,
        progressed: &mut bool,
    ) -> Step {
        loop {
            let writer = self
                .pending
                .get_or_insert_with(|| ReplyWriter::new(payload.clone()));
            match writer.write_to(stream) {
                WriteOutcome::Complete => {
                    self.pending = None;
                    self.phase = next;
                    *progressed = true;
                    return Step::Advance;
                }
                WriteOutcome::Partial => *progressed = true,
                WriteOutcome::WouldBlock => return Step::Yield,
                WriteOutcome::Failed(e) => {
                    debug!("write failed: {}", e);
                    self.fail();
                    return Step::Advance;
                }
            }
        }
    }

    /// Enters the failure phase, dropping any half-sent reply so the 421
    /// notice is not preceded by stale bytes.
    fn fail(&mut self) {
        self.pending = None;
        self.phase = Phase::Failed;
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

fn keep_open(progressed: bool) -> Driven {
    Driven { signal: Signal::KeepOpen, progressed }
}
