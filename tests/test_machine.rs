use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};

use bouncer::smtp::{Driven, Machine, Phase, Readiness, Replies, Signal};

/// What one scripted read attempt should yield.
enum ReadStep {
    Chunk(Vec<u8>),
    Block,
    Eof,
    Error,
}

/// What one scripted write attempt should do.
enum WriteStep {
    Accept(usize),
    Block,
}

/// Test double for a non-blocking socket: reads are served from scripted
/// steps (defaulting to would-block when the script runs out), writes are
/// throttled by scripted quotas (defaulting to accept-everything).
struct ScriptedStream {
    reads: VecDeque<ReadStep>,
    writes: VecDeque<WriteStep>,
    written: Vec<u8>,
}

impl ScriptedStream {
    fn new() -> Self {
        Self {
            reads: VecDeque::new(),
            writes: VecDeque::new(),
            written: Vec::new(),
        }
    }

    fn push_read(&mut self, data: &[u8]) {
        self.reads.push_back(ReadStep::Chunk(data.to_vec()));
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reads.pop_front() {
            Some(ReadStep::Chunk(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    data.drain(..n);
                    self.reads.push_front(ReadStep::Chunk(data));
                }
                Ok(n)
            }
            Some(ReadStep::Eof) => {
                self.reads.push_front(ReadStep::Eof);
                Ok(0)
            }
            Some(ReadStep::Error) => Err(io::Error::other("scripted failure")),
            Some(ReadStep::Block) | None => Err(ErrorKind::WouldBlock.into()),
        }
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writes.pop_front() {
            Some(WriteStep::Accept(quota)) => {
                let n = quota.min(buf.len());
                self.written.extend_from_slice(&buf[..n]);
                Ok(n)
            }
            Some(WriteStep::Block) => Err(ErrorKind::WouldBlock.into()),
            None => {
                self.written.extend_from_slice(buf);
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn replies() -> Replies {
    Replies::new("test.local")
}

fn drive_rw(machine: &mut Machine, stream: &mut ScriptedStream, replies: &Replies) -> Driven {
    machine.drive(stream, Readiness { can_read: true, can_write: true }, replies)
}

fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

#[test]
fn greeting_sent_on_first_writable_event() {
    let replies = replies();
    let mut machine = Machine::new();
    let mut stream = ScriptedStream::new();

    let driven = drive_rw(&mut machine, &mut stream, &replies);

    assert_eq!(driven.signal, Signal::KeepOpen);
    assert!(driven.progressed);
    assert_eq!(stream.written, replies.greeting.to_vec());
    assert_eq!(machine.phase(), Phase::AwaitLine);
}

#[test]
fn no_permissions_means_no_progress() {
    let replies = replies();
    let mut machine = Machine::new();
    let mut stream = ScriptedStream::new();

    let driven = machine.drive(&mut stream, Readiness::default(), &replies);

    assert_eq!(driven.signal, Signal::KeepOpen);
    assert!(!driven.progressed);
    assert!(stream.written.is_empty());
    assert_eq!(machine.phase(), Phase::Greeting);
}

#[test]
fn greeting_resumes_after_would_block_without_duplication() {
    let replies = replies();
    let mut machine = Machine::new();
    let mut stream = ScriptedStream::new();
    stream.writes.push_back(WriteStep::Accept(3));
    stream.writes.push_back(WriteStep::Block);

    let driven = drive_rw(&mut machine, &mut stream, &replies);
    assert_eq!(driven.signal, Signal::KeepOpen);
    assert!(driven.progressed);
    assert_eq!(machine.phase(), Phase::Greeting);
    assert_eq!(stream.written, replies.greeting[..3].to_vec());

    // next readiness event: the rest goes out, byte-for-byte
    drive_rw(&mut machine, &mut stream, &replies);
    assert_eq!(stream.written, replies.greeting.to_vec());
    assert_eq!(machine.phase(), Phase::AwaitLine);
}

#[test]
fn greeting_completes_one_byte_at_a_time_within_one_invocation() {
    let replies = replies();
    let mut machine = Machine::new();
    let mut stream = ScriptedStream::new();
    for _ in 0..replies.greeting.len() {
        stream.writes.push_back(WriteStep::Accept(1));
    }

    drive_rw(&mut machine, &mut stream, &replies);

    assert_eq!(stream.written, replies.greeting.to_vec());
    assert_eq!(machine.phase(), Phase::AwaitLine);
}

#[test]
fn noop_round_trip_returns_to_line_await() {
    let replies = replies();
    let mut machine = Machine::new();
    let mut stream = ScriptedStream::new();
    stream.push_read(b"NOOP\r\n");

    let driven = drive_rw(&mut machine, &mut stream, &replies);

    assert_eq!(driven.signal, Signal::KeepOpen);
    assert_eq!(machine.phase(), Phase::AwaitLine);
    let mut expected = replies.greeting.to_vec();
    expected.extend_from_slice(b"250 2.0.0 OK.\r\n");
    assert_eq!(stream.written, expected);
}

#[test]
fn quit_elicits_bye_and_close() {
    let replies = replies();
    let mut machine = Machine::new();
    let mut stream = ScriptedStream::new();
    stream.push_read(b"QUIT\r\n");

    let driven = drive_rw(&mut machine, &mut stream, &replies);

    assert_eq!(driven.signal, Signal::Close);
    let mut expected = replies.greeting.to_vec();
    expected.extend_from_slice(b"221 2.0.0 Bye.\r\n");
    assert_eq!(stream.written, expected);
}

#[test]
fn empty_line_elicits_syntax_error() {
    let replies = replies();
    let mut machine = Machine::new();
    let mut stream = ScriptedStream::new();
    stream.push_read(b"\r\n");

    drive_rw(&mut machine, &mut stream, &replies);

    assert_eq!(count_occurrences(&stream.written, b"500 5.5.2 Syntax error.\r\n"), 1);
    assert_eq!(machine.phase(), Phase::AwaitLine);
}

#[test]
fn unknown_command_elicits_bad_sequence() {
    let replies = replies();
    let mut machine = Machine::new();
    let mut stream = ScriptedStream::new();
    stream.push_read(b"HELO example.com\r\n");

    drive_rw(&mut machine, &mut stream, &replies);

    assert_eq!(
        count_occurrences(&stream.written, b"503 5.1.1 Bad sequence of commands.\r\n"),
        1
    );
    assert_eq!(machine.phase(), Phase::AwaitLine);
}

#[test]
fn command_split_into_single_bytes_classifies_identically() {
    let replies = replies();
    let mut machine = Machine::new();
    let mut stream = ScriptedStream::new();

    // greeting first
    drive_rw(&mut machine, &mut stream, &replies);

    for byte in b"QUIT\r\n" {
        stream.push_read(&[*byte]);
        let driven = drive_rw(&mut machine, &mut stream, &replies);
        if driven.signal == Signal::Close {
            break;
        }
    }

    assert_eq!(count_occurrences(&stream.written, b"221 2.0.0 Bye.\r\n"), 1);
}

#[test]
fn command_split_across_invocations_classifies_identically() {
    let replies = replies();
    let mut machine = Machine::new();
    let mut stream = ScriptedStream::new();

    stream.push_read(b"NO");
    stream.reads.push_back(ReadStep::Block);
    drive_rw(&mut machine, &mut stream, &replies);
    assert_eq!(machine.phase(), Phase::AwaitLine);

    stream.push_read(b"OP\r");
    drive_rw(&mut machine, &mut stream, &replies);
    assert_eq!(machine.phase(), Phase::AwaitLine);

    stream.push_read(b"\n");
    let driven = drive_rw(&mut machine, &mut stream, &replies);

    assert_eq!(driven.signal, Signal::KeepOpen);
    assert_eq!(count_occurrences(&stream.written, b"250 2.0.0 OK.\r\n"), 1);
}

#[test]
fn oversized_unterminated_line_is_discarded_with_syntax_error() {
    let replies = replies();
    let mut machine = Machine::new();
    let mut stream = ScriptedStream::new();
    stream.push_read(&vec![b'a'; 600]);

    drive_rw(&mut machine, &mut stream, &replies);

    assert_eq!(count_occurrences(&stream.written, b"500 5.5.2 Syntax error.\r\n"), 1);
    assert_eq!(machine.phase(), Phase::AwaitLine);

    // the discarded bytes do not leak into the next command
    stream.push_read(b"\nNOOP\r\n");
    drive_rw(&mut machine, &mut stream, &replies);
    assert_eq!(count_occurrences(&stream.written, b"250 2.0.0 OK.\r\n"), 1);
}

#[test]
fn pipelined_lines_each_get_a_reply_while_writable() {
    let replies = replies();
    let mut machine = Machine::new();
    let mut stream = ScriptedStream::new();
    stream.push_read(b"NOOP\r\nFOO\r\n");

    drive_rw(&mut machine, &mut stream, &replies);

    assert_eq!(count_occurrences(&stream.written, b"250 2.0.0 OK.\r\n"), 1);
    assert_eq!(
        count_occurrences(&stream.written, b"503 5.1.1 Bad sequence of commands.\r\n"),
        1
    );
}

#[test]
fn eof_sends_unavailable_notice_and_closes() {
    let replies = replies();
    let mut machine = Machine::new();
    let mut stream = ScriptedStream::new();
    stream.reads.push_back(ReadStep::Eof);

    let driven = drive_rw(&mut machine, &mut stream, &replies);

    assert_eq!(driven.signal, Signal::Close);
    assert!(stream.written.ends_with(b"421 4.4.2 test.local Closing transmission channel.\r\n"));
}

#[test]
fn fatal_read_error_sends_unavailable_notice_and_closes() {
    let replies = replies();
    let mut machine = Machine::new();
    let mut stream = ScriptedStream::new();
    stream.reads.push_back(ReadStep::Error);

    let driven = drive_rw(&mut machine, &mut stream, &replies);

    assert_eq!(driven.signal, Signal::Close);
    assert!(stream.written.ends_with(b"421 4.4.2 test.local Closing transmission channel.\r\n"));
}

#[test]
fn eof_without_write_permission_still_closes() {
    let replies = replies();
    let mut machine = Machine::new();
    let mut stream = ScriptedStream::new();

    drive_rw(&mut machine, &mut stream, &replies);
    let written_before = stream.written.len();
    stream.reads.push_back(ReadStep::Eof);

    let driven = machine.drive(
        &mut stream,
        Readiness { can_read: true, can_write: false },
        &replies,
    );

    assert_eq!(driven.signal, Signal::Close);
    assert_eq!(stream.written.len(), written_before);
}

#[test]
fn reply_straddling_many_blocked_invocations_arrives_intact() {
    let replies = replies();
    let mut machine = Machine::new();
    let mut stream = ScriptedStream::new();

    drive_rw(&mut machine, &mut stream, &replies);
    stream.push_read(b"QUIT\r\n");

    // every write attempt accepts one byte and then blocks
    let bye = b"221 2.0.0 Bye.\r\n";
    let mut signal = Signal::KeepOpen;
    for _ in 0..bye.len() + 1 {
        stream.writes.push_back(WriteStep::Accept(1));
        stream.writes.push_back(WriteStep::Block);
        signal = drive_rw(&mut machine, &mut stream, &replies).signal;
        if signal == Signal::Close {
            break;
        }
    }

    assert_eq!(signal, Signal::Close);
    assert_eq!(count_occurrences(&stream.written, bye), 1);
}
