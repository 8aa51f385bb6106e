//! SMTP reply lines.
//!
//! Every reply this server can produce, as literal CRLF-terminated strings.
//! The enhanced status codes follow RFC 3463; the 554 greeting tells a
//! compliant client up front that no mail will ever be accepted here.

use bytes::Bytes;

/// Reply to QUIT.
pub const QUIT: &str = "221 2.0.0 Bye.\r\n";
/// Reply to NOOP.
pub const NOOP: &str = "250 2.0.0 OK.\r\n";
/// Reply to an empty or overlong command line.
pub const SYNTAX_ERROR: &str = "500 5.5.2 Syntax error.\r\n";
/// Reply to any command other than QUIT or NOOP.
pub const BAD_SEQUENCE: &str = "503 5.1.1 Bad sequence of commands.\r\n";

/// The complete reply table for one server instance.
///
/// Most entries are fixed strings; the greeting and the two 421 notices
/// carry the configured hostname and are rendered once at startup. `Bytes`
/// makes handing a payload to a connection a reference-count bump rather
/// than a copy.
#[derive(Debug, Clone)]
pub struct Replies {
    /// 554 banner sent unconditionally on connect.
    pub greeting: Bytes,
    /// 221 goodbye.
    pub quit: Bytes,
    /// 250 acknowledgement.
    pub noop: Bytes,
    /// 500 for lines with no command word or no terminator in sight.
    pub syntax_error: Bytes,
    /// 503 for every command this server refuses to know.
    pub bad_sequence: Bytes,
    /// 421 sent when a deadline expires.
    pub timeout: Bytes,
    /// 421 sent on stream failure or server shutdown.
    pub unavailable: Bytes,
}

impl Replies {
    pub fn new(hostname: &str) -> Self {
        Self {
            greeting: Bytes::from(format!(
                "554 5.3.2 {hostname} Mail service not available here.\r\n"
            )),
            quit: Bytes::from_static(QUIT.as_bytes()),
            noop: Bytes::from_static(NOOP.as_bytes()),
            syntax_error: Bytes::from_static(SYNTAX_ERROR.as_bytes()),
            bad_sequence: Bytes::from_static(BAD_SEQUENCE.as_bytes()),
            timeout: Bytes::from(format!("421 4.4.2 {hostname} Timeout exceeded.\r\n")),
            unavailable: Bytes::from(format!(
                "421 4.4.2 {hostname} Closing transmission channel.\r\n"
            )),
        }
    }
}
