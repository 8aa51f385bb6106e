//! Classification of client command lines.

/// The commands this server distinguishes.
///
/// Everything that is not QUIT or NOOP gets refused; the variants only
/// decide which refusal line the client receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// QUIT - close the session politely
    Quit,
    /// NOOP - do nothing, successfully
    Noop,
    /// A line with no command word at all
    Empty,
    /// Any other command word
    Unknown,
}

impl Command {
    /// Classifies one complete line (terminator already stripped).
    ///
    /// The command word is everything up to the first ASCII whitespace
    /// character; a carriage return left over from CRLF termination counts
    /// as whitespace and ends the word. Matching is case-insensitive.
    pub fn classify(line: &[u8]) -> Self {
        let end = line
            .iter()
            .position(|b| b.is_ascii_whitespace())
            .unwrap_or(line.len());
        let word = &line[..end];

        if word.is_empty() {
            Command::Empty
        } else if word.eq_ignore_ascii_case(b"QUIT") {
            Command::Quit
        } else if word.eq_ignore_ascii_case(b"NOOP") {
            Command::Noop
        } else {
            Command::Unknown
        }
    }
}
