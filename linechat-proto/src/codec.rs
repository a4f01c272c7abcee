//! Line encoding and decoding for the `LineChat` wire protocol.
//!
//! Every protocol message is exactly one line of text: a command word,
//! optionally followed by a single space and a parameter string. The
//! newline is the terminator and can never appear inside a message.

/// Line terminator appended by the transport when a line is written.
pub const LINE_TERMINATOR: &str = "\n";

/// Default upper bound for a single incoming line (64 KB).
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Error type for codec encode operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A command or argument contained the line terminator.
    #[error("Message contains newline, ignored")]
    EmbeddedNewline,
    /// The command word itself was empty.
    #[error("command must not be empty")]
    EmptyCommand,
}

/// A decoded protocol line, split into its command and parameter string.
///
/// Borrows from the line it was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLine<'a> {
    /// The command word (text before the first space).
    pub command: &'a str,
    /// Everything after the first space, or `""` when there is none.
    pub params: &'a str,
}

/// Encodes a command and its arguments as one protocol line.
///
/// The parts are joined with single spaces. The returned string carries no
/// terminator; the transport appends [`LINE_TERMINATOR`] when writing.
///
/// # Errors
///
/// Returns [`CodecError::EmbeddedNewline`] if the command or any argument
/// contains `\n`, and [`CodecError::EmptyCommand`] for an empty command.
pub fn encode(command: &str, args: &[&str]) -> Result<String, CodecError> {
    if command.is_empty() {
        return Err(CodecError::EmptyCommand);
    }
    if contains_newline(command) || args.iter().any(|a| contains_newline(a)) {
        return Err(CodecError::EmbeddedNewline);
    }

    let capacity = command.len() + args.iter().map(|a| a.len() + 1).sum::<usize>();
    let mut line = String::with_capacity(capacity);
    line.push_str(command);
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    Ok(line)
}

/// Decodes one protocol line into command and parameters.
///
/// Splits on the first space. A line without a space is a bare command with
/// empty parameters. Decoding never fails: whether the command means
/// anything is decided by [`crate::event::ProtocolEvent::parse`].
#[must_use]
pub fn decode(line: &str) -> RawLine<'_> {
    match line.split_once(' ') {
        Some((command, params)) => RawLine { command, params },
        None => RawLine {
            command: line,
            params: "",
        },
    }
}

/// Returns `true` if `text` contains the line terminator.
#[must_use]
pub fn contains_newline(text: &str) -> bool {
    text.contains('\n')
}
