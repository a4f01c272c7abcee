//! Incoming protocol events.
//!
//! The server answers with one line per event. [`ProtocolEvent::parse`]
//! interprets a decoded [`RawLine`] and yields at most one event:
//!
//! ```text
//! loginok                  -> LoginResult { success: true }
//! loginerr <text>          -> LoginResult { success: false, err_msg }
//! msg <sender> <text>      -> MessageReceived (public)
//! privmsg <sender> <text>  -> MessageReceived (private)
//! msgerr <text>            -> MessageError
//! cmderr <text>            -> CommandError
//! users <name>...          -> UserList
//! supported <command>...   -> SupportedCommands
//! msgok <count>            -> (no event)
//! ```

use crate::codec::RawLine;
use crate::message::TextMessage;

/// Events delivered to listeners, one per interpreted incoming line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// Result of a `login` request.
    LoginResult {
        /// Whether the server accepted the username.
        success: bool,
        /// Error text from the server, empty on success.
        err_msg: String,
    },
    /// A public or private message arrived.
    MessageReceived(TextMessage),
    /// The server could not deliver a message we sent.
    MessageError {
        /// Error text from the server.
        err_msg: String,
    },
    /// The server did not understand a command we sent.
    CommandError {
        /// Error text from the server.
        err_msg: String,
    },
    /// Usernames of everyone currently logged in.
    UserList {
        /// Usernames in server order.
        usernames: Vec<String>,
    },
    /// Commands the server supports, in answer to `help`.
    SupportedCommands {
        /// Command names in server order.
        commands: Vec<String>,
    },
    /// The connection is gone (remote close, read error, or local disconnect).
    Disconnected,
}

/// Error returned when an incoming line cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The command word is not part of the protocol vocabulary.
    #[error("unrecognized command from server: {0:?}")]
    UnknownCommand(String),
}

impl ProtocolEvent {
    /// Interprets one decoded line.
    ///
    /// Returns `Ok(None)` for lines that are valid but carry nothing for
    /// listeners (the `msgok` send acknowledgment).
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnknownCommand`] when the command word is not
    /// recognized. The caller decides what to do with it; it never means
    /// the connection is broken.
    pub fn parse(raw: RawLine<'_>) -> Result<Option<Self>, ParseError> {
        let event = match raw.command {
            "loginok" => Self::LoginResult {
                success: true,
                err_msg: String::new(),
            },
            "loginerr" => Self::LoginResult {
                success: false,
                err_msg: raw.params.to_string(),
            },
            "msg" => Self::MessageReceived(parse_text_message(raw.params, false)),
            "privmsg" => Self::MessageReceived(parse_text_message(raw.params, true)),
            "msgerr" => Self::MessageError {
                err_msg: raw.params.to_string(),
            },
            "cmderr" => Self::CommandError {
                err_msg: raw.params.to_string(),
            },
            "users" => Self::UserList {
                usernames: split_list(raw.params),
            },
            "supported" => Self::SupportedCommands {
                commands: split_list(raw.params),
            },
            "msgok" => return Ok(None),
            other => return Err(ParseError::UnknownCommand(other.to_string())),
        };
        Ok(Some(event))
    }
}

/// `<sender> <text>`; a missing text is an empty message.
fn parse_text_message(params: &str, private: bool) -> TextMessage {
    let (sender, text) = params.split_once(' ').unwrap_or((params, ""));
    TextMessage::new(sender, private, text)
}

/// Space-separated list; an empty parameter string is an empty list.
fn split_list(params: &str) -> Vec<String> {
    params.split_whitespace().map(str::to_string).collect()
}
