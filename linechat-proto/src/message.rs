//! Message and request types for the `LineChat` protocol.
//!
//! [`TextMessage`] is the immutable chat message value shared by the
//! receive and send paths. [`Request`] is the typed form of every command
//! the client sends to the server.

use std::fmt;

use crate::codec::{self, CodecError};

/// A chat message: who sent it, whether it was private, and its text.
///
/// Immutable after creation. The text never contains a newline when the
/// value was decoded from the wire; callers constructing one for sending
/// are checked by [`Request::encode`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextMessage {
    sender: String,
    private: bool,
    text: String,
}

impl TextMessage {
    /// Creates a new message value.
    pub fn new(sender: impl Into<String>, private: bool, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            private,
            text: text.into(),
        }
    }

    /// Returns the username of the sender.
    #[must_use]
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Returns `true` for a private (direct) message.
    #[must_use]
    pub const fn is_private(&self) -> bool {
        self.private
    }

    /// Returns the message body.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for TextMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.private {
            write!(f, "[private] {}: {}", self.sender, self.text)
        } else {
            write!(f, "{}: {}", self.sender, self.text)
        }
    }
}

/// Commands a client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `login <username>`
    Login {
        /// Requested username.
        username: String,
    },
    /// `msg <text>`: broadcast to every logged-in user.
    PublicMessage {
        /// Message body.
        text: String,
    },
    /// `privmsg <recipient> <text>`
    PrivateMessage {
        /// Username of the single recipient.
        recipient: String,
        /// Message body.
        text: String,
    },
    /// `users`: ask for the list of logged-in users.
    UserList,
    /// `help`: ask for the commands the server supports.
    Help,
}

impl Request {
    /// Wire command word for this request.
    #[must_use]
    pub const fn command(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::PublicMessage { .. } => "msg",
            Self::PrivateMessage { .. } => "privmsg",
            Self::UserList => "users",
            Self::Help => "help",
        }
    }

    /// Encodes the request as one protocol line (without terminator).
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EmbeddedNewline`] if any field contains `\n`.
    pub fn encode(&self) -> Result<String, CodecError> {
        match self {
            Self::Login { username } => codec::encode(self.command(), &[username.as_str()]),
            Self::PublicMessage { text } => codec::encode(self.command(), &[text.as_str()]),
            Self::PrivateMessage { recipient, text } => {
                codec::encode(self.command(), &[recipient.as_str(), text.as_str()])
            }
            Self::UserList | Self::Help => codec::encode(self.command(), &[]),
        }
    }
}
