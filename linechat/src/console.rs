//! Line-mode terminal front end.
//!
//! [`parse_input`] turns a typed line into an [`InputCommand`], [`execute`]
//! runs it against a [`ChatClient`], and [`ConsoleListener`] renders client
//! events as text.
//!
//! ```text
//! /login <name>         log in
//! /w <user> <text>      private message
//! /users                refresh the user list
//! /help                 ask the server for its commands
//! /quit                 disconnect and exit
//! anything else         public message
//! ```

use std::io::{self, Write};

use parking_lot::Mutex;

use linechat_proto::message::TextMessage;

use crate::client::{ChatClient, ChatListener};
use crate::transport::Connector;

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    /// Log in with a username.
    Login(String),
    /// Broadcast a message.
    Public(String),
    /// Send a message to one user.
    Private {
        /// Recipient username.
        recipient: String,
        /// Message body.
        text: String,
    },
    /// Refresh the user list.
    Users,
    /// Ask for supported commands.
    Help,
    /// Leave the shell.
    Quit,
    /// Blank input.
    Empty,
    /// Malformed input, with a usage hint.
    Invalid(String),
}

/// Whether the input loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Stop reading input.
    Quit,
}

/// Parse one line typed by the user.
#[must_use]
pub fn parse_input(line: &str) -> InputCommand {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return InputCommand::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return InputCommand::Public(line.to_string());
    };

    let (command, args) = rest.split_once(' ').unwrap_or((rest, ""));
    let args = args.trim();
    match command {
        "login" if !args.is_empty() => InputCommand::Login(args.to_string()),
        "login" => InputCommand::Invalid("usage: /login <username>".into()),
        "w" | "msg" => match args.split_once(' ') {
            Some((recipient, text)) if !text.trim().is_empty() => InputCommand::Private {
                recipient: recipient.to_string(),
                text: text.trim_start().to_string(),
            },
            _ => InputCommand::Invalid("usage: /w <user> <text>".into()),
        },
        "users" => InputCommand::Users,
        "help" => InputCommand::Help,
        "quit" | "exit" => InputCommand::Quit,
        other => InputCommand::Invalid(format!("unknown command /{other}")),
    }
}

/// Run one input command against `client`, reporting failures to `out`.
///
/// # Errors
///
/// Returns an I/O error only if writing to `out` fails.
pub async fn execute<C: Connector, W: Write>(
    client: &ChatClient<C>,
    command: InputCommand,
    out: &mut W,
) -> io::Result<Flow> {
    let sent = match command {
        InputCommand::Empty => return Ok(Flow::Continue),
        InputCommand::Quit => return Ok(Flow::Quit),
        InputCommand::Invalid(hint) => {
            writeln!(out, "{hint}")?;
            return Ok(Flow::Continue);
        }
        InputCommand::Login(username) => client.try_login(&username).await,
        InputCommand::Public(text) => client.send_public_message(&text).await,
        InputCommand::Private { recipient, text } => {
            client.send_private_message(&recipient, &text).await
        }
        InputCommand::Users => client.refresh_user_list().await,
        InputCommand::Help => client.ask_supported_commands().await,
    };
    if !sent {
        writeln!(out, "Not sent: {}", client.last_error())?;
    }
    Ok(Flow::Continue)
}

/// Renders client events as lines of text.
pub struct ConsoleListener<W: Write + Send> {
    out: Mutex<W>,
}

impl ConsoleListener<io::Stdout> {
    /// Listener printing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleListener<W> {
    /// Listener printing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Consume the listener and return its writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn print(&self, text: &str) {
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{text}").and_then(|()| out.flush()) {
            tracing::warn!(err = %e, "could not write to console");
        }
    }
}

impl<W: Write + Send> ChatListener for ConsoleListener<W> {
    fn on_login_result(&self, success: bool, err_msg: &str) {
        if success {
            self.print("* Logged in");
        } else {
            self.print(&format!("* Login failed: {err_msg}"));
        }
    }

    fn on_disconnect(&self) {
        self.print("* Disconnected from server");
    }

    fn on_message_received(&self, message: &TextMessage) {
        self.print(&message.to_string());
    }

    fn on_message_error(&self, err_msg: &str) {
        self.print(&format!("* Message not delivered: {err_msg}"));
    }

    fn on_user_list(&self, usernames: &[String]) {
        if usernames.is_empty() {
            self.print("* No users online");
        } else {
            self.print(&format!("* Users: {}", usernames.join(", ")));
        }
    }

    fn on_supported_commands(&self, commands: &[String]) {
        self.print(&format!("* Server supports: {}", commands.join(" ")));
    }

    fn on_command_error(&self, err_msg: &str) {
        self.print(&format!("* Command error: {err_msg}"));
    }
}
