//! Chat client: the interface presentation layers program against.
//!
//! [`ChatClient`] ties together the [`ConnectionManager`], the
//! [`ListenerRegistry`] and the read loop. Every operation recovers from
//! failure locally: it returns `false` and leaves a description in
//! [`last_error`](ChatClient::last_error), or (for failures detected while
//! reading) delivers a [`ProtocolEvent::Disconnected`] to listeners.
//!
//! [`ProtocolEvent::Disconnected`]: linechat_proto::event::ProtocolEvent::Disconnected

pub mod connection;
pub mod dispatch;
pub mod listener;
mod receive;

use std::sync::Arc;

use linechat_proto::codec::{CodecError, DEFAULT_MAX_LINE_LENGTH};
use linechat_proto::message::Request;
use tokio_util::codec::LinesCodecError;

use crate::transport::tcp::TcpConnector;
use crate::transport::{ConnectError, Connector};

pub use connection::{ConnectionManager, ConnectionState};
pub use listener::{ChatListener, ListenerRegistry};

/// Errors produced inside the client before they are reported as the last
/// error.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The outgoing payload was rejected before any network I/O.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The transport could not be opened.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// An operation needed an open connection.
    #[error("Not connected to a chat server")]
    NotConnected,

    /// The connection was closed while a write was still pending.
    #[error("Connection closed while sending")]
    Closed,

    /// Reading or writing a line failed.
    #[error("Connection error: {0}")]
    Lines(#[from] LinesCodecError),
}

/// Tunables for a [`ChatClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Longest incoming line accepted before the read loop treats the
    /// stream as broken.
    pub max_line_length: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// State shared between the client handle and its read loop.
pub(crate) struct Shared<C: Connector> {
    pub(crate) connection: ConnectionManager<C>,
    pub(crate) listeners: ListenerRegistry,
}

/// Client for the line-based chat protocol.
///
/// Cheap to clone; clones share the connection and the listeners. Separate
/// instances created with a constructor are fully independent.
///
/// # Example
///
/// ```rust,no_run
/// use linechat::client::ChatClient;
///
/// # async fn example() {
/// let client = ChatClient::new();
/// if client.connect("localhost", 1300).await {
///     client.start_listen_task();
///     client.try_login("alice").await;
///     client.send_public_message("hello everyone").await;
/// } else {
///     eprintln!("connect failed: {}", client.last_error());
/// }
/// # }
/// ```
pub struct ChatClient<C: Connector = TcpConnector> {
    shared: Arc<Shared<C>>,
}

impl<C: Connector> Clone for ChatClient<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl ChatClient<TcpConnector> {
    /// Creates a TCP client with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connector(TcpConnector::default())
    }
}

impl Default for ChatClient<TcpConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> ChatClient<C> {
    /// Creates a client that opens its transport through `connector`.
    #[must_use]
    pub fn with_connector(connector: C) -> Self {
        Self::with_options(connector, ClientOptions::default())
    }

    /// Creates a client with explicit options.
    #[must_use]
    pub fn with_options(connector: C, options: ClientOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                connection: ConnectionManager::new(connector, options.max_line_length),
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    /// Connect to a chat server. Returns `true` on success.
    ///
    /// Blocks (asynchronously) until the handshake completes or fails.
    /// Call [`start_listen_task`](Self::start_listen_task) afterwards to
    /// receive events.
    pub async fn connect(&self, host: &str, port: u16) -> bool {
        let result = self.shared.connection.connect(host, port).await;
        self.report(result)
    }

    /// Close the connection. Safe to call at any time, from any task.
    pub async fn disconnect(&self) {
        self.shared.connection.disconnect().await;
    }

    /// Spawn the read loop for the current connection.
    ///
    /// Must be called from within a tokio runtime. Returns `false` if there
    /// is no connection or a read loop is already running for it.
    pub fn start_listen_task(&self) -> bool {
        let Some(reader) = self.shared.connection.take_reader() else {
            tracing::warn!("no connection to listen on, or already listening");
            return false;
        };
        tokio::spawn(receive::read_loop(Arc::clone(&self.shared), reader));
        true
    }

    /// Register a listener. Adding the same listener twice has no effect.
    pub fn add_listener(&self, listener: Arc<dyn ChatListener>) {
        self.shared.listeners.add(listener);
    }

    /// Unregister a listener. Unknown listeners are ignored.
    pub fn remove_listener<L: ChatListener + ?Sized>(&self, listener: &Arc<L>) {
        self.shared.listeners.remove(listener);
    }

    /// `true` while connected.
    #[must_use]
    pub fn is_connection_active(&self) -> bool {
        self.shared.connection.is_active()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.connection.state()
    }

    /// Description of the most recent failure, `""` if none occurred.
    #[must_use]
    pub fn last_error(&self) -> String {
        self.shared.connection.last_error()
    }

    /// Send `login <username>`. The answer arrives as a login-result event.
    pub async fn try_login(&self, username: &str) -> bool {
        self.send_request(&Request::Login {
            username: username.to_string(),
        })
        .await
    }

    /// Send a message to every logged-in user.
    ///
    /// Returns `false` without touching the network if `text` contains a
    /// newline.
    pub async fn send_public_message(&self, text: &str) -> bool {
        self.send_request(&Request::PublicMessage {
            text: text.to_string(),
        })
        .await
    }

    /// Send a message to a single user.
    ///
    /// Returns `false` without touching the network if `text` contains a
    /// newline.
    pub async fn send_private_message(&self, recipient: &str, text: &str) -> bool {
        self.send_request(&Request::PrivateMessage {
            recipient: recipient.to_string(),
            text: text.to_string(),
        })
        .await
    }

    /// Ask for the current user list. The answer arrives as a user-list event.
    pub async fn refresh_user_list(&self) -> bool {
        self.send_request(&Request::UserList).await
    }

    /// Ask which commands the server supports.
    pub async fn ask_supported_commands(&self) -> bool {
        self.send_request(&Request::Help).await
    }

    async fn send_request(&self, request: &Request) -> bool {
        let line = match request.encode() {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(command = request.command(), err = %e, "request rejected");
                return self.report(Err(e.into()));
            }
        };
        let result = self.shared.connection.send_line(&line).await;
        self.report(result)
    }

    fn report(&self, result: Result<(), ClientError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                self.shared.connection.record_error(e.to_string());
                false
            }
        }
    }
}
