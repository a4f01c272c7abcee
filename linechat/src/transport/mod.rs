//! Transport layer abstraction for `LineChat`.
//!
//! Defines the [`Connector`] trait that opens the duplex byte stream the
//! client speaks the line protocol over. Concrete implementations:
//! - [`tcp::TcpConnector`]: TCP sockets, used in production
//! - [`loopback::LoopbackConnector`]: in-process streams for testing

pub mod loopback;
pub mod tcp;

use tokio::io::{AsyncRead, AsyncWrite};

/// Errors that can occur while opening a transport.
///
/// The `Display` text is what the client reports as its last error.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// The host name could not be resolved.
    #[error("Unknown host {0}")]
    UnknownHost(String),

    /// The host answered but nothing accepts connections on the port.
    #[error("No chat server listening on {host}:{port}")]
    NoListener {
        /// Host that refused the connection.
        host: String,
        /// Port that was tried.
        port: u16,
    },

    /// The handshake did not complete in time.
    #[error("Connection to {host}:{port} timed out")]
    Timeout {
        /// Host that was tried.
        host: String,
        /// Port that was tried.
        port: u16,
    },

    /// Any other I/O failure while connecting.
    #[error("I/O error for the socket: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens duplex byte streams to a chat server.
///
/// Implementations only establish the stream; line framing, state
/// tracking and close sequencing belong to the connection manager.
///
/// # Invariant
///
/// Dropping both halves of a returned stream must release the underlying
/// resource, and shutting down its write half must be visible to the
/// remote end as end-of-stream.
pub trait Connector: Send + Sync + 'static {
    /// The stream type produced by this connector.
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Open a stream to `host:port`.
    ///
    /// Completes when the handshake succeeds or fails.
    fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> impl std::future::Future<Output = Result<Self::Stream, ConnectError>> + Send;
}
