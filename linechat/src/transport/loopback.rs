//! Loopback transport for testing.
//!
//! Uses in-process [`tokio::io::duplex`] streams to simulate a chat server.
//! Created via [`LoopbackConnector::create_pair`], which returns the
//! connector handed to the client and a [`LoopbackServer`] that accepts
//! each connection the client opens as a [`LoopbackPeer`].

use futures_util::{SinkExt, StreamExt};
use tokio::io::DuplexStream;
use tokio::sync::{Mutex, mpsc};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};

use super::{ConnectError, Connector};

/// Client-side half of the loopback pair.
///
/// Each [`connect`](Connector::connect) creates a fresh duplex stream and
/// delivers its server end to the paired [`LoopbackServer`]. Once the
/// server has been dropped, connecting fails with
/// [`ConnectError::NoListener`].
pub struct LoopbackConnector {
    /// Capacity in bytes of each direction of the duplex stream.
    buffer: usize,
    /// Delivers accepted server ends to the paired server.
    accepted: mpsc::UnboundedSender<LoopbackPeer>,
}

/// Server-side half of the loopback pair.
pub struct LoopbackServer {
    incoming: Mutex<mpsc::UnboundedReceiver<LoopbackPeer>>,
}

/// Server end of one loopback connection, framed as protocol lines.
pub struct LoopbackPeer {
    host: String,
    port: u16,
    framed: Framed<DuplexStream, LinesCodec>,
}

impl LoopbackConnector {
    /// Create a connected connector/server pair.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use linechat::client::ChatClient;
    /// use linechat::transport::loopback::LoopbackConnector;
    ///
    /// # async fn example() {
    /// let (connector, server) = LoopbackConnector::create_pair(4096);
    /// let client = ChatClient::with_connector(connector);
    /// assert!(client.connect("chat.local", 1300).await);
    /// let mut peer = server.accept().await.unwrap();
    /// peer.send_line("loginok").await.unwrap();
    /// # }
    /// ```
    #[must_use]
    pub fn create_pair(buffer: usize) -> (Self, LoopbackServer) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                buffer,
                accepted: tx,
            },
            LoopbackServer {
                incoming: Mutex::new(rx),
            },
        )
    }
}

impl Connector for LoopbackConnector {
    type Stream = DuplexStream;

    async fn connect(&self, host: &str, port: u16) -> Result<DuplexStream, ConnectError> {
        let (client_end, server_end) = tokio::io::duplex(self.buffer);
        let peer = LoopbackPeer {
            host: host.to_string(),
            port,
            framed: Framed::new(server_end, LinesCodec::new()),
        };
        self.accepted
            .send(peer)
            .map_err(|_| ConnectError::NoListener {
                host: host.to_string(),
                port,
            })?;
        Ok(client_end)
    }
}

impl LoopbackServer {
    /// Wait for the next connection opened by the paired connector.
    ///
    /// Returns `None` once the connector has been dropped and every
    /// pending connection has been accepted.
    pub async fn accept(&self) -> Option<LoopbackPeer> {
        self.incoming.lock().await.recv().await
    }
}

impl LoopbackPeer {
    /// Host the client asked to connect to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port the client asked to connect to.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Send one line to the client (the terminator is appended).
    ///
    /// # Errors
    ///
    /// Returns [`LinesCodecError::Io`] if the client end is gone.
    pub async fn send_line(&mut self, line: &str) -> Result<(), LinesCodecError> {
        self.framed.send(line).await
    }

    /// Receive the next line the client sent.
    ///
    /// Returns `None` when the client closed its write half or dropped the
    /// stream.
    pub async fn recv_line(&mut self) -> Option<String> {
        match self.framed.next().await {
            Some(Ok(line)) => Some(line),
            Some(Err(e)) => {
                tracing::debug!(err = %e, "loopback peer read failed");
                None
            }
            None => None,
        }
    }
}
