//! TCP transport.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;

use super::{ConnectError, Connector};

/// Default timeout for the TCP handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens plain TCP connections (no TLS).
///
/// Resolution and connection are separate steps so that an unresolvable
/// host and a refused port are reported as different errors.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
}

impl TcpConnector {
    /// Creates a connector with the given handshake timeout.
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Returns the handshake timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, host: &str, port: u16) -> Result<TcpStream, ConnectError> {
        let addrs: Vec<SocketAddr> = match tokio::net::lookup_host((host, port)).await {
            Ok(addrs) => addrs.collect(),
            Err(e) => {
                tracing::warn!(host, port, err = %e, "host lookup failed");
                return Err(ConnectError::UnknownHost(host.to_string()));
            }
        };
        if addrs.is_empty() {
            tracing::warn!(host, port, "host lookup returned no addresses");
            return Err(ConnectError::UnknownHost(host.to_string()));
        }

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&addrs[..]))
            .await
            .map_err(|_| {
                tracing::warn!(host, port, "TCP connect timed out");
                ConnectError::Timeout {
                    host: host.to_string(),
                    port,
                }
            })?
            .map_err(|e| {
                tracing::warn!(host, port, err = %e, "TCP connect failed");
                if e.kind() == std::io::ErrorKind::ConnectionRefused {
                    ConnectError::NoListener {
                        host: host.to_string(),
                        port,
                    }
                } else {
                    ConnectError::Io(e)
                }
            })?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(err = %e, "could not disable Nagle's algorithm");
        }
        Ok(stream)
    }
}
