//! Connection manager: owns the single transport of a client.
//!
//! State machine:
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──ok──▶ Connected
//!      ▲                          │                  │
//!      └──────────failed──────────┘◀──disconnect()───┘
//! ```
//!
//! The whole close sequence runs under one async mutex, so a user-initiated
//! disconnect and a read-loop-initiated disconnect never interleave. The
//! second caller finds nothing to close and returns.
//!
//! Writes never hold that mutex. The writer has its own lock, and a pending
//! write gives up as soon as the close sequence starts, so a peer that stops
//! reading cannot stall `disconnect()`.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex as SyncMutex;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::sync::{Mutex, watch};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

use linechat_proto::codec::{self, CodecError};

use crate::transport::Connector;

use super::ClientError;

/// Upper bound for flushing buffered output while closing.
pub const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

type LineWriter<S> = FramedWrite<WriteHalf<S>, LinesCodec>;

/// Lifecycle state of the connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport.
    Disconnected,
    /// A connect attempt is in progress.
    Connecting,
    /// The transport is open.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Most recent failure description, last writer wins.
#[derive(Debug, Default)]
pub struct LastError(SyncMutex<Option<String>>);

impl LastError {
    /// Overwrite the stored description.
    pub fn record(&self, description: impl Into<String>) {
        *self.0.lock() = Some(description.into());
    }

    /// The stored description, or `""` if nothing has failed yet.
    #[must_use]
    pub fn get(&self) -> String {
        self.0.lock().clone().unwrap_or_default()
    }
}

/// The live transport: write channel plus the close signals for pending
/// writes and for the reader.
struct Connection<S> {
    id: u64,
    host: String,
    port: u16,
    writer: Arc<Mutex<LineWriter<S>>>,
    stop_writes: watch::Sender<bool>,
    closed: watch::Sender<bool>,
}

/// Read channel of one connection, handed to exactly one read loop.
///
/// Reading yields end-of-stream as soon as the owning connection is
/// closed locally, even while a read is pending.
pub struct ReadChannel<S> {
    connection_id: u64,
    lines: FramedRead<ReadHalf<S>, LinesCodec>,
    closed: watch::Receiver<bool>,
}

impl<S: tokio::io::AsyncRead> ReadChannel<S> {
    /// Identifier of the connection this channel belongs to.
    #[must_use]
    pub const fn connection_id(&self) -> u64 {
        self.connection_id
    }

    /// Wait for the next line.
    ///
    /// Returns `None` on end-of-stream: the remote closed the stream, or
    /// the connection was closed locally.
    pub async fn next_line(&mut self) -> Option<Result<String, LinesCodecError>> {
        tokio::select! {
            biased;
            // Only `true` is ever sent; an Err means the sender is gone.
            _ = self.closed.changed() => None,
            item = self.lines.next() => item,
        }
    }
}

/// Owns the single connection of a client and its last-error record.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    max_line_length: usize,
    connection: Mutex<Option<Connection<C::Stream>>>,
    state: SyncMutex<ConnectionState>,
    pending_reader: SyncMutex<Option<ReadChannel<C::Stream>>>,
    next_id: AtomicU64,
    last_error: LastError,
}

impl<C: Connector> ConnectionManager<C> {
    /// Creates a disconnected manager.
    pub fn new(connector: C, max_line_length: usize) -> Self {
        Self {
            connector,
            max_line_length,
            connection: Mutex::new(None),
            state: SyncMutex::new(ConnectionState::Disconnected),
            pending_reader: SyncMutex::new(None),
            next_id: AtomicU64::new(1),
            last_error: LastError::default(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// `true` while a connection is open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Most recent failure description, `""` if none.
    #[must_use]
    pub fn last_error(&self) -> String {
        self.last_error.get()
    }

    /// Overwrite the last error.
    pub fn record_error(&self, description: impl Into<String>) {
        self.last_error.record(description);
    }

    /// Open a connection to `host:port`.
    ///
    /// An already open connection is closed first. On success the read
    /// channel is parked until [`take_reader`](Self::take_reader) claims it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] if the transport could not be opened;
    /// the manager is then disconnected.
    pub async fn connect(&self, host: &str, port: u16) -> Result<(), ClientError> {
        let mut slot = self.connection.lock().await;
        if let Some(previous) = slot.take() {
            tracing::warn!(
                host = %previous.host,
                port = previous.port,
                "already connected, closing previous connection"
            );
            self.close(previous).await;
        }

        self.set_state(ConnectionState::Connecting);
        tracing::info!(host, port, "connecting");

        let stream = match self.connector.connect(host, port).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(host, port, err = %e, "connect failed");
                self.set_state(ConnectionState::Disconnected);
                return Err(e.into());
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (read_half, write_half) = tokio::io::split(stream);
        let (closed_tx, closed_rx) = watch::channel(false);
        let (stop_writes, _) = watch::channel(false);

        *self.pending_reader.lock() = Some(ReadChannel {
            connection_id: id,
            lines: FramedRead::new(
                read_half,
                LinesCodec::new_with_max_length(self.max_line_length),
            ),
            closed: closed_rx,
        });
        *slot = Some(Connection {
            id,
            host: host.to_string(),
            port,
            writer: Arc::new(Mutex::new(FramedWrite::new(write_half, LinesCodec::new()))),
            stop_writes,
            closed: closed_tx,
        });
        self.set_state(ConnectionState::Connected);
        tracing::info!(host, port, connection_id = id, "connected");
        Ok(())
    }

    /// Claim the read channel of the current connection.
    ///
    /// Returns `None` when there is no connection or the channel has
    /// already been claimed by a running read loop.
    pub fn take_reader(&self) -> Option<ReadChannel<C::Stream>> {
        self.pending_reader.lock().take()
    }

    /// Close the connection, if any.
    ///
    /// Idempotent and safe to call concurrently. Close-time errors are
    /// recorded as the last error, never returned.
    pub async fn disconnect(&self) {
        let mut slot = self.connection.lock().await;
        match slot.take() {
            Some(connection) => self.close(connection).await,
            None => tracing::debug!("no connection to close"),
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Close the connection only if it is still the one identified by
    /// `connection_id`.
    ///
    /// Used by a read loop that outlived its connection, so that it never
    /// tears down a newer one. Returns `false` when a newer connection has
    /// replaced this one; `true` when this connection was closed here or
    /// had already been closed with nothing opened since.
    pub async fn disconnect_if_current(&self, connection_id: u64) -> bool {
        let mut slot = self.connection.lock().await;
        match slot.as_ref().map(|c| c.id) {
            Some(id) if id == connection_id => {
                if let Some(connection) = slot.take() {
                    self.close(connection).await;
                }
                self.set_state(ConnectionState::Disconnected);
                true
            }
            Some(current) => {
                tracing::debug!(connection_id, current, "connection already replaced");
                false
            }
            None => true,
        }
    }

    /// Write one line plus terminator.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Codec`] if `line` contains a newline (nothing is written).
    /// - [`ClientError::NotConnected`] if there is no open connection.
    /// - [`ClientError::Closed`] if the connection was closed while the
    ///   write was pending.
    /// - [`ClientError::Lines`] if the write fails.
    pub async fn send_line(&self, line: &str) -> Result<(), ClientError> {
        if codec::contains_newline(line) {
            return Err(CodecError::EmbeddedNewline.into());
        }

        let (writer, mut stop_writes) = {
            let slot = self.connection.lock().await;
            let Some(connection) = slot.as_ref() else {
                return Err(ClientError::NotConnected);
            };
            (
                Arc::clone(&connection.writer),
                connection.stop_writes.subscribe(),
            )
        };

        tokio::select! {
            biased;
            _ = stop_writes.changed() => {
                tracing::debug!("write abandoned, connection closing");
                Err(ClientError::Closed)
            }
            sent = async { writer.lock().await.send(line).await } => {
                sent.map_err(|e| {
                    tracing::warn!(err = %e, "write to server failed");
                    ClientError::from(e)
                })?;
                tracing::debug!(">>> {line}");
                Ok(())
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    /// Close the write channel, then the read channel, then the transport.
    ///
    /// Pending writes are abandoned first so the writer lock is free, and
    /// the final flush is bounded by [`CLOSE_FLUSH_TIMEOUT`].
    async fn close(&self, connection: Connection<C::Stream>) {
        tracing::info!(
            host = %connection.host,
            port = connection.port,
            connection_id = connection.id,
            "disconnecting"
        );

        connection.stop_writes.send_replace(true);
        {
            let mut writer = connection.writer.lock().await;
            let flushed = tokio::time::timeout(
                CLOSE_FLUSH_TIMEOUT,
                SinkExt::<&str>::close(&mut *writer),
            )
            .await;
            match flushed {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(err = %e, "error while closing connection");
                    self.last_error
                        .record(format!("Error while closing connection: {e}"));
                }
                Err(_) => {
                    tracing::warn!("peer not reading, dropping unsent output");
                    self.last_error
                        .record("Error while closing connection: output flush timed out");
                }
            }
        }

        // No receiver left means the read loop already finished.
        let _ = connection.closed.send(true);
        {
            let mut pending = self.pending_reader.lock();
            if pending
                .as_ref()
                .is_some_and(|r| r.connection_id == connection.id)
            {
                pending.take();
            }
        }

        // Dropping the last half releases the stream.
        drop(connection);
        tracing::info!("disconnected");
    }
}
