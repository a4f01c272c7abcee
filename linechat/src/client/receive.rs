//! Read loop: the background task that turns incoming lines into events.

use std::sync::Arc;

use linechat_proto::event::ProtocolEvent;

use crate::transport::Connector;

use super::Shared;
use super::connection::ReadChannel;

/// Read lines until the connection ends, dispatching each one.
///
/// Ends on remote close, read error, or local disconnect (the pending read
/// returns end-of-stream). On exit the connection is closed if it is still
/// the one this loop was reading from, and exactly one
/// [`ProtocolEvent::Disconnected`] is delivered.
pub(crate) async fn read_loop<C: Connector>(
    shared: Arc<Shared<C>>,
    mut reader: ReadChannel<C::Stream>,
) {
    let connection_id = reader.connection_id();
    tracing::debug!(connection_id, "read loop started");

    while shared.connection.is_active() {
        match reader.next_line().await {
            Some(Ok(line)) => {
                if line.is_empty() {
                    continue;
                }
                tracing::debug!("<<< {line}");
                super::dispatch::dispatch_line(&shared.listeners, &line);
            }
            Some(Err(e)) => {
                tracing::warn!(err = %e, "error while reading server response, closing connection");
                shared
                    .connection
                    .record_error(format!("Server closed socket: {e}"));
                break;
            }
            None => {
                tracing::info!(connection_id, "server response stream ended");
                break;
            }
        }
    }

    drop(reader);
    if shared.connection.disconnect_if_current(connection_id).await {
        shared.listeners.notify_all(&ProtocolEvent::Disconnected);
    } else {
        tracing::debug!(connection_id, "newer connection live, not reporting disconnect");
    }
    tracing::debug!(connection_id, "read loop exiting");
}
