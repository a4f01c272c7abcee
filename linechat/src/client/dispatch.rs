//! Command dispatcher: incoming line → [`ProtocolEvent`] → listeners.

use linechat_proto::codec;
use linechat_proto::event::ProtocolEvent;

use super::listener::ListenerRegistry;

/// Interpret one incoming line and fan the resulting event out.
///
/// Returns the event that was delivered, if any. Lines the client does not
/// understand are logged and dropped; they never affect the connection.
pub fn dispatch_line(listeners: &ListenerRegistry, line: &str) -> Option<ProtocolEvent> {
    let raw = codec::decode(line);
    match ProtocolEvent::parse(raw) {
        Ok(Some(event)) => {
            listeners.notify_all(&event);
            Some(event)
        }
        Ok(None) => {
            tracing::debug!(command = raw.command, params = raw.params, "server acknowledged");
            None
        }
        Err(e) => {
            tracing::warn!(err = %e, line, "ignoring unrecognized server line");
            None
        }
    }
}
