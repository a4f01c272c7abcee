//! Listener contract and registry.
//!
//! A [`ChatListener`] receives every [`ProtocolEvent`] the client produces.
//! The GUI, the terminal shell and test doubles all implement it.
//! Callbacks run synchronously on the task that detected the event (the
//! read loop for protocol events); marshaling to another thread is the
//! listener's job.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;

use linechat_proto::event::ProtocolEvent;
use linechat_proto::message::TextMessage;

/// Observer of client events. Every handler defaults to a no-op.
pub trait ChatListener: Send + Sync {
    /// The server answered a login request.
    fn on_login_result(&self, _success: bool, _err_msg: &str) {}

    /// The connection was closed (by the server, an I/O error, or locally).
    fn on_disconnect(&self) {}

    /// A public or private message arrived.
    fn on_message_received(&self, _message: &TextMessage) {}

    /// The server could not deliver one of our messages.
    fn on_message_error(&self, _err_msg: &str) {}

    /// The server sent the list of logged-in users.
    fn on_user_list(&self, _usernames: &[String]) {}

    /// The server sent the commands it supports.
    fn on_supported_commands(&self, _commands: &[String]) {}

    /// The server did not understand one of our commands.
    fn on_command_error(&self, _err_msg: &str) {}
}

/// Route one event to the matching handler of `listener`.
pub fn deliver(listener: &dyn ChatListener, event: &ProtocolEvent) {
    match event {
        ProtocolEvent::LoginResult { success, err_msg } => {
            listener.on_login_result(*success, err_msg);
        }
        ProtocolEvent::MessageReceived(message) => listener.on_message_received(message),
        ProtocolEvent::MessageError { err_msg } => listener.on_message_error(err_msg),
        ProtocolEvent::CommandError { err_msg } => listener.on_command_error(err_msg),
        ProtocolEvent::UserList { usernames } => listener.on_user_list(usernames),
        ProtocolEvent::SupportedCommands { commands } => listener.on_supported_commands(commands),
        ProtocolEvent::Disconnected => listener.on_disconnect(),
    }
}

/// Registered listeners, unique by `Arc` identity, in registration order.
///
/// Notification iterates a snapshot taken under the read lock, so
/// listeners may be added or removed from any task while a notification
/// is in progress.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<Arc<dyn ChatListener>>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`. Returns `false` if it was already registered.
    pub fn add(&self, listener: Arc<dyn ChatListener>) -> bool {
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Unregister `listener`. Returns `false` if it was not registered.
    pub fn remove<L: ChatListener + ?Sized>(&self, listener: &Arc<L>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        listeners.len() != before
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// `true` when no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Deliver `event` to every registered listener.
    ///
    /// A panicking listener is logged and skipped; the remaining listeners
    /// still receive the event.
    pub fn notify_all(&self, event: &ProtocolEvent) {
        let snapshot: Vec<Arc<dyn ChatListener>> = self.listeners.read().clone();
        for listener in &snapshot {
            if catch_unwind(AssertUnwindSafe(|| deliver(listener.as_ref(), event))).is_err() {
                tracing::error!(?event, "listener panicked during notification");
            }
        }
    }
}

fn same_listener<A: ?Sized, B: ?Sized>(a: &Arc<A>, b: &Arc<B>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
