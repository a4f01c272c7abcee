// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::future_not_send,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Integration tests for connect/disconnect over real TCP sockets.
//!
//! Each test binds its own `TcpListener` on `127.0.0.1:0`, so tests run in
//! parallel without port clashes.

use std::sync::Arc;
use std::time::Duration;

use linechat::client::{ChatClient, ChatListener, ConnectionState};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Upper bound for operations that must not deadlock.
const DEADLOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Bind a listener on an OS-assigned port.
async fn bind() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// A port with nothing listening on it.
async fn closed_port() -> u16 {
    let (listener, port) = bind().await;
    drop(listener);
    port
}

/// Counts disconnect notifications.
struct DisconnectCounter {
    tx: mpsc::UnboundedSender<()>,
}

impl ChatListener for DisconnectCounter {
    fn on_disconnect(&self) {
        let _ = self.tx.send(());
    }
}

#[tokio::test]
async fn active_flag_follows_lifecycle() {
    let (listener, port) = bind().await;
    let client = ChatClient::new();
    assert!(!client.is_connection_active());
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);

    let (connected, accepted) = tokio::join!(client.connect("127.0.0.1", port), listener.accept());
    assert!(connected);
    accepted.unwrap();
    assert!(client.is_connection_active());
    assert_eq!(client.connection_state(), ConnectionState::Connected);

    client.disconnect().await;
    assert!(!client.is_connection_active());
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn concurrent_disconnects_neither_fail_nor_deadlock() {
    let (listener, port) = bind().await;
    let client = ChatClient::new();
    let (connected, _accepted) =
        tokio::join!(client.connect("127.0.0.1", port), listener.accept());
    assert!(connected);
    client.start_listen_task();

    let a = client.clone();
    let b = client.clone();
    let both = async {
        tokio::join!(
            tokio::spawn(async move { a.disconnect().await }),
            tokio::spawn(async move { b.disconnect().await }),
        )
    };
    let (first, second) = tokio::time::timeout(DEADLOCK_TIMEOUT, both).await.unwrap();
    first.unwrap();
    second.unwrap();

    assert!(!client.is_connection_active());
    // A third call after the race finds nothing to close.
    client.disconnect().await;
    assert!(!client.is_connection_active());
}

#[tokio::test]
async fn user_disconnect_racing_server_close_ends_disconnected() {
    let (listener, port) = bind().await;
    let client = ChatClient::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.add_listener(Arc::new(DisconnectCounter { tx }));

    let (connected, accepted) = tokio::join!(client.connect("127.0.0.1", port), listener.accept());
    assert!(connected);
    let (server_side, _) = accepted.unwrap();
    client.start_listen_task();

    // Server hangs up while the user clicks disconnect.
    let hang_up = tokio::spawn(async move { drop(server_side) });
    tokio::time::timeout(DEADLOCK_TIMEOUT, client.disconnect())
        .await
        .unwrap();
    hang_up.await.unwrap();

    tokio::time::timeout(DEADLOCK_TIMEOUT, rx.recv())
        .await
        .unwrap()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    // Exactly one disconnect notification from the single read loop.
    assert!(rx.try_recv().is_err());
    assert!(!client.is_connection_active());
}

#[tokio::test]
async fn server_close_triggers_disconnect_event() {
    let (listener, port) = bind().await;
    let client = ChatClient::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.add_listener(Arc::new(DisconnectCounter { tx }));

    let (connected, accepted) = tokio::join!(client.connect("127.0.0.1", port), listener.accept());
    assert!(connected);
    let (mut server_side, _) = accepted.unwrap();
    client.start_listen_task();

    server_side.shutdown().await.unwrap();
    drop(server_side);

    tokio::time::timeout(DEADLOCK_TIMEOUT, rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(!client.is_connection_active());
}

#[tokio::test]
async fn unknown_host_fails_and_stays_disconnected() {
    let client = ChatClient::new();
    assert!(!client.connect("nonexistent.invalid", 9999).await);
    assert!(!client.is_connection_active());
    assert!(client.last_error().starts_with("Unknown host"));
}

#[tokio::test]
async fn refused_port_reports_no_listener() {
    let port = closed_port().await;
    let client = ChatClient::new();
    assert!(!client.connect("127.0.0.1", port).await);
    assert!(!client.is_connection_active());
    assert!(client.last_error().starts_with("No chat server listening"));
}

#[tokio::test]
async fn last_error_is_empty_then_tracks_most_recent_failure() {
    let (listener, port) = bind().await;
    let client = ChatClient::new();
    assert_eq!(client.last_error(), "");

    assert!(!client.connect("nonexistent.invalid", 9999).await);
    let first = client.last_error();
    assert!(first.starts_with("Unknown host"));

    let (connected, _accepted) = tokio::join!(client.connect("127.0.0.1", port), listener.accept());
    assert!(connected);
    // Success does not clear the previous failure.
    assert_eq!(client.last_error(), first);

    assert!(!client.send_public_message("two\nlines").await);
    assert_eq!(client.last_error(), "Message contains newline, ignored");
}

#[tokio::test]
async fn reconnect_after_disconnect() {
    let (listener, port) = bind().await;
    let client = ChatClient::new();

    for round in 0..2 {
        let (connected, accepted) =
            tokio::join!(client.connect("127.0.0.1", port), listener.accept());
        assert!(connected, "connect round {round}");
        let (server_side, _) = accepted.unwrap();
        client.start_listen_task();

        assert!(client.try_login("alice").await);
        let mut lines = BufReader::new(server_side).lines();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("login alice"));

        client.disconnect().await;
        assert!(!client.is_connection_active());
    }
}

#[tokio::test]
async fn independent_clients_do_not_share_state() {
    let (listener, port) = bind().await;
    let first = ChatClient::new();
    let second = ChatClient::new();

    let (connected, _accepted) = tokio::join!(first.connect("127.0.0.1", port), listener.accept());
    assert!(connected);
    assert!(first.is_connection_active());
    assert!(!second.is_connection_active());

    assert!(!second.refresh_user_list().await);
    assert_eq!(first.last_error(), "");
    first.disconnect().await;
}

#[tokio::test]
async fn commands_travel_over_tcp() {
    let (listener, port) = bind().await;
    let client = ChatClient::new();
    let (connected, accepted) = tokio::join!(client.connect("127.0.0.1", port), listener.accept());
    assert!(connected);
    let (server_side, _): (TcpStream, _) = accepted.unwrap();
    let mut lines = BufReader::new(server_side).lines();

    assert!(client.send_private_message("bob", "hi bob").await);
    assert!(client.ask_supported_commands().await);
    assert_eq!(
        lines.next_line().await.unwrap().as_deref(),
        Some("privmsg bob hi bob")
    );
    assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("help"));

    client.disconnect().await;
    // The server sees end-of-stream once the client closes.
    assert_eq!(lines.next_line().await.unwrap(), None);
}
