// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::future_not_send,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Integration tests for the outgoing command path.
//!
//! The loopback server stands in for the chat server and checks the exact
//! lines the client writes.

use std::time::Duration;

use linechat::client::ChatClient;
use linechat::transport::loopback::{LoopbackConnector, LoopbackPeer, LoopbackServer};

async fn connected() -> (ChatClient<LoopbackConnector>, LoopbackServer, LoopbackPeer) {
    let (connector, server) = LoopbackConnector::create_pair(64 * 1024);
    let client = ChatClient::with_connector(connector);
    assert!(client.connect("chat.local", 1300).await);
    let peer = server.accept().await.unwrap();
    (client, server, peer)
}

#[tokio::test]
async fn every_request_is_one_protocol_line() {
    let (client, _server, mut peer) = connected().await;

    assert!(client.try_login("alice").await);
    assert!(client.send_public_message("hello everyone").await);
    assert!(client.send_private_message("bob", "just you").await);
    assert!(client.refresh_user_list().await);
    assert!(client.ask_supported_commands().await);

    for expected in [
        "login alice",
        "msg hello everyone",
        "privmsg bob just you",
        "users",
        "help",
    ] {
        assert_eq!(peer.recv_line().await.as_deref(), Some(expected));
    }
}

#[tokio::test]
async fn newline_payload_is_rejected_without_any_write() {
    let (client, _server, mut peer) = connected().await;

    assert!(!client.send_public_message("first\nsecond").await);
    assert!(!client.send_private_message("bob", "a\nb").await);
    assert_eq!(client.last_error(), "Message contains newline, ignored");
    assert!(client.is_connection_active());

    // The first thing on the wire is the next valid command.
    assert!(client.refresh_user_list().await);
    assert_eq!(peer.recv_line().await.as_deref(), Some("users"));

    // And nothing else is pending.
    client.disconnect().await;
    assert_eq!(peer.recv_line().await, None);
}

#[tokio::test]
async fn sending_while_disconnected_fails_without_panicking() {
    let (connector, _server) = LoopbackConnector::create_pair(1024);
    let client = ChatClient::with_connector(connector);

    assert!(!client.try_login("alice").await);
    assert!(!client.send_public_message("hi").await);
    assert_eq!(client.last_error(), "Not connected to a chat server");
}

#[tokio::test]
async fn sending_after_disconnect_fails() {
    let (client, _server, _peer) = connected().await;
    client.disconnect().await;

    assert!(!client.refresh_user_list().await);
    assert_eq!(client.last_error(), "Not connected to a chat server");
}

#[tokio::test]
async fn sends_from_other_tasks_while_reading() {
    let (client, _server, mut peer) = connected().await;
    client.start_listen_task();

    let mut handles = Vec::new();
    for i in 0..10 {
        let sender = client.clone();
        handles.push(tokio::spawn(async move {
            sender.send_public_message(&format!("note {i}")).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    let mut received = Vec::new();
    for _ in 0..10 {
        let line = tokio::time::timeout(Duration::from_secs(5), peer.recv_line())
            .await
            .unwrap()
            .unwrap();
        received.push(line);
    }
    received.sort();
    let mut expected: Vec<String> = (0..10).map(|i| format!("msg note {i}")).collect();
    expected.sort();
    assert_eq!(received, expected);
}

#[tokio::test]
async fn connect_fails_when_no_server_is_listening() {
    let (connector, server) = LoopbackConnector::create_pair(1024);
    drop(server);
    let client = ChatClient::with_connector(connector);

    assert!(!client.connect("chat.local", 1300).await);
    assert!(!client.is_connection_active());
    assert_eq!(
        client.last_error(),
        "No chat server listening on chat.local:1300"
    );
}

#[tokio::test]
async fn disconnect_completes_while_peer_stops_reading() {
    let (connector, server) = LoopbackConnector::create_pair(1024);
    let client = ChatClient::with_connector(connector);
    assert!(client.connect("chat.local", 1300).await);
    // Accepted, never read.
    let _peer = server.accept().await.unwrap();
    client.start_listen_task();

    let sender = client.clone();
    let stalled =
        tokio::spawn(async move { sender.send_public_message(&"x".repeat(8192)).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    tokio::time::timeout(Duration::from_secs(5), client.disconnect())
        .await
        .expect("disconnect waited on a stalled send");
    assert!(!client.is_connection_active());

    let sent = tokio::time::timeout(Duration::from_secs(5), stalled)
        .await
        .unwrap()
        .unwrap();
    assert!(!sent);
}
