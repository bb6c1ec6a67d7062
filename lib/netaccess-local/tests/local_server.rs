/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use netaccess_local::registry::{MemoryRegistry, ServerRegistry};
use netaccess_local::{LocalServer, LocalServerConfig, LocalServerError, LocalSocket, LocalSocketError};

fn new_server(registry: &Arc<MemoryRegistry>) -> LocalServer<MemoryRegistry> {
    LocalServer::new(registry.clone(), LocalServerConfig::default())
}

#[tokio::test]
async fn listen_publishes_port() {
    let registry = Arc::new(MemoryRegistry::default());
    let mut server = new_server(&registry);
    server.listen("alpha").unwrap();

    assert!(server.is_listening());
    assert_eq!(server.server_name(), "alpha");
    assert_eq!(server.full_server_name(), "QLocalServer/alpha");
    let port = server.server_port().unwrap();
    assert_eq!(
        registry.value("QLocalServer/alpha").unwrap(),
        port.to_string()
    );

    server.close_server();
    assert!(!server.is_listening());
    assert!(!registry.contains("QLocalServer/alpha"));
}

#[tokio::test]
async fn name_in_use_keeps_entry() {
    let registry = Arc::new(MemoryRegistry::default());
    registry.set_value("QLocalServer/beta", "5555");

    let mut server = new_server(&registry);
    let e = server.listen("beta").unwrap_err();
    assert!(matches!(e, LocalServerError::NameInUse(_)));
    assert!(matches!(
        server.server_error(),
        Some(LocalServerError::NameInUse(_))
    ));
    assert!(!server.is_listening());
    assert_eq!(registry.value("QLocalServer/beta").unwrap(), "5555");

    drop(server);
    assert_eq!(registry.value("QLocalServer/beta").unwrap(), "5555");

    assert!(LocalServer::remove_server(&*registry, "beta"));
    assert!(!registry.contains("QLocalServer/beta"));
    assert!(LocalServer::remove_server(&*registry, "beta"));

    let mut server = new_server(&registry);
    server.listen("beta").unwrap();
}

#[tokio::test]
async fn second_server_same_name() {
    let registry = Arc::new(MemoryRegistry::default());
    let mut first = new_server(&registry);
    first.listen("shared").unwrap();
    let port = first.server_port().unwrap().to_string();

    let mut second = new_server(&registry);
    let e = second.listen("shared").unwrap_err();
    assert!(matches!(e, LocalServerError::NameInUse(name) if name == "QLocalServer/shared"));
    assert!(!second.is_listening());
    assert_eq!(registry.value("QLocalServer/shared").unwrap(), port);

    second.close_server();
    drop(second);
    assert!(first.is_listening());
    assert_eq!(registry.value("QLocalServer/shared").unwrap(), port);

    // clients still reach the first server
    let client = LocalSocket::connect_to_server(&*registry, "shared")
        .await
        .unwrap();
    assert!(!first.wait_for_new_connection(Duration::from_secs(5)).await);
    let accepted = first.next_pending_connection().unwrap();
    assert_eq!(accepted.peer_addr().unwrap(), client.local_addr().unwrap());
}

#[tokio::test]
async fn already_listening() {
    let registry = Arc::new(MemoryRegistry::default());
    let mut server = new_server(&registry);
    server.listen("gamma").unwrap();
    let e = server.listen("gamma2").unwrap_err();
    assert!(matches!(e, LocalServerError::AlreadyListening));
    assert!(!registry.contains("QLocalServer/gamma2"));
}

#[tokio::test]
async fn anonymous_name_blanked_on_close() {
    let registry = Arc::new(MemoryRegistry::default());
    let mut server = new_server(&registry);
    server.listen("").unwrap();
    assert_eq!(server.full_server_name(), "QLocalServer/");
    assert!(!registry.value("QLocalServer/").unwrap().is_empty());

    server.close_server();
    assert_eq!(registry.value("QLocalServer/").unwrap(), "");

    let mut server = new_server(&registry);
    server.listen("").unwrap();
}

#[tokio::test]
async fn drop_unregisters() {
    let registry = Arc::new(MemoryRegistry::default());
    let mut server = new_server(&registry);
    server.listen("delta").unwrap();
    drop(server);
    assert!(!registry.contains("QLocalServer/delta"));
}

#[tokio::test]
async fn connect_through_registry() {
    let registry = Arc::new(MemoryRegistry::default());
    let mut server = new_server(&registry);
    server.listen("echo").unwrap();

    let client = tokio::spawn({
        let registry = registry.clone();
        async move {
            let mut socket = LocalSocket::connect_to_server(&*registry, "echo")
                .await
                .unwrap();
            socket.write_all(b"ping").await.unwrap();
            let mut buf = [0u8; 4];
            socket.read_exact(&mut buf).await.unwrap();
            buf
        }
    });

    assert!(!server.wait_for_new_connection(Duration::from_secs(5)).await);
    assert!(server.has_pending_connections());
    let mut peer = server.next_pending_connection().unwrap();
    assert!(!server.has_pending_connections());

    let mut buf = [0u8; 4];
    peer.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");
    peer.write_all(b"pong").await.unwrap();

    assert_eq!(&client.await.unwrap(), b"pong");
}

#[tokio::test]
async fn server_not_found() {
    let registry = MemoryRegistry::default();
    let e = LocalSocket::connect_to_server(&registry, "missing")
        .await
        .unwrap_err();
    assert!(matches!(e, LocalSocketError::ServerNotFound(_)));

    registry.set_value("QLocalServer/bad", "not-a-port");
    let e = LocalSocket::connect_to_server(&registry, "bad")
        .await
        .unwrap_err();
    assert!(matches!(e, LocalSocketError::InvalidPort(_, _)));
}

#[tokio::test]
async fn wait_times_out() {
    let registry = Arc::new(MemoryRegistry::default());
    let mut server = new_server(&registry);
    server.listen("idle").unwrap();
    assert!(server.wait_for_new_connection(Duration::from_millis(50)).await);
    assert!(!server.has_pending_connections());
    assert!(!server.accept_pending());
}

#[tokio::test]
async fn pending_queue_limit() {
    let registry = Arc::new(MemoryRegistry::default());
    let mut server = new_server(&registry);
    server.set_max_pending_connections(1);
    server.listen("limited").unwrap();

    let _c1 = LocalSocket::connect_to_server(&*registry, "limited")
        .await
        .unwrap();
    let _c2 = LocalSocket::connect_to_server(&*registry, "limited")
        .await
        .unwrap();

    assert!(!server.wait_for_new_connection(Duration::from_secs(5)).await);
    assert!(!server.accept_pending());
    assert!(server.next_pending_connection().is_some());
    assert!(server.next_pending_connection().is_none());

    // the second client is still in the listen backlog
    let second = server.next_connection().await.unwrap();
    assert!(second.peer_addr().is_ok());
}

#[tokio::test]
async fn accept_burst() {
    let registry = Arc::new(MemoryRegistry::default());
    let mut server = new_server(&registry);
    server.listen("burst").unwrap();

    let mut clients = Vec::new();
    for _ in 0..3 {
        let c = LocalSocket::connect_to_server(&*registry, "burst")
            .await
            .unwrap();
        clients.push(c);
    }

    assert!(!server.wait_for_new_connection(Duration::from_secs(5)).await);
    while server.accept_pending() {}
    let mut accepted = 0;
    while server.next_pending_connection().is_some() {
        accepted += 1;
    }
    assert_eq!(accepted, 3);
    assert!(server.server_error().is_none());
}

#[tokio::test]
async fn adopted_listener_not_registered() {
    let registry = Arc::new(MemoryRegistry::default());
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut server = new_server(&registry);
    server.listen_socket(listener).unwrap();
    assert!(server.is_listening());
    assert_eq!(server.server_port(), Some(port));
    assert!(registry.is_empty());
    server.close_server();
    assert!(registry.is_empty());
}
