//! UDP Transport Tests (bgh-transport)
//!
//! Tests for the UDP transport including:
//! - Status socket binding and socket options
//! - Ephemeral and persistent command senders
//! - Receive timeouts

use bgh_transport::{CommandSender, StatusReceiver, TransportError, UdpConfig};
use std::net::SocketAddr;
use std::time::Duration;

fn free_udp_port() -> u16 {
    let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap().port()
}

// ============================================================================
// Binding Tests
// ============================================================================

#[tokio::test]
async fn test_bind_specific_port() {
    let port = free_udp_port();
    let addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();

    let receiver = StatusReceiver::bind(addr).expect("Bind should succeed");
    assert_eq!(receiver.local_addr().unwrap().port(), port);
}

#[tokio::test]
async fn test_rebind_after_drop() {
    let port = free_udp_port();
    let addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();

    let receiver = StatusReceiver::bind(addr).expect("First bind should succeed");
    drop(receiver);

    StatusReceiver::bind(addr).expect("Port should be free again after drop");
}

#[tokio::test]
async fn test_bind_conflict_without_reuse() {
    let port = free_udp_port();
    let addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
    let config = UdpConfig {
        reuse_address: false,
        ..UdpConfig::default()
    };

    let _first = StatusReceiver::bind_with_config(addr, config.clone()).unwrap();
    let second = StatusReceiver::bind_with_config(addr, config);

    match second {
        Err(TransportError::BindFailed { addr: failed, .. }) => assert_eq!(failed, addr),
        Err(e) => panic!("Unexpected error: {}", e),
        Ok(_) => panic!("Second bind should fail without address reuse"),
    }
}

// ============================================================================
// Send/Receive Tests
// ============================================================================

#[tokio::test]
async fn test_persistent_sender_keeps_source_port() {
    let mut receiver = StatusReceiver::bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let target = receiver.local_addr().unwrap();
    let source_port = free_udp_port();

    let sender = CommandSender::persistent(target, Some(source_port))
        .await
        .expect("Persistent sender should bind");
    assert!(sender.is_persistent());

    for payload in [&b"one"[..], &b"two"[..]] {
        sender.send(payload).await.unwrap();
        let datagram = receiver
            .recv_timeout(Duration::from_secs(2))
            .await
            .expect("Timeout waiting for data");
        assert_eq!(datagram.data.as_ref(), payload);
        assert_eq!(datagram.from.port(), source_port);
    }
}

#[tokio::test]
async fn test_ephemeral_sender_multiple_messages() {
    let mut receiver = StatusReceiver::bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let sender = CommandSender::ephemeral(receiver.local_addr().unwrap());

    for i in 0u8..5 {
        sender.send(&[i; 25]).await.unwrap();
    }

    for i in 0u8..5 {
        let datagram = receiver.recv_timeout(Duration::from_secs(2)).await.unwrap();
        assert_eq!(datagram.data.len(), 25);
        assert_eq!(datagram.data[0], i, "Loopback should preserve order");
    }
}

#[tokio::test]
async fn test_oversized_datagram_is_truncated() {
    let config = UdpConfig {
        max_packet_size: 32,
        ..UdpConfig::default()
    };
    let mut receiver =
        StatusReceiver::bind_with_config("127.0.0.1:0".parse().unwrap(), config).unwrap();

    let sender = CommandSender::ephemeral(receiver.local_addr().unwrap());
    sender.send(&[7u8; 100]).await.unwrap();

    let datagram = receiver.recv_timeout(Duration::from_secs(2)).await.unwrap();
    assert_eq!(datagram.data.len(), 32);
}

#[tokio::test]
async fn test_recv_timeout_is_bounded() {
    let mut receiver = StatusReceiver::bind("127.0.0.1:0".parse().unwrap()).unwrap();

    let start = std::time::Instant::now();
    let result = receiver.recv_timeout(Duration::from_millis(100)).await;

    assert!(matches!(result, Err(TransportError::Timeout)));
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_try_recv_drains_queue_without_blocking() {
    let mut receiver = StatusReceiver::bind("127.0.0.1:0".parse().unwrap()).unwrap();
    assert!(receiver.try_recv().unwrap().is_none());

    let sender = CommandSender::ephemeral(receiver.local_addr().unwrap());
    sender.send(b"first").await.unwrap();
    sender.send(b"second").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let first = receiver.try_recv().unwrap().expect("first datagram queued");
    let second = receiver.try_recv().unwrap().expect("second datagram queued");
    assert_eq!(&first.data[..], b"first");
    assert_eq!(&second.data[..], b"second");
    assert!(receiver.try_recv().unwrap().is_none());
}
