//! Integration tests for the three-way handshake.
//!
//! Each test spins up a real UDP socket on loopback, runs the responder
//! half in a background task, and verifies what both sides agree on.

use std::net::SocketAddr;
use std::time::Duration;

use drtp::handshake::{self, HandshakeError};
use drtp::packet::{flags, Packet};
use drtp::session::{Session, SessionConfig};
use drtp::socket::DrtpSocket;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Bind a socket to an OS-assigned port on loopback.
async fn ephemeral() -> DrtpSocket {
    DrtpSocket::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
        .await
        .expect("bind failed")
}

/// Short timeouts so failure paths finish quickly.
fn fast() -> SessionConfig {
    SessionConfig {
        timeout: Duration::from_millis(100),
        max_retries: 3,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Advertised windows 5 (client) and 3 (server) must negotiate to 3 on both
/// sides, with DATA numbering starting at 1.
#[tokio::test]
async fn both_sides_agree_on_min_window() {
    let server_sock = ephemeral().await;
    let server_addr = server_sock.local_addr;

    let server =
        tokio::spawn(async move { handshake::accept(&server_sock, fast(), 3).await });

    let client_sock = ephemeral().await;
    let session = Session::new(&client_sock, server_addr, fast());
    let client_est = handshake::connect(&session, 5).await.expect("connect");

    let server_est = server
        .await
        .expect("server task panicked")
        .expect("accept failed");

    assert_eq!(client_est.window, 3);
    assert_eq!(server_est.window, 3);
    assert_eq!(client_est.start_seq, 1);
    assert_eq!(server_est.start_seq, 1);
    assert_eq!(server_est.peer, client_sock.local_addr);
}

/// Connecting to an address where nobody is listening must fail after the
/// configured number of retransmissions, not hang forever.
#[tokio::test]
async fn connect_to_silent_peer_exhausts_retry_budget() {
    // Bind-then-drop so the port is unbound; SYNs sent there get no reply.
    let silent_addr = ephemeral().await.local_addr;

    let client_sock = ephemeral().await;
    let session = Session::new(&client_sock, silent_addr, fast());

    let result = handshake::connect(&session, 3).await;
    assert!(
        matches!(result, Err(HandshakeError::RetryBudgetExhausted(3))),
        "expected RetryBudgetExhausted(3), got: {result:?}"
    );
}

/// The responder must sit through stray segments — a retransmitted ACK, a
/// truncated datagram — and still accept the first real SYN.
#[tokio::test]
async fn responder_ignores_stray_segments_before_syn() {
    let server_sock = ephemeral().await;
    let server_addr = server_sock.local_addr;

    let server =
        tokio::spawn(async move { handshake::accept(&server_sock, fast(), 4).await });

    let client_sock = ephemeral().await;

    // Noise first: a bare ACK (wrong phase) and a short datagram (malformed).
    client_sock
        .send_to(&Packet::control(9, 9, flags::ACK, 9), server_addr)
        .await
        .expect("send stray ack");
    client_sock
        .send_raw(&[0u8; 3], server_addr)
        .await
        .expect("send malformed");

    let session = Session::new(&client_sock, server_addr, fast());
    let client_est = handshake::connect(&session, 4).await.expect("connect");

    let server_est = server.await.expect("join").expect("accept");
    assert_eq!(client_est.window, 4);
    assert_eq!(server_est.window, 4);
}

/// A SYN-ACK whose ack number is wrong must be ignored; the initiator keeps
/// retrying and fails once the budget is spent, never accepting it.
#[tokio::test]
async fn initiator_rejects_mismatched_syn_ack() {
    let server_sock = ephemeral().await;
    let server_addr = server_sock.local_addr;

    // A fake responder that answers the first SYN with a bad ack number and
    // then goes silent, so the initiator must fall back to its timeouts.
    let responder = tokio::spawn(async move {
        loop {
            let Ok((pkt, from)) = server_sock.recv_from().await else {
                break;
            };
            if pkt.header.flags == flags::SYN {
                let bad = Packet::control(0, 7, flags::SYN | flags::ACK, 4);
                let _ = server_sock.send_to(&bad, from).await;
                break;
            }
        }
        // Keep the socket alive (and silent) until the client gives up.
        tokio::time::sleep(Duration::from_secs(2)).await;
    });

    let client_sock = ephemeral().await;
    let session = Session::new(&client_sock, server_addr, fast());
    let result = handshake::connect(&session, 4).await;

    assert!(
        matches!(result, Err(HandshakeError::RetryBudgetExhausted(_))),
        "mismatched SYN-ACK must never establish: {result:?}"
    );
    responder.abort();
}
