//! Three-way handshake state machines.
//!
//! The two halves are asymmetric:
//!
//! - The **initiator** ([`connect`]) retransmits its SYN against timeouts
//!   until a qualifying SYN-ACK arrives, then replies once with an ACK
//!   carrying the agreed window.
//! - The **responder** ([`accept`]) blocks indefinitely for a bare SYN,
//!   then retransmits its SYN-ACK against timeouts until the peer's ACK
//!   arrives.
//!
//! Idempotent resend-on-timeout on both sides is what makes the exchange
//! survive the loss of any single datagram.  The agreed flow-control window
//! is the minimum of the two advertised windows and is fixed for the life
//! of the session.

use std::net::SocketAddr;

use thiserror::Error;

use crate::packet::{flags, Packet, SegmentKind};
use crate::session::{ExchangeError, Session, SessionConfig};
use crate::socket::{DrtpSocket, SocketError};

/// Sequence number of the first DATA segment after a completed handshake.
pub const START_SEQ: u16 = 1;

/// Outcome of a completed handshake, identical in shape on both sides.
#[derive(Debug, Clone, Copy)]
pub struct Established {
    /// The peer this session is bound to.
    pub peer: SocketAddr,
    /// Agreed window: `min(local advertised, peer advertised)`.
    pub window: u16,
    /// First DATA sequence number (always [`START_SEQ`]).
    pub start_seq: u16,
}

/// Handshake failure reasons.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The retry budget was spent without completing the exchange.
    #[error("three-way handshake failed after {0} attempts")]
    RetryBudgetExhausted(u32),
    /// Underlying socket failure.
    #[error(transparent)]
    Socket(#[from] SocketError),
}

impl From<ExchangeError> for HandshakeError {
    fn from(e: ExchangeError) -> Self {
        match e {
            ExchangeError::RetryBudgetExhausted(n) => Self::RetryBudgetExhausted(n),
            ExchangeError::Socket(e) => Self::Socket(e),
        }
    }
}

/// Initiator half: establish a session with the responder at
/// `session.peer`.
///
/// Sends SYN (seq 0, advertising `local_window`), waits bounded-retry for a
/// SYN-ACK acknowledging [`START_SEQ`], then replies once with an ACK
/// carrying the agreed window.  Replies that are not a qualifying SYN-ACK
/// are ignored without failing the handshake.
pub async fn connect(
    session: &Session<'_>,
    local_window: u16,
) -> Result<Established, HandshakeError> {
    let syn = Packet::control(0, 0, flags::SYN, local_window);
    log::debug!("[handshake] → SYN window={local_window}");

    let syn_ack = session
        .exchange(&syn, |p| {
            p.kind() == SegmentKind::SynAck && p.header.ack == START_SEQ
        })
        .await?;
    log::debug!(
        "[handshake] ← SYN-ACK ack={} window={}",
        syn_ack.header.ack,
        syn_ack.header.window
    );

    let window = local_window.min(syn_ack.header.window);
    let ack = Packet::control(START_SEQ, START_SEQ, flags::ACK, window);
    session.send(&ack).await?;
    log::debug!("[handshake] → ACK window={window}");
    log::info!("[handshake] connection established, agreed window {window}");

    Ok(Established {
        peer: session.peer,
        window,
        start_seq: START_SEQ,
    })
}

/// Responder half: wait for one initiator and complete the handshake.
///
/// Blocks indefinitely for a bare SYN (SYN set, ACK clear — retransmitted
/// ACKs and stray segments are discarded), remembers the originating
/// address, then retransmits SYN-ACK bounded-retry until an ACK arrives
/// from that same address.  Datagrams from other addresses or with
/// malformed headers never consume a retry.
///
/// On retry exhaustion the attempt is abandoned with an error; the caller
/// returns to listening for a new SYN.
pub async fn accept(
    socket: &DrtpSocket,
    config: SessionConfig,
    local_window: u16,
) -> Result<Established, HandshakeError> {
    let peer = loop {
        match socket.recv_from().await {
            Ok((pkt, addr)) if pkt.kind() == SegmentKind::Syn => {
                log::debug!(
                    "[handshake] ← SYN from {addr} window={}",
                    pkt.header.window
                );
                break addr;
            }
            Ok(_) => continue,
            Err(e) if e.is_malformed() => continue,
            Err(e) => return Err(e.into()),
        }
    };

    let session = Session::new(socket, peer, config);
    let syn_ack = Packet::control(0, START_SEQ, flags::SYN | flags::ACK, local_window);
    log::debug!("[handshake] → SYN-ACK window={local_window}");

    let ack = session
        .exchange(&syn_ack, |p| p.kind() == SegmentKind::Ack)
        .await?;
    log::debug!("[handshake] ← ACK window={}", ack.header.window);

    let window = local_window.min(ack.header.window);
    log::info!("[handshake] connection established with {peer}, agreed window {window}");

    Ok(Established {
        peer,
        window,
        start_seq: START_SEQ,
    })
}
