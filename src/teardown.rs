//! Connection teardown state machines.
//!
//! The initiator ([`close`]) sends FIN carrying the first unused sequence
//! number and retransmits it against timeouts until a FIN-ACK for that
//! number arrives.  The responder ([`respond`]) answers each FIN with a
//! FIN-ACK, then lingers for one quiet timeout so a retransmitted FIN
//! (whose first FIN-ACK was lost) still finds a live counterparty.

use thiserror::Error;

use crate::packet::{flags, Packet, SegmentKind};
use crate::session::{ExchangeError, Session};
use crate::socket::SocketError;

/// Teardown failure reasons.
///
/// A teardown failure does not undo the transfer: the payload has already
/// been acknowledged by the time FIN is sent.  Callers report it and move
/// on.
#[derive(Debug, Error)]
pub enum TeardownError {
    /// The retry budget was spent without a qualifying FIN-ACK.
    #[error("FIN not acknowledged after {0} attempts")]
    RetryBudgetExhausted(u32),
    /// Underlying socket failure.
    #[error(transparent)]
    Socket(#[from] SocketError),
}

impl From<ExchangeError> for TeardownError {
    fn from(e: ExchangeError) -> Self {
        match e {
            ExchangeError::RetryBudgetExhausted(n) => Self::RetryBudgetExhausted(n),
            ExchangeError::Socket(e) => Self::Socket(e),
        }
    }
}

/// Initiator half: send FIN with `fin_seq` and wait bounded-retry for a
/// FIN-ACK acknowledging it.  Any other reply is ignored within the budget.
pub async fn close(session: &Session<'_>, fin_seq: u16) -> Result<(), TeardownError> {
    let fin = Packet::control(fin_seq, 0, flags::FIN, 0);
    log::debug!("[teardown] → FIN seq={fin_seq}");

    session
        .exchange(&fin, |p| {
            p.kind() == SegmentKind::FinAck && p.header.ack == fin_seq
        })
        .await?;

    log::debug!("[teardown] ← FIN-ACK");
    log::info!("[teardown] connection closed");
    Ok(())
}

/// Responder half: acknowledge the peer's FIN, then linger.
///
/// The first FIN-ACK is sent immediately.  Because it may be lost, the
/// responder then keeps answering retransmitted FINs from the same peer
/// until one receive timeout passes with no datagram — at which point the
/// initiator must have accepted a FIN-ACK and stopped retransmitting.
pub async fn respond(session: &Session<'_>, fin_seq: u16, window: u16) -> Result<(), SocketError> {
    let fin_ack = Packet::control(0, fin_seq, flags::FIN | flags::ACK, window);
    session.send(&fin_ack).await?;
    log::debug!("[teardown] → FIN-ACK ack={fin_seq}");

    loop {
        match session.recv().await? {
            Some(pkt) if pkt.kind() == SegmentKind::Fin && pkt.header.seq == fin_seq => {
                session.send(&fin_ack).await?;
                log::debug!("[teardown] duplicate FIN, FIN-ACK resent");
            }
            Some(_) => continue,
            None => {
                log::info!("[teardown] connection closed");
                return Ok(());
            }
        }
    }
}
