//! Explicit per-session context and the bounded-retry wait primitive.
//!
//! A [`Session`] ties together the three things every protocol phase needs:
//! the socket, the peer address, and the timing policy
//! ([`SessionConfig`]).  Phases receive the session as an argument — there
//! is no ambient socket state, and the timeout/retry budget are ordinary
//! configuration inputs instead of constants scattered through the code.
//!
//! [`Session::exchange`] is the single-outstanding-request primitive shared
//! by handshake and teardown: send a request, wait up to the timeout for a
//! reply the caller accepts, resend on timeout, and fail once the retry
//! budget is spent.  Replies from the wrong address, malformed datagrams,
//! and non-qualifying segments are ignored without consuming a retry.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::packet::Packet;
use crate::socket::{DrtpSocket, SocketError};

/// Timing policy for one session.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// How long each receive waits before a retransmission is triggered.
    pub timeout: Duration,
    /// Bounded attempt count for handshake/teardown exchanges and for
    /// consecutive no-progress rounds during data transfer.
    pub max_retries: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(400),
            max_retries: 5,
        }
    }
}

/// Errors from the retry primitive.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The retry budget was spent without a qualifying reply.
    #[error("no qualifying reply after {0} attempts")]
    RetryBudgetExhausted(u32),
    /// Underlying socket failure (not a malformed datagram).
    #[error(transparent)]
    Socket(#[from] SocketError),
}

/// One endpoint's view of a single protocol session.
///
/// Holds the socket handle, the peer address fixed at session start, and the
/// timing policy.  All state is private to this endpoint; the peer holds its
/// own.
#[derive(Debug)]
pub struct Session<'a> {
    socket: &'a DrtpSocket,
    /// The only address this session accepts datagrams from.
    pub peer: SocketAddr,
    /// Timing policy applied to every wait in every phase.
    pub config: SessionConfig,
}

impl<'a> Session<'a> {
    pub fn new(socket: &'a DrtpSocket, peer: SocketAddr, config: SessionConfig) -> Self {
        Self {
            socket,
            peer,
            config,
        }
    }

    /// The underlying socket.
    pub fn socket(&self) -> &DrtpSocket {
        self.socket
    }

    /// Send `packet` to the session peer.
    pub async fn send(&self, packet: &Packet) -> Result<(), SocketError> {
        self.socket.send_to(packet, self.peer).await
    }

    /// Wait up to the session timeout for one datagram **from the peer**.
    ///
    /// Returns `Ok(None)` on timeout.  Malformed datagrams and datagrams
    /// from other addresses are skipped; each skipped datagram simply
    /// re-enters the wait.
    pub async fn recv(&self) -> Result<Option<Packet>, SocketError> {
        loop {
            match self.socket.recv_from_timeout(self.config.timeout).await {
                Ok(Some((pkt, addr))) if addr == self.peer => return Ok(Some(pkt)),
                Ok(Some(_)) => continue,
                Ok(None) => return Ok(None),
                Err(e) if e.is_malformed() => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Bounded-retry request/response: send `request`, wait for a reply
    /// matching `accept`, resend on timeout.
    ///
    /// Only timeouts consume the retry budget; a reply that does not match
    /// is ignored and the request is sent again on the next pass, exactly as
    /// an idempotent retransmission.
    pub async fn exchange<F>(&self, request: &Packet, accept: F) -> Result<Packet, ExchangeError>
    where
        F: Fn(&Packet) -> bool,
    {
        let mut retries = 0u32;
        loop {
            self.send(request).await.map_err(ExchangeError::Socket)?;

            match self.recv().await.map_err(ExchangeError::Socket)? {
                Some(reply) if accept(&reply) => return Ok(reply),
                Some(_) => continue, // unexpected segment: resend, no retry spent
                None => {
                    retries += 1;
                    log::debug!(
                        "[session] timeout waiting for reply (attempt {retries}/{})",
                        self.config.max_retries
                    );
                    if retries >= self.config.max_retries {
                        return Err(ExchangeError::RetryBudgetExhausted(retries));
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
