//! Async UDP socket abstraction.
//!
//! [`DrtpSocket`] is a thin wrapper around `tokio::net::UdpSocket` that
//! speaks [`crate::packet::Packet`] instead of raw bytes.  All protocol
//! logic lives elsewhere; this module owns only byte I/O.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::UdpSocket;

use crate::packet::{Packet, PacketError, DATA_LEN, HEADER_LEN};

/// Receive buffer size: one header plus a maximum-size payload.  Anything
/// longer than a legal DRTP datagram is truncated by the OS, which the
/// protocol treats like any other malformed input.
const MAX_DATAGRAM: usize = HEADER_LEN + DATA_LEN;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can arise from socket operations.
#[derive(Debug, Error)]
pub enum SocketError {
    /// Underlying I/O error from the OS.
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The received datagram could not be decoded as a valid packet.
    ///
    /// Protocol phases skip these datagrams and keep waiting.
    #[error("packet decode error: {0}")]
    Malformed(#[from] PacketError),
}

impl SocketError {
    /// `true` when the error is a malformed datagram rather than an OS
    /// failure — i.e. the receive loop should ignore it and keep going.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

// ---------------------------------------------------------------------------
// DrtpSocket
// ---------------------------------------------------------------------------

/// An async, packet-oriented UDP socket.
///
/// All methods are `&self`; one socket is accessed strictly sequentially by
/// the phase that currently owns the session.
#[derive(Debug)]
pub struct DrtpSocket {
    /// Address this socket is bound to (filled in after the OS assigns an
    /// ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl DrtpSocket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing port `0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, SocketError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Encode `packet` and send it as a single UDP datagram to `dest`.
    pub async fn send_to(&self, packet: &Packet, dest: SocketAddr) -> Result<(), SocketError> {
        self.inner.send_to(&packet.encode(), dest).await?;
        Ok(())
    }

    /// Send an already-encoded datagram to `dest`.
    ///
    /// The retransmission path keeps the original encodings and resends
    /// them verbatim.
    pub async fn send_raw(&self, bytes: &[u8], dest: SocketAddr) -> Result<(), SocketError> {
        self.inner.send_to(bytes, dest).await?;
        Ok(())
    }

    /// Receive the next datagram and decode it into a [`Packet`].
    ///
    /// Returns `(packet, sender_address)`.  A datagram that fails to decode
    /// is returned as [`SocketError::Malformed`]; the caller skips it.
    pub async fn recv_from(&self) -> Result<(Packet, SocketAddr), SocketError> {
        let mut buf = [0u8; MAX_DATAGRAM];
        let (n, addr) = self.inner.recv_from(&mut buf).await?;
        let packet = Packet::decode(&buf[..n])?;
        Ok((packet, addr))
    }

    /// Like [`recv_from`](Self::recv_from), but gives up after `wait`.
    ///
    /// Returns `Ok(None)` on timeout — the caller decides whether that
    /// consumes a retry.
    pub async fn recv_from_timeout(
        &self,
        wait: Duration,
    ) -> Result<Option<(Packet, SocketAddr)>, SocketError> {
        match tokio::time::timeout(wait, self.recv_from()).await {
            Ok(result) => result.map(Some),
            Err(_elapsed) => Ok(None),
        }
    }
}
