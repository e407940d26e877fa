//! Client-side session orchestrator.
//!
//! Sequences the three phases — handshake, Go-Back-N transfer, teardown —
//! over one socket against one server.  The outgoing bytes come from any
//! `io::Read` source; the client exits after a single attempt, successful
//! or not.

use std::io::{self, Read};
use std::net::SocketAddr;

use thiserror::Error;

use crate::handshake::{self, HandshakeError};
use crate::session::{Session, SessionConfig};
use crate::socket::DrtpSocket;
use crate::teardown::{self, TeardownError};
use crate::transfer::{self, TransferError};

/// Everything that can end a client session early.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("handshake: {0}")]
    Handshake(#[from] HandshakeError),
    #[error("transfer: {0}")]
    Transfer(#[from] TransferError),
    #[error("teardown: {0}")]
    Teardown(#[from] TeardownError),
    #[error("reading source: {0}")]
    Source(#[from] io::Error),
}

/// Run one complete client session: establish, send every byte of
/// `source`, tear down.
pub async fn run<R: Read>(
    socket: &DrtpSocket,
    server: SocketAddr,
    source: R,
    window: u16,
    config: SessionConfig,
) -> Result<(), ClientError> {
    let chunks = transfer::chunk_payloads(source)?;
    log::info!(
        "[client] connecting to {server} ({} segment(s) to send)",
        chunks.len()
    );

    let session = Session::new(socket, server, config);
    let established = handshake::connect(&session, window).await?;

    let fin_seq = transfer::send_stream(
        &session,
        established.start_seq,
        established.window,
        chunks,
    )
    .await?;

    teardown::close(&session, fin_seq).await?;
    Ok(())
}
