//! Server-side session orchestrator.
//!
//! Accepts clients on one socket until a transfer completes.  A failed
//! handshake or an abandoned transfer is logged and the server goes back to
//! listening for a new SYN; after the first successful transfer it returns
//! the measured stats and exits.  Received bytes go to a fresh `io::Write`
//! sink per attempt, produced by the caller.

use std::io::{self, Write};

use thiserror::Error;

use crate::handshake::{self, HandshakeError};
use crate::session::{Session, SessionConfig};
use crate::socket::{DrtpSocket, SocketError};
use crate::transfer::{self, TransferError, TransferStats};

/// Failures that end the server loop (per-client failures do not).
#[derive(Debug, Error)]
pub enum ServerError {
    /// Underlying socket failure.
    #[error(transparent)]
    Socket(#[from] SocketError),
    /// Opening the output sink failed.
    #[error("opening sink: {0}")]
    Sink(#[from] io::Error),
}

/// Serve until one transfer completes; return its stats.
///
/// `open_sink` is called once per accepted client so each attempt writes to
/// a fresh destination.
pub async fn run<W, F>(
    socket: &DrtpSocket,
    window: u16,
    discard_seq: Option<u16>,
    config: SessionConfig,
    mut open_sink: F,
) -> Result<TransferStats, ServerError>
where
    W: Write,
    F: FnMut() -> io::Result<W>,
{
    log::info!("[server] listening on {}", socket.local_addr);

    loop {
        let established = match handshake::accept(socket, config, window).await {
            Ok(est) => est,
            Err(HandshakeError::RetryBudgetExhausted(n)) => {
                log::warn!("[server] client did not finish handshake ({n} attempts), listening again");
                continue;
            }
            Err(HandshakeError::Socket(e)) => return Err(e.into()),
        };

        let session = Session::new(socket, established.peer, config);
        let mut sink = open_sink()?;

        match transfer::receive_stream(
            &session,
            established.start_seq,
            established.window,
            discard_seq,
            &mut sink,
        )
        .await
        {
            Ok(stats) => {
                sink.flush().map_err(ServerError::Sink)?;
                if stats.bytes > 0 {
                    log::info!(
                        "[server] received {} bytes in {:.3}s, throughput {:.2} Mbps",
                        stats.bytes,
                        stats.elapsed.as_secs_f64(),
                        stats.throughput_mbps()
                    );
                }
                return Ok(stats);
            }
            Err(TransferError::PeerUnresponsive(n)) => {
                log::warn!("[server] client vanished mid-transfer ({n} quiet rounds), listening again");
                continue;
            }
            Err(TransferError::Socket(e)) => return Err(e.into()),
            Err(TransferError::Io(e)) => return Err(ServerError::Sink(e)),
            // The receive side neither chunks input nor counts segments.
            Err(TransferError::TooManySegments(_)) => unreachable!(),
        }
    }
}
