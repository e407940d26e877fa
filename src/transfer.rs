//! Go-Back-N data-transfer loops.
//!
//! [`send_stream`] and [`receive_stream`] drive the pure state machines in
//! [`crate::sender`] and [`crate::receiver`] over a [`crate::session::Session`].
//! The sender pipelines up to the agreed window of DATA segments and falls
//! back to retransmitting the entire outstanding window on timeout; the
//! receiver accepts only the exactly-in-order segment, answers it with a
//! cumulative ACK, and ends the phase when FIN arrives.
//!
//! The byte stream enters as fixed-size chunks ([`chunk_payloads`]) and
//! leaves through any `io::Write` sink — file handling stays outside the
//! protocol core.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::packet::{flags, Packet, SegmentKind, DATA_LEN, HEADER_LEN};
use crate::receiver::{Accept, RecvWindow};
use crate::sender::SendWindow;
use crate::session::Session;
use crate::socket::SocketError;
use crate::teardown;

/// Transfer failure reasons.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The input would need more DATA sequence numbers than remain in the
    /// 16-bit space; nothing was sent.
    #[error("input needs {0} segments, more than the sequence space allows")]
    TooManySegments(usize),
    /// No window progress for the whole retry budget; the peer is gone.
    #[error("peer unresponsive: no progress after {0} timeout rounds")]
    PeerUnresponsive(u32),
    /// Reading from the source or writing to the sink failed.
    #[error("byte sink/source error: {0}")]
    Io(#[from] io::Error),
    /// Underlying socket failure.
    #[error(transparent)]
    Socket(#[from] SocketError),
}

/// What the receiving side measured for one completed transfer.
#[derive(Debug, Clone, Copy)]
pub struct TransferStats {
    /// Wire bytes (header + payload) of every accepted DATA segment.
    pub bytes: u64,
    /// Time from entering the receive loop to the FIN.
    pub elapsed: Duration,
}

impl TransferStats {
    /// Throughput in megabits per second.
    pub fn throughput_mbps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        (self.bytes * 8) as f64 / (1e6 * secs)
    }
}

/// Slice a byte source into DATA-sized chunks (last one may be shorter).
pub fn chunk_payloads<R: Read>(mut source: R) -> io::Result<Vec<Vec<u8>>> {
    let mut all = Vec::new();
    source.read_to_end(&mut all)?;
    Ok(all.chunks(DATA_LEN).map(<[u8]>::to_vec).collect())
}

/// Sender half: deliver `chunks` in order over the session.
///
/// Returns the first sequence number never assigned — the caller uses it as
/// the FIN sequence number.
///
/// The loop alternates window fill (send new DATA while `next` is inside
/// the window and chunks remain) with a single timed wait.  A timeout
/// retransmits every outstanding segment; a cumulative ACK for an
/// outstanding sequence number slides the window and resets the
/// no-progress counter; everything else is ignored.
pub async fn send_stream(
    session: &Session<'_>,
    start_seq: u16,
    window: u16,
    chunks: Vec<Vec<u8>>,
) -> Result<u16, TransferError> {
    let space = (u16::MAX - start_seq) as usize;
    if chunks.len() > space {
        return Err(TransferError::TooManySegments(chunks.len()));
    }
    let total = chunks.len();
    let mut wnd = SendWindow::new(start_seq, window);
    let mut stalled = 0u32;

    while ((wnd.base() - start_seq) as usize) < total {
        // Window fill.
        while wnd.can_send() && ((wnd.next() - start_seq) as usize) < total {
            let seq = wnd.next();
            let payload = chunks[(seq - start_seq) as usize].clone();
            let len = payload.len();
            let bytes = Packet::data(seq, window, payload).encode();
            session.socket().send_raw(&bytes, session.peer).await?;
            wnd.record_sent(bytes);
            log::debug!(
                "[transfer] → DATA seq={seq} len={len} sliding window = {}",
                wnd.window_set()
            );
        }

        // Await one reply (or the retransmission timeout).
        match session.recv().await? {
            None => {
                stalled += 1;
                if stalled >= session.config.max_retries {
                    return Err(TransferError::PeerUnresponsive(stalled));
                }
                log::debug!("[transfer] RTO, retransmitting {}", wnd.window_set());
                for (seq, bytes) in wnd.outstanding() {
                    session.socket().send_raw(bytes, session.peer).await?;
                    log::debug!("[transfer] ↻ DATA seq={seq} resent");
                }
            }
            Some(pkt) => {
                if pkt.kind() != SegmentKind::Ack {
                    continue;
                }
                let acked = wnd.on_ack(pkt.header.ack);
                if acked > 0 {
                    stalled = 0;
                    log::debug!(
                        "[transfer] ← ACK {} (slid {acked}), sliding window = {}",
                        pkt.header.ack,
                        wnd.window_set()
                    );
                }
                // Stale or duplicate ACK: ignore.
            }
        }
    }

    log::info!("[transfer] all {total} segments acknowledged");
    Ok(wnd.next())
}

/// Receiver half: accept in-order DATA into `sink` until FIN.
///
/// `discard_seq` is a one-shot test hook: the first segment carrying that
/// sequence number is dropped as if lost in transit, then the hook disarms.
/// Wrong-address datagrams never reach this loop (the session filters
/// them); out-of-order DATA is dropped without an ACK.  On FIN the
/// responder teardown runs and the measured stats are returned.
pub async fn receive_stream<W: Write>(
    session: &Session<'_>,
    start_seq: u16,
    window: u16,
    discard_seq: Option<u16>,
    sink: &mut W,
) -> Result<TransferStats, TransferError> {
    let mut wnd = RecvWindow::new(start_seq);
    let mut discard = discard_seq;
    let mut bytes = 0u64;
    let mut quiet = 0u32;
    let started = Instant::now();

    loop {
        let pkt = match session.recv().await? {
            Some(pkt) => {
                quiet = 0;
                pkt
            }
            None => {
                quiet += 1;
                if quiet >= session.config.max_retries {
                    return Err(TransferError::PeerUnresponsive(quiet));
                }
                continue;
            }
        };

        // One-shot simulated loss, armed for at most one segment per session.
        if discard == Some(pkt.header.seq) {
            discard = None;
            log::debug!("[transfer] discarding seq={} (simulated loss)", pkt.header.seq);
            continue;
        }

        match pkt.kind() {
            SegmentKind::Fin => {
                log::debug!("[transfer] ← FIN seq={}", pkt.header.seq);
                teardown::respond(session, pkt.header.seq, window).await?;
                return Ok(TransferStats {
                    bytes,
                    elapsed: started.elapsed(),
                });
            }
            SegmentKind::Data => match wnd.on_segment(pkt.header.seq) {
                Accept::InOrder => {
                    sink.write_all(&pkt.payload)?;
                    bytes += (HEADER_LEN + pkt.payload.len()) as u64;
                    let ack = Packet::control(0, wnd.ack_number(), flags::ACK, window);
                    session.send(&ack).await?;
                    log::debug!(
                        "[transfer] ← DATA seq={} len={}, → ACK {}",
                        pkt.header.seq,
                        pkt.payload.len(),
                        wnd.ack_number()
                    );
                }
                Accept::OutOfOrder => {
                    log::debug!(
                        "[transfer] out-of-order seq={} (expected {}), dropped",
                        pkt.header.seq,
                        wnd.expected()
                    );
                }
            },
            // Handshake stragglers (e.g. a retransmitted SYN-ACK answered by
            // a lost ACK) and unknown segments are not data.
            _ => continue,
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn chunking_splits_at_data_len() {
        let data = vec![7u8; DATA_LEN * 2 + 10];
        let chunks = chunk_payloads(Cursor::new(data)).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), DATA_LEN);
        assert_eq!(chunks[1].len(), DATA_LEN);
        assert_eq!(chunks[2].len(), 10);
    }

    #[test]
    fn chunking_empty_source_yields_no_chunks() {
        let chunks = chunk_payloads(Cursor::new(Vec::new())).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn chunking_exactly_one_chunk() {
        let chunks = chunk_payloads(Cursor::new(vec![1u8; DATA_LEN])).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), DATA_LEN);
    }

    #[test]
    fn throughput_accounts_wire_bytes() {
        let stats = TransferStats {
            bytes: 1_000_000,
            elapsed: Duration::from_secs(1),
        };
        assert!((stats.throughput_mbps() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn throughput_zero_elapsed_is_zero() {
        let stats = TransferStats {
            bytes: 100,
            elapsed: Duration::ZERO,
        };
        assert_eq!(stats.throughput_mbps(), 0.0);
    }
}
