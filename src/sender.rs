//! Go-Back-N send-side state machine.
//!
//! [`SendWindow`] maintains a sliding window of up to `window` in-flight
//! DATA segments, each identified by a 16-bit sequence number assigned per
//! packet (not per byte).
//!
//! # Protocol contract
//!
//! - At most `window` segments may be outstanding (sent but unacked) at once.
//! - ACKs are **cumulative**: an ACK for sequence number `K` means the
//!   receiver has accepted every segment up to and including `K`.
//! - On timeout, the caller retransmits **all** outstanding segments from
//!   `base` onwards (go back N), not just the oldest.
//! - Sequence numbers do not wrap within a session; the transfer layer
//!   bounds the chunk count to the remaining sequence space up front.
//!
//! This module only manages state; all socket I/O lives in
//! [`crate::transfer`].

use std::collections::BTreeMap;

/// Go-Back-N send-side state for one session.
///
/// # Sequence-number layout
///
/// ```text
///     base              next
///      │                  │
///  ────┼──────────────────┼──────────────────▶ seq space
///      │ ◀─ outstanding ─▶│ ◀── unsent ─────▶
/// ```
#[derive(Debug)]
pub struct SendWindow {
    /// Sequence number of the **oldest** unacked segment (left window edge).
    base: u16,
    /// Sequence number to assign to the **next** new segment.
    next: u16,
    /// Maximum number of segments in flight simultaneously (N).
    window: u16,
    /// Outstanding segments: sequence number → encoded datagram bytes,
    /// kept ready for retransmission.
    outstanding: BTreeMap<u16, Vec<u8>>,
}

impl SendWindow {
    /// Create a new [`SendWindow`].
    ///
    /// `start_seq` is the first DATA sequence number (1 after the
    /// handshake).  `window` is the agreed window size (≥ 1).
    pub fn new(start_seq: u16, window: u16) -> Self {
        assert!(window >= 1, "window must be at least 1");
        Self {
            base: start_seq,
            next: start_seq,
            window,
            outstanding: BTreeMap::new(),
        }
    }

    /// Left edge of the window (oldest unacked sequence number).
    pub fn base(&self) -> u16 {
        self.base
    }

    /// Next sequence number to assign.
    pub fn next(&self) -> u16 {
        self.next
    }

    /// `true` when there is room for at least one more in-flight segment
    /// (`next < base + window`).
    pub fn can_send(&self) -> bool {
        // u32 arithmetic: base + window may exceed u16::MAX near the top of
        // the sequence space.
        (self.next as u32) < self.base as u32 + self.window as u32
    }

    /// `true` when at least one segment is awaiting acknowledgement.
    pub fn has_outstanding(&self) -> bool {
        !self.outstanding.is_empty()
    }

    /// Record a just-transmitted segment and advance `next`.
    ///
    /// `bytes` is the encoded datagram, stored for retransmission.  Check
    /// [`can_send`](Self::can_send) first.
    pub fn record_sent(&mut self, bytes: Vec<u8>) {
        debug_assert!(self.can_send(), "record_sent on a full window");
        self.outstanding.insert(self.next, bytes);
        self.next += 1;
    }

    /// Process an acknowledgement number.
    ///
    /// A cumulative ACK for an outstanding sequence number advances `base`
    /// past every outstanding segment ≤ `ack`, evicting each; returns how
    /// many were evicted.  An ACK that is not currently outstanding
    /// (stale or duplicate) returns `0` and changes nothing.
    pub fn on_ack(&mut self, ack: u16) -> usize {
        if !self.outstanding.contains_key(&ack) {
            return 0;
        }
        let mut acked = 0usize;
        while self.base <= ack {
            self.outstanding.remove(&self.base);
            self.base += 1;
            acked += 1;
        }
        acked
    }

    /// Iterate over the outstanding segments, oldest first.
    ///
    /// Used by the transfer loop to retransmit the whole window on timeout
    /// (the defining Go-Back-N step).
    pub fn outstanding(&self) -> impl Iterator<Item = (u16, &[u8])> {
        self.outstanding.iter().map(|(&seq, bytes)| (seq, bytes.as_slice()))
    }

    /// The outstanding sequence numbers, formatted `{1, 2, 3}` for logging.
    pub fn window_set(&self) -> String {
        let seqs: Vec<String> = self.outstanding.keys().map(u16::to_string).collect();
        format!("{{{}}}", seqs.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(w: &mut SendWindow, n: usize) {
        for i in 0..n {
            w.record_sent(vec![i as u8]);
        }
    }

    #[test]
    fn initial_state() {
        let w = SendWindow::new(1, 3);
        assert_eq!(w.base(), 1);
        assert_eq!(w.next(), 1);
        assert!(w.can_send());
        assert!(!w.has_outstanding());
    }

    #[test]
    fn record_sent_advances_next() {
        let mut w = SendWindow::new(1, 3);
        w.record_sent(vec![0xAA]);
        assert_eq!(w.next(), 2);
        assert_eq!(w.base(), 1); // not acked yet
        assert!(w.has_outstanding());
    }

    #[test]
    fn window_full_blocks_send() {
        let mut w = SendWindow::new(1, 3);
        fill(&mut w, 3);
        assert!(!w.can_send());
    }

    #[test]
    fn ack_slides_window_by_one() {
        let mut w = SendWindow::new(1, 3);
        fill(&mut w, 1);
        assert_eq!(w.on_ack(1), 1);
        assert_eq!(w.base(), 2);
        assert!(!w.has_outstanding());
    }

    #[test]
    fn cumulative_ack_evicts_everything_up_to_ack() {
        let mut w = SendWindow::new(1, 5);
        fill(&mut w, 4); // seqs 1..=4 outstanding

        assert_eq!(w.on_ack(3), 3);
        assert_eq!(w.base(), 4);

        // Seq 4 must survive the cumulative advance.
        let remaining: Vec<u16> = w.outstanding().map(|(s, _)| s).collect();
        assert_eq!(remaining, vec![4]);
    }

    #[test]
    fn stale_ack_is_ignored() {
        let mut w = SendWindow::new(1, 3);
        fill(&mut w, 2);
        assert_eq!(w.on_ack(1), 1);

        // Same ACK again: no longer outstanding, must change nothing.
        assert_eq!(w.on_ack(1), 0);
        assert_eq!(w.base(), 2);
    }

    #[test]
    fn ack_beyond_next_is_ignored() {
        let mut w = SendWindow::new(1, 3);
        fill(&mut w, 2);
        assert_eq!(w.on_ack(50), 0);
        assert_eq!(w.base(), 1);
    }

    #[test]
    fn ack_reopens_window() {
        let mut w = SendWindow::new(1, 2);
        fill(&mut w, 2);
        assert!(!w.can_send());

        w.on_ack(1);
        assert!(w.can_send());
    }

    #[test]
    fn outstanding_iterates_oldest_first() {
        let mut w = SendWindow::new(1, 4);
        fill(&mut w, 3);
        let seqs: Vec<u16> = w.outstanding().map(|(s, _)| s).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn window_set_formats_like_a_set() {
        let mut w = SendWindow::new(1, 4);
        fill(&mut w, 3);
        assert_eq!(w.window_set(), "{1, 2, 3}");
        w.on_ack(2);
        assert_eq!(w.window_set(), "{3}");
    }

    #[test]
    fn retransmit_bytes_are_the_original_encoding() {
        let mut w = SendWindow::new(1, 2);
        w.record_sent(vec![1, 2, 3]);
        w.record_sent(vec![4, 5]);
        let bytes: Vec<&[u8]> = w.outstanding().map(|(_, b)| b).collect();
        assert_eq!(bytes, vec![&[1u8, 2, 3][..], &[4u8, 5][..]]);
    }
}
