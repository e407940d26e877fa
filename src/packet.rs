//! Wire-format definitions for DRTP segments.
//!
//! Every datagram exchanged between peers is a [`Packet`].  This module is
//! responsible for:
//! - Defining the on-wire binary layout (header fields, flags, payload).
//! - Serialising a [`Packet`] into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back into a [`Packet`], returning an
//!   error for truncated input.
//! - Classifying the flag bitmask into a [`SegmentKind`] exactly once, so
//!   protocol phases match on a variant instead of re-testing bits.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All fields are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |        Sequence Number        |     Acknowledgment Number     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |             Flags             |            Window             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Payload ...                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Total header size: [`HEADER_LEN`] = 8 bytes.  The payload length is not
//! carried in the header; it is implied by the datagram length.  A DATA
//! segment carries at most [`DATA_LEN`] payload bytes.

use thiserror::Error;

/// Bit-flag constants for the `flags` header field.
pub mod flags {
    /// Reset the connection (defined on the wire, unused by protocol logic).
    pub const RST: u16 = 0b0001;
    /// Acknowledgement field is valid.
    pub const ACK: u16 = 0b0010;
    /// Synchronise sequence numbers (handshake initiation).
    pub const SYN: u16 = 0b0100;
    /// Finish — sender has no more data to send.
    pub const FIN: u16 = 0b1000;
}

/// Byte length of the fixed-size header on the wire.
pub const HEADER_LEN: usize = 8;

/// Maximum payload bytes carried by one DATA segment.
pub const DATA_LEN: usize = 992;

// Byte offsets of each field within the serialised header.
const OFF_SEQ: usize = 0;
const OFF_ACK: usize = 2;
const OFF_FLAGS: usize = 4;
const OFF_WINDOW: usize = 6;

/// Fixed-size protocol header.
///
/// Fields are in host byte order; [`Packet::encode`] converts to big-endian
/// on the wire and [`Packet::decode`] converts back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Sequence number of this segment (DATA segments are numbered 1, 2, …
    /// in transmission order).
    pub seq: u16,
    /// Acknowledgment number (highest in-order sequence number received).
    pub ack: u16,
    /// Bitmask of [`flags`] constants.
    pub flags: u16,
    /// Advertised receive-window size in packets.
    pub window: u16,
}

/// A complete DRTP datagram: header + payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Build a control segment (no payload).
    pub fn control(seq: u16, ack: u16, flags: u16, window: u16) -> Self {
        Self {
            header: Header {
                seq,
                ack,
                flags,
                window,
            },
            payload: Vec::new(),
        }
    }

    /// Build a DATA segment (no flags, payload attached).
    ///
    /// `payload` must not exceed [`DATA_LEN`] bytes; the transfer layer
    /// slices the source stream accordingly.
    pub fn data(seq: u16, window: u16, payload: Vec<u8>) -> Self {
        debug_assert!(payload.len() <= DATA_LEN);
        Self {
            header: Header {
                seq,
                ack: 0,
                flags: 0,
                window,
            },
            payload,
        }
    }

    /// Serialise this packet into a newly allocated byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_LEN + self.payload.len()];
        buf[OFF_SEQ..OFF_SEQ + 2].copy_from_slice(&self.header.seq.to_be_bytes());
        buf[OFF_ACK..OFF_ACK + 2].copy_from_slice(&self.header.ack.to_be_bytes());
        buf[OFF_FLAGS..OFF_FLAGS + 2].copy_from_slice(&self.header.flags.to_be_bytes());
        buf[OFF_WINDOW..OFF_WINDOW + 2].copy_from_slice(&self.header.window.to_be_bytes());
        buf[HEADER_LEN..].copy_from_slice(&self.payload);
        buf
    }

    /// Parse a [`Packet`] from a raw byte slice.
    ///
    /// Returns [`Err`] if `buf` is shorter than [`HEADER_LEN`].  Everything
    /// past the header is the payload.  Callers treat a decode failure as
    /// "ignore this datagram and keep waiting", never as fatal.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < HEADER_LEN {
            return Err(PacketError::BufferTooShort);
        }

        let seq = u16::from_be_bytes([buf[OFF_SEQ], buf[OFF_SEQ + 1]]);
        let ack = u16::from_be_bytes([buf[OFF_ACK], buf[OFF_ACK + 1]]);
        let flags = u16::from_be_bytes([buf[OFF_FLAGS], buf[OFF_FLAGS + 1]]);
        let window = u16::from_be_bytes([buf[OFF_WINDOW], buf[OFF_WINDOW + 1]]);

        Ok(Packet {
            header: Header {
                seq,
                ack,
                flags,
                window,
            },
            payload: buf[HEADER_LEN..].to_vec(),
        })
    }

    /// Classify this packet's flags (see [`SegmentKind`]).
    pub fn kind(&self) -> SegmentKind {
        SegmentKind::from_flags(self.header.flags)
    }
}

/// The role a segment plays in the protocol, resolved once from the flag
/// bitmask at decode time.
///
/// Phases match on this variant; flag combinations that correspond to no
/// protocol segment (e.g. SYN|FIN) classify as [`SegmentKind::Unknown`] and
/// are ignored everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Bare SYN — handshake request.
    Syn,
    /// SYN+ACK — handshake challenge.
    SynAck,
    /// Pure ACK — handshake completion or cumulative data acknowledgement.
    Ack,
    /// No flags — a DATA segment.
    Data,
    /// Bare FIN — teardown request.
    Fin,
    /// FIN+ACK — teardown acknowledgement.
    FinAck,
    /// RST — defined on the wire but unused by the protocol logic.
    Reset,
    /// Any other flag combination; always ignored.
    Unknown,
}

impl SegmentKind {
    /// Resolve a flag bitmask into its segment kind.
    pub fn from_flags(f: u16) -> Self {
        match f {
            0 => Self::Data,
            x if x == flags::SYN => Self::Syn,
            x if x == flags::SYN | flags::ACK => Self::SynAck,
            x if x == flags::ACK => Self::Ack,
            x if x == flags::FIN => Self::Fin,
            x if x == flags::FIN | flags::ACK => Self::FinAck,
            x if x & flags::RST != 0 => Self::Reset,
            _ => Self::Unknown,
        }
    }
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum PacketError {
    /// Buffer shorter than the fixed header size.
    #[error("datagram shorter than the {HEADER_LEN}-byte header")]
    BufferTooShort,
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let pkt = Packet::data(42, 3, b"hello".to_vec());
        let decoded = Packet::decode(&pkt.encode()).unwrap();
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn control_segment_has_empty_payload() {
        let pkt = Packet::control(0, 0, flags::SYN, 5);
        let bytes = pkt.encode();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(Packet::decode(&bytes).unwrap().payload, Vec::<u8>::new());
    }

    #[test]
    fn decode_empty_buffer_returns_error() {
        assert_eq!(Packet::decode(&[]), Err(PacketError::BufferTooShort));
    }

    #[test]
    fn decode_short_header_returns_error() {
        assert_eq!(
            Packet::decode(&[0u8; HEADER_LEN - 1]),
            Err(PacketError::BufferTooShort)
        );
    }

    #[test]
    fn fields_big_endian_on_wire() {
        let pkt = Packet::control(0x0102, 0x0304, 0x0506, 0x0708);
        let bytes = pkt.encode();
        assert_eq!(&bytes[..HEADER_LEN], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn payload_length_is_implicit() {
        let pkt = Packet::data(1, 3, vec![0xAB; 100]);
        let bytes = pkt.encode();
        assert_eq!(bytes.len(), HEADER_LEN + 100);
        assert_eq!(Packet::decode(&bytes).unwrap().payload.len(), 100);
    }

    #[test]
    fn kind_resolves_exact_combinations() {
        assert_eq!(SegmentKind::from_flags(0), SegmentKind::Data);
        assert_eq!(SegmentKind::from_flags(flags::SYN), SegmentKind::Syn);
        assert_eq!(
            SegmentKind::from_flags(flags::SYN | flags::ACK),
            SegmentKind::SynAck
        );
        assert_eq!(SegmentKind::from_flags(flags::ACK), SegmentKind::Ack);
        assert_eq!(SegmentKind::from_flags(flags::FIN), SegmentKind::Fin);
        assert_eq!(
            SegmentKind::from_flags(flags::FIN | flags::ACK),
            SegmentKind::FinAck
        );
        assert_eq!(SegmentKind::from_flags(flags::RST), SegmentKind::Reset);
    }

    #[test]
    fn stray_combinations_are_unknown() {
        assert_eq!(
            SegmentKind::from_flags(flags::SYN | flags::FIN),
            SegmentKind::Unknown
        );
        assert_eq!(
            SegmentKind::from_flags(flags::SYN | flags::ACK | flags::FIN),
            SegmentKind::Unknown
        );
    }

    #[test]
    fn max_payload_fits_one_datagram() {
        let pkt = Packet::data(7, 3, vec![0u8; DATA_LEN]);
        let bytes = pkt.encode();
        assert_eq!(bytes.len(), HEADER_LEN + DATA_LEN);
        let decoded = Packet::decode(&bytes).unwrap();
        assert_eq!(decoded.payload.len(), DATA_LEN);
        assert_eq!(decoded.kind(), SegmentKind::Data);
    }
}
