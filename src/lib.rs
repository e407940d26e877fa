//! `drtp` — reliable file transfer over UDP with a Go-Back-N sliding window.
//!
//! DRTP layers connection establishment, reliable in-order delivery, and
//! connection teardown on top of plain UDP datagrams.  Everything rides on
//! an 8-byte header (sequence, acknowledgment, flags, window) and survives
//! loss, duplication, and reordering through retransmission timers and
//! cumulative ACKs.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐  DATA (windowed)   ┌──────────┐
//!  │  client  │───────────────────▶│  server  │
//!  └────┬─────┘                    └─────┬────┘
//!       │       cumulative ACKs         │
//!       │◀───────────────────────────────┘
//!       │
//!  ┌────▼──────────────────────────────┐
//!  │            Session                │
//!  │ (socket + peer + timeout/retries) │
//!  └────┬──────────────────────────────┘
//!       │ raw UDP datagrams
//!  ┌────▼───────┐
//!  │ DrtpSocket │  (thin wrapper around tokio UdpSocket)
//!  └────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]    — wire format (serialise / deserialise / classify)
//! - [`socket`]    — packet-oriented UDP socket
//! - [`session`]   — explicit session context + bounded-retry primitive
//! - [`handshake`] — three-way handshake (initiator / responder)
//! - [`sender`]    — Go-Back-N outbound window state machine
//! - [`receiver`]  — in-order inbound state machine
//! - [`transfer`]  — the data-phase I/O loops and chunking
//! - [`teardown`]  — FIN / FIN-ACK exchange
//! - [`client`]    — initiator-side session orchestrator
//! - [`server`]    — responder-side session orchestrator

pub mod client;
pub mod handshake;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod server;
pub mod session;
pub mod socket;
pub mod teardown;
pub mod transfer;
