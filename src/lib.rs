//! A reliable, in-order, congestion-controlled byte-stream transfer of a
//! single file from one sender to one receiver over plain UDP.
//!
//! The crate is organized leaf-first, mirroring the dependency order of the
//! protocol itself:
//!
//! - [`wire`] -- the fixed 20-octet segment header and its three shapes
//!   (data, ack, EOF) plus the single-octet request datagram.
//! - [`rtt`] -- the Jacobson/Karels RTT/RTO estimator shared by every
//!   congestion profile.
//! - [`receiver`] -- pure reassembly and cumulative-ACK logic, with no
//!   socket or clock of its own.
//! - [`sender`] -- the pure sliding-window send/retransmit engine: the
//!   in-flight table, `base`/`next_seq`, and duplicate-ACK bookkeeping.
//! - [`congestion`] -- the pluggable window-control strategies (fixed,
//!   Reno, CUBIC, BBR-style) the sender consults every tick.
//! - [`session`] -- the async orchestrator that binds a socket and drives
//!   the sender or receiver engine to completion.

pub mod congestion;
pub mod error;
pub mod receiver;
pub mod rtt;
pub mod sender;
pub mod session;
pub mod wire;

pub use error::{Result, TideError};
