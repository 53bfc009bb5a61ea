//! Receiver-side reassembly and cumulative-acknowledgment logic.
//!
//! This module is pure: it has no socket, no clock, and no I/O. The
//! session orchestrator feeds it decoded segments and reads back what
//! acknowledgment (if any) to send and whether the transfer is done.

use std::collections::BTreeMap;

use bytes::{Bytes, BytesMut};

/// Result of handing one data or EOF segment to the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Emit a cumulative ACK for `next_expected`; the transfer continues.
    Ack { next_expected: u64 },
    /// The EOF marker committed the delivered buffer. Emit the ACK for
    /// `next_expected` five times (the EOF handshake) and stop.
    Done { next_expected: u64 },
}

/// Reassembles a byte stream from out-of-order, possibly-duplicated
/// data segments, and tracks the cumulative delivery point.
#[derive(Debug)]
pub struct Receiver {
    expected: u64,
    delivered: BytesMut,
    reorder: BTreeMap<u64, Bytes>,
    done: bool,
}

impl Receiver {
    pub fn new() -> Self {
        Self {
            expected: 0,
            delivered: BytesMut::new(),
            reorder: BTreeMap::new(),
            done: false,
        }
    }

    /// The next byte offset not yet contiguously delivered.
    pub fn expected(&self) -> u64 {
        self.expected
    }

    /// Whether the EOF marker has already been committed.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of out-of-order segments currently buffered.
    pub fn reorder_len(&self) -> usize {
        self.reorder.len()
    }

    /// Handle an arriving data segment with offset `offset` and payload
    /// `payload`. Always produces an `Ack`; never called once `is_done()`.
    pub fn on_data(&mut self, offset: u64, payload: Bytes) -> Outcome {
        debug_assert!(!self.done, "data segment after EOF commit");

        if offset < self.expected {
            // Duplicate: already delivered, buffers untouched.
        } else if offset == self.expected {
            self.expected += payload.len() as u64;
            self.delivered.extend_from_slice(&payload);
            self.drain_reorder();
        } else {
            self.reorder.entry(offset).or_insert(payload);
        }

        Outcome::Ack {
            next_expected: self.expected,
        }
    }

    /// Handle the EOF marker at `offset`. Flushes any contiguous prefix
    /// still buffered, commits the delivered bytes, and marks the
    /// receiver done. The caller is responsible for sending the returned
    /// `next_expected` as five separate ACK segments (the EOF handshake).
    pub fn on_eof(&mut self, _offset: u64) -> Outcome {
        self.drain_reorder();
        self.done = true;
        Outcome::Done {
            next_expected: self.expected,
        }
    }

    fn drain_reorder(&mut self) {
        while let Some(payload) = self.reorder.remove(&self.expected) {
            self.expected += payload.len() as u64;
            self.delivered.extend_from_slice(&payload);
        }
    }

    /// Consume the receiver, returning the delivered byte stream.
    pub fn into_delivered(self) -> Bytes {
        self.delivered.freeze()
    }
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_delivery_advances_expected_by_payload_len() {
        let mut r = Receiver::new();
        let outcome = r.on_data(0, Bytes::from_static(b"hello"));
        assert_eq!(outcome, Outcome::Ack { next_expected: 5 });
        assert_eq!(r.expected(), 5);
    }

    #[test]
    fn out_of_order_segment_is_buffered_not_delivered() {
        let mut r = Receiver::new();
        let outcome = r.on_data(10, Bytes::from_static(b"later"));
        assert_eq!(outcome, Outcome::Ack { next_expected: 0 });
        assert_eq!(r.reorder_len(), 1);
    }

    #[test]
    fn gap_fill_drains_contiguous_prefix_in_one_shot() {
        let mut r = Receiver::new();
        r.on_data(5, Bytes::from_static(b"BBBBB")); // buffered
        r.on_data(10, Bytes::from_static(b"CCCCC")); // buffered
        let outcome = r.on_data(0, Bytes::from_static(b"AAAAA")); // fills the gap
        assert_eq!(outcome, Outcome::Ack { next_expected: 15 });
        assert_eq!(r.reorder_len(), 0);
        assert_eq!(&r.into_delivered()[..], b"AAAAABBBBBCCCCC");
    }

    #[test]
    fn duplicate_below_expected_does_not_mutate_delivered() {
        let mut r = Receiver::new();
        r.on_data(0, Bytes::from_static(b"AAAAA"));
        let outcome = r.on_data(0, Bytes::from_static(b"AAAAA"));
        assert_eq!(outcome, Outcome::Ack { next_expected: 5 });
        assert_eq!(&r.into_delivered()[..], b"AAAAA");
    }

    #[test]
    fn duplicate_already_buffered_out_of_order_segment_is_discarded() {
        let mut r = Receiver::new();
        r.on_data(5, Bytes::from_static(b"first"));
        r.on_data(5, Bytes::from_static(b"second"));
        assert_eq!(r.reorder_len(), 1);
    }

    #[test]
    fn eof_flushes_remaining_contiguous_prefix_and_commits() {
        let mut r = Receiver::new();
        r.on_data(0, Bytes::from_static(b"AAAAA"));
        let outcome = r.on_eof(5);
        assert_eq!(outcome, Outcome::Done { next_expected: 5 });
        assert!(r.is_done());
        assert_eq!(&r.into_delivered()[..], b"AAAAA");
    }

    #[test]
    fn empty_file_eof_yields_empty_output() {
        let mut r = Receiver::new();
        let outcome = r.on_eof(0);
        assert_eq!(outcome, Outcome::Done { next_expected: 0 });
        assert_eq!(&r.into_delivered()[..], b"");
    }

    #[test]
    fn final_short_chunk_advances_by_its_own_length() {
        let mut r = Receiver::new();
        r.on_data(0, Bytes::from(vec![0u8; 1180]));
        let outcome = r.on_data(1180, Bytes::from(vec![0u8; 37]));
        assert_eq!(outcome, Outcome::Ack { next_expected: 1217 });
    }
}
