//! Sliding-window send/retransmit engine.
//!
//! Like [`crate::receiver::Receiver`], this type is pure: it owns the
//! in-flight table and the `base`/`next_seq` bookkeeping but has no socket
//! and no clock of its own beyond the `Instant` values callers pass in. The
//! session orchestrator drives it once per tick and performs the actual
//! datagram I/O with whatever segments come back out.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::wire::{self, DATA_SIZE};

/// One in-flight (transmitted, not yet cumulatively acknowledged) segment.
#[derive(Debug, Clone)]
struct InFlight {
    segment: Bytes,
    sent_at: Instant,
    /// True until the segment is retransmitted at least once (Karn's rule).
    first_send: bool,
}

/// Outcome of handing the engine an inbound ACK.
#[derive(Debug)]
pub enum AckEvent {
    /// `ack` exceeded `base`: new bytes were cumulatively acknowledged.
    NewAck {
        acked_bytes: usize,
        new_base: u64,
        /// `Some` only when the covered segment at the old `base` was still
        /// on its first transmission (Karn's rule).
        rtt_sample: Option<Duration>,
    },
    /// `ack == base`: a duplicate ACK. `retransmit` carries the segment to
    /// resend exactly when `count == 3` (the fast-retransmit threshold).
    DuplicateAck { count: u32, retransmit: Option<Bytes> },
    /// `ack < base`: a stale ACK, already covered. No state changed.
    Stale,
}

/// The sender's sliding-window engine: `base`, `next_seq`, the in-flight
/// table, and the source bytes being streamed.
#[derive(Debug)]
pub struct SenderEngine {
    data: Bytes,
    total: u64,
    base: u64,
    next_seq: u64,
    dup_ack_count: u32,
    in_flight: BTreeMap<u64, InFlight>,
}

impl SenderEngine {
    pub fn new(data: Bytes) -> Self {
        let total = data.len() as u64;
        Self {
            data,
            total,
            base: 0,
            next_seq: 0,
            dup_ack_count: 0,
            in_flight: BTreeMap::new(),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Number of in-flight segments (bounded by `effective_window / MSS`).
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// True once every byte has been cumulatively acknowledged.
    pub fn is_complete(&self) -> bool {
        self.base >= self.total
    }

    /// Fill step: while `next_seq < total` and the window has room, chunk
    /// and transmit segments in strictly increasing offset order. Returns
    /// the wire-encoded segments to send, in send order.
    pub fn fill(&mut self, effective_window: usize, now: Instant) -> Vec<Bytes> {
        let mut out = Vec::new();
        while self.next_seq < self.total
            && (self.next_seq - self.base) < effective_window as u64
        {
            let offset = self.next_seq;
            let end = (offset + DATA_SIZE as u64).min(self.total);
            let chunk = self.data.slice(offset as usize..end as usize);
            let segment = wire::encode_data(offset as u32, &chunk)
                .expect("chunk is bounded by DATA_SIZE");
            self.in_flight.insert(
                offset,
                InFlight {
                    segment: segment.clone(),
                    sent_at: now,
                    first_send: true,
                },
            );
            self.next_seq = end;
            out.push(segment);
        }
        out
    }

    /// Receive step: process one decoded ACK offset.
    pub fn on_ack(&mut self, ack: u64, now: Instant) -> AckEvent {
        if ack > self.base {
            let old_base = self.base;
            let rtt_sample = self
                .in_flight
                .get(&old_base)
                .filter(|entry| entry.first_send)
                .map(|entry| now.duration_since(entry.sent_at));
            self.in_flight.retain(|&offset, _| offset >= ack);
            self.base = ack;
            self.dup_ack_count = 0;
            AckEvent::NewAck {
                acked_bytes: (ack - old_base) as usize,
                new_base: ack,
                rtt_sample,
            }
        } else if ack == self.base {
            self.dup_ack_count += 1;
            let retransmit = if self.dup_ack_count == 3 {
                self.in_flight.get_mut(&self.base).map(|entry| {
                    entry.sent_at = now;
                    entry.first_send = false;
                    entry.segment.clone()
                })
            } else {
                None
            };
            AckEvent::DuplicateAck {
                count: self.dup_ack_count,
                retransmit,
            }
        } else {
            AckEvent::Stale
        }
    }

    /// Timeout sweep: if the earliest in-flight segment has outlived `rto`,
    /// retransmit it (refreshing its timestamp) and return it. At most one
    /// retransmission per call.
    pub fn check_timeout(&mut self, rto: Duration, now: Instant) -> Option<(u64, Bytes)> {
        let earliest = *self.in_flight.keys().next()?;
        let entry = self.in_flight.get_mut(&earliest)?;
        if now.duration_since(entry.sent_at) > rto {
            entry.sent_at = now;
            entry.first_send = false;
            Some((earliest, entry.segment.clone()))
        } else {
            None
        }
    }
}
