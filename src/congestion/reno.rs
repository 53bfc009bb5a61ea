//! TCP-NewReno-style congestion control: slow start, congestion
//! avoidance, and fast recovery, per RFC 5681/6582.

use std::time::Duration;

use super::{CongestionController, MSS};

const INITIAL_SSTHRESH_MSS: usize = 128;

/// NewReno window state.
#[derive(Debug, Clone)]
pub struct Reno {
    cwnd: usize,
    ssthresh: usize,
    slow_start: bool,
    in_fast_recovery: bool,
    /// `next_seq` captured when fast recovery was entered; recovery ends
    /// once a cumulative ACK covers this offset.
    recover: u64,
}

impl Reno {
    pub fn new() -> Self {
        Self {
            cwnd: MSS,
            ssthresh: INITIAL_SSTHRESH_MSS * MSS,
            slow_start: true,
            in_fast_recovery: false,
            recover: 0,
        }
    }

    pub fn cwnd(&self) -> usize {
        self.cwnd
    }

    pub fn ssthresh(&self) -> usize {
        self.ssthresh
    }

    pub fn is_slow_start(&self) -> bool {
        self.slow_start
    }

    pub fn is_in_fast_recovery(&self) -> bool {
        self.in_fast_recovery
    }
}

impl Default for Reno {
    fn default() -> Self {
        Self::new()
    }
}

impl CongestionController for Reno {
    fn on_new_ack(
        &mut self,
        _acked_bytes: usize,
        ack_offset: u64,
        _next_seq: u64,
        _rtt_sample: Option<Duration>,
    ) {
        if self.in_fast_recovery && ack_offset >= self.recover {
            self.in_fast_recovery = false;
            self.cwnd = self.ssthresh;
        }

        if self.slow_start {
            self.cwnd += MSS;
            if self.cwnd >= self.ssthresh {
                self.slow_start = false;
            }
        } else {
            self.cwnd += (MSS * MSS) / self.cwnd.max(1);
        }
    }

    fn on_duplicate_ack(&mut self, count: u32) {
        if count > 3 && self.in_fast_recovery {
            self.cwnd += MSS;
        }
    }

    fn on_timeout(&mut self) {
        self.ssthresh = (self.cwnd / 2).max(2 * MSS);
        self.cwnd = MSS;
        self.slow_start = true;
        self.in_fast_recovery = false;
    }

    fn on_fast_retransmit(&mut self, next_seq: u64) {
        self.ssthresh = (self.cwnd / 2).max(2 * MSS);
        self.cwnd = self.ssthresh + 3 * MSS;
        self.slow_start = false;
        self.in_fast_recovery = true;
        self.recover = next_seq;
    }

    fn effective_window(&self) -> usize {
        self.cwnd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_window_is_one_mss() {
        let reno = Reno::new();
        assert_eq!(reno.effective_window(), MSS);
        assert!(reno.is_slow_start());
    }

    #[test]
    fn slow_start_doubles_roughly_every_round() {
        let mut reno = Reno::new();
        for _ in 0..4 {
            reno.on_new_ack(MSS, MSS as u64, 0, None);
        }
        assert_eq!(reno.cwnd(), 5 * MSS);
        assert!(reno.is_slow_start());
    }

    #[test]
    fn crosses_into_congestion_avoidance_at_ssthresh() {
        let mut reno = Reno::new();
        reno.ssthresh = 3 * MSS;
        reno.on_new_ack(MSS, 0, 0, None);
        reno.on_new_ack(MSS, 0, 0, None);
        assert!(reno.is_slow_start());
        reno.on_new_ack(MSS, 0, 0, None);
        assert!(!reno.is_slow_start());
        assert_eq!(reno.cwnd(), 4 * MSS);
    }

    #[test]
    fn fast_retransmit_halves_and_inflates() {
        let mut reno = Reno::new();
        reno.cwnd = 32 * MSS;
        reno.on_fast_retransmit(1000);
        assert_eq!(reno.ssthresh(), 16 * MSS);
        assert_eq!(reno.cwnd(), 19 * MSS);
        assert!(reno.is_in_fast_recovery());
    }

    #[test]
    fn duplicate_acks_past_three_inflate_window_in_recovery() {
        let mut reno = Reno::new();
        reno.cwnd = 32 * MSS;
        reno.on_fast_retransmit(1000);
        let inflated = reno.cwnd();
        reno.on_duplicate_ack(4);
        assert_eq!(reno.cwnd(), inflated + MSS);
    }

    #[test]
    fn exits_fast_recovery_when_ack_reaches_recover() {
        let mut reno = Reno::new();
        reno.cwnd = 32 * MSS;
        reno.on_fast_retransmit(5000);
        let ssthresh = reno.ssthresh();
        reno.on_new_ack(MSS, 4000, 0, None);
        assert!(reno.is_in_fast_recovery(), "recovery should still hold below recover");
        reno.on_new_ack(MSS, 5000, 0, None);
        assert!(!reno.is_in_fast_recovery());
        assert_eq!(reno.cwnd(), ssthresh);
    }

    #[test]
    fn timeout_resets_to_slow_start() {
        let mut reno = Reno::new();
        reno.cwnd = 32 * MSS;
        reno.on_timeout();
        assert_eq!(reno.cwnd(), MSS);
        assert_eq!(reno.ssthresh(), 16 * MSS);
        assert!(reno.is_slow_start());
        assert!(!reno.is_in_fast_recovery());
    }
}
