//! Fixed-window congestion control: the non-adaptive baseline used to
//! study impairments in isolation, with no reaction to any event.

use std::time::Duration;

use super::CongestionController;

/// A constant send window, set once at session start.
#[derive(Debug, Clone, Copy)]
pub struct Fixed {
    sws: usize,
}

impl Fixed {
    /// Create a controller with the given sender window size, in bytes.
    pub fn new(sws: usize) -> Self {
        Self { sws }
    }
}

impl CongestionController for Fixed {
    fn on_new_ack(
        &mut self,
        _acked_bytes: usize,
        _ack_offset: u64,
        _next_seq: u64,
        _rtt_sample: Option<Duration>,
    ) {
    }

    fn on_duplicate_ack(&mut self, _count: u32) {}

    fn on_timeout(&mut self) {}

    fn on_fast_retransmit(&mut self, _next_seq: u64) {}

    fn effective_window(&self) -> usize {
        self.sws
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_never_moves() {
        let mut fixed = Fixed::new(4096);
        assert_eq!(fixed.effective_window(), 4096);
        fixed.on_new_ack(1180, 1180, 2360, Some(Duration::from_millis(10)));
        fixed.on_timeout();
        fixed.on_fast_retransmit(1180);
        fixed.on_duplicate_ack(3);
        assert_eq!(fixed.effective_window(), 4096);
    }
}
