//! Pluggable congestion control.
//!
//! Defines the `CongestionController` trait shared by all four window
//! strategies and re-exports each concrete implementation. The sender's
//! event loop owns exactly one boxed controller, chosen once at session
//! start, and never inspects its internals directly.

use std::time::Duration;

pub mod bbr;
pub mod cubic;
pub mod fixed;
pub mod reno;

pub use bbr::Bbr;
pub use cubic::Cubic;
pub use fixed::Fixed;
pub use reno::Reno;

/// The maximum segment size in bytes, shared by every controller.
pub const MSS: usize = crate::wire::DATA_SIZE;

/// Trait for pluggable congestion-window strategies.
///
/// All four events carry exactly the information the sender loop has on
/// hand; controllers never reach back into the sender's own state.
pub trait CongestionController: Send {
    /// A new cumulative ACK advanced `base` to `ack_offset`, covering
    /// `acked_bytes` newly-acknowledged bytes, with the sender's current
    /// send pointer at `next_seq`. `rtt_sample` is `Some` only when the
    /// acknowledged segment was a first send (Karn's rule); most
    /// controllers ignore it, but BBR's delivery-rate and min-RTT filters
    /// consume it. `ack_offset` lets Reno-family controllers detect
    /// leaving fast recovery (`ack_offset >= recover`); `next_seq` lets
    /// BBR detect round completion, both without reaching into the
    /// sender's own state.
    fn on_new_ack(
        &mut self,
        acked_bytes: usize,
        ack_offset: u64,
        next_seq: u64,
        rtt_sample: Option<Duration>,
    );

    /// `count` consecutive duplicate ACKs have now been seen for the
    /// current `base`. Called on every duplicate, including the third
    /// (which also triggers `on_fast_retransmit`) and beyond.
    fn on_duplicate_ack(&mut self, count: u32);

    /// The retransmission timer fired for the earliest in-flight segment.
    fn on_timeout(&mut self);

    /// Exactly the third duplicate ACK was observed; the sender is about
    /// to retransmit the segment at `base`. `next_seq` is the sender's
    /// current send pointer, captured as the `recover` marker.
    fn on_fast_retransmit(&mut self, next_seq: u64);

    /// The current effective send window, in bytes.
    fn effective_window(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_controller<C: CongestionController>(_: &C) {}

    #[test]
    fn all_profiles_implement_the_trait() {
        assert_controller(&Fixed::new(4096));
        assert_controller(&Reno::new());
        assert_controller(&Cubic::new());
        assert_controller(&Bbr::new());
    }
}
