//! BBR-style congestion control: a four-mode state machine driven by
//! filtered bandwidth and RTT estimates rather than loss signals.
//!
//! Gains are fixed-point with `UNIT = 256`, matching the reference's
//! 8-bit scale factor so the cycle and thresholds are exact integers
//! rather than floating-point approximations of `2/ln(2)` and friends.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::{CongestionController, MSS};

const UNIT: i64 = 256;
const HIGH_GAIN: i64 = 739; // 256 * 2.89, rounded down like the reference.
const DRAIN_GAIN: i64 = 88; // 256 * 1000 / 2885.
const CWND_GAIN_PROBE_BW: i64 = 2 * UNIT;
const PROBE_RTT_DURATION: Duration = Duration::from_millis(200);
const MIN_RTT_WINDOW: Duration = Duration::from_secs(10);
const BW_WINDOW_ROUNDS: usize = 10;
const FULL_BW_THRESH: i64 = 320; // 256 * 1.25.
const FULL_BW_COUNT: u32 = 3;
const MIN_CWND_SEGMENTS: usize = 4;

const PACING_GAIN_CYCLE: [i64; 8] = [320, 192, UNIT, UNIT, UNIT, UNIT, UNIT, UNIT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Startup,
    Drain,
    ProbeBw,
    ProbeRtt,
}

/// BBR-style window state.
#[derive(Debug, Clone)]
pub struct Bbr {
    mode: Mode,

    min_rtt: Option<Duration>,
    min_rtt_stamp: Instant,

    bw_samples: VecDeque<f64>,
    max_bw: f64,

    round_count: u64,
    round_start: bool,
    next_round_delivered: u64,

    cwnd_gain: i64,

    full_bw: f64,
    full_bw_count: u32,
    full_bw_reached: bool,

    cycle_index: usize,
    cycle_stamp: Instant,

    probe_rtt_done_stamp: Option<Instant>,

    sample_start_time: Instant,
    sample_start_delivered: u64,

    cwnd: usize,
}

impl Bbr {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            mode: Mode::Startup,
            min_rtt: None,
            min_rtt_stamp: now,
            bw_samples: VecDeque::with_capacity(BW_WINDOW_ROUNDS),
            max_bw: 0.0,
            round_count: 0,
            round_start: false,
            next_round_delivered: 0,
            cwnd_gain: HIGH_GAIN,
            full_bw: 0.0,
            full_bw_count: 0,
            full_bw_reached: false,
            cycle_index: 0,
            cycle_stamp: now,
            probe_rtt_done_stamp: None,
            sample_start_time: now,
            sample_start_delivered: 0,
            cwnd: MIN_CWND_SEGMENTS * MSS,
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self.mode {
            Mode::Startup => "STARTUP",
            Mode::Drain => "DRAIN",
            Mode::ProbeBw => "PROBE_BW",
            Mode::ProbeRtt => "PROBE_RTT",
        }
    }

    pub fn max_bw(&self) -> f64 {
        self.max_bw
    }

    pub fn min_rtt(&self) -> Option<Duration> {
        self.min_rtt
    }

    fn min_cwnd_bytes() -> usize {
        MIN_CWND_SEGMENTS * MSS
    }

    fn bdp_bytes(&self) -> usize {
        match self.min_rtt {
            Some(rtt) if self.max_bw > 0.0 => {
                ((self.max_bw * rtt.as_secs_f64()) as usize).max(Self::min_cwnd_bytes())
            }
            _ => Self::min_cwnd_bytes(),
        }
    }

    fn update_bandwidth_sample(&mut self, delivered: u64, now: Instant) {
        let elapsed = now.duration_since(self.sample_start_time);
        let total_delivered = delivered.saturating_sub(self.sample_start_delivered);
        if elapsed > Duration::from_millis(1) && total_delivered > 0 {
            let bw = total_delivered as f64 / elapsed.as_secs_f64();
            if self.bw_samples.len() == BW_WINDOW_ROUNDS {
                self.bw_samples.pop_front();
            }
            self.bw_samples.push_back(bw);
            self.max_bw = self.bw_samples.iter().cloned().fold(0.0, f64::max);
            self.sample_start_time = now;
            self.sample_start_delivered = delivered;
        }
    }

    fn check_full_bw_reached(&mut self) {
        if self.full_bw_reached || !self.round_start {
            return;
        }
        let bw_thresh = (self.full_bw * FULL_BW_THRESH as f64) / UNIT as f64;
        if self.max_bw >= bw_thresh {
            self.full_bw = self.max_bw;
            self.full_bw_count = 0;
        } else {
            self.full_bw_count += 1;
            if self.full_bw_count >= FULL_BW_COUNT {
                self.full_bw_reached = true;
            }
        }
    }

    fn update_mode(&mut self, in_flight_bytes: usize, now: Instant) {
        match self.mode {
            Mode::Startup => {
                if self.full_bw_reached {
                    self.mode = Mode::Drain;
                }
            }
            Mode::Drain => {
                if in_flight_bytes <= self.bdp_bytes() {
                    self.mode = Mode::ProbeBw;
                    self.cycle_index = 0;
                    self.cycle_stamp = now;
                }
            }
            Mode::ProbeBw => {
                if now.duration_since(self.min_rtt_stamp) > MIN_RTT_WINDOW {
                    self.mode = Mode::ProbeRtt;
                    self.probe_rtt_done_stamp = None;
                }
            }
            Mode::ProbeRtt => {
                if let Some(done) = self.probe_rtt_done_stamp {
                    if now >= done {
                        self.min_rtt_stamp = now;
                        self.mode = if self.full_bw_reached {
                            Mode::ProbeBw
                        } else {
                            Mode::Startup
                        };
                    }
                } else {
                    self.probe_rtt_done_stamp = Some(now + PROBE_RTT_DURATION);
                }
            }
        }
    }

    fn update_gains(&mut self) {
        match self.mode {
            Mode::Startup => {
                self.cwnd_gain = HIGH_GAIN;
            }
            Mode::Drain => {
                self.cwnd_gain = HIGH_GAIN;
            }
            Mode::ProbeBw => {
                self.cwnd_gain = CWND_GAIN_PROBE_BW;
                if self.round_start {
                    self.cycle_index = (self.cycle_index + 1) % PACING_GAIN_CYCLE.len();
                }
            }
            Mode::ProbeRtt => {
                self.cwnd_gain = UNIT;
            }
        }
    }

    fn update_cwnd(&mut self) {
        if self.mode == Mode::ProbeRtt {
            self.cwnd = Self::min_cwnd_bytes();
            return;
        }
        let bdp = self.bdp_bytes();
        let target = ((bdp as i64 * self.cwnd_gain) / UNIT).max(Self::min_cwnd_bytes() as i64) as usize;
        self.cwnd = if self.full_bw_reached {
            target
        } else {
            self.cwnd.max(target)
        };
        self.cwnd = self.cwnd.max(Self::min_cwnd_bytes());
    }
}

impl Default for Bbr {
    fn default() -> Self {
        Self::new()
    }
}

impl CongestionController for Bbr {
    fn on_new_ack(
        &mut self,
        _acked_bytes: usize,
        ack_offset: u64,
        next_seq: u64,
        rtt_sample: Option<Duration>,
    ) {
        let now = Instant::now();

        if let Some(rtt) = rtt_sample {
            let shrinks = match self.min_rtt {
                Some(min) => rtt < min,
                None => true,
            };
            if shrinks {
                self.min_rtt = Some(rtt);
                self.min_rtt_stamp = now;
            }
        }

        self.update_bandwidth_sample(ack_offset, now);

        if ack_offset >= self.next_round_delivered {
            self.round_start = true;
            self.round_count += 1;
            self.next_round_delivered = next_seq;
            self.check_full_bw_reached();
        } else {
            self.round_start = false;
        }

        let in_flight_bytes = next_seq.saturating_sub(ack_offset) as usize;
        self.update_mode(in_flight_bytes, now);
        self.update_gains();
        self.update_cwnd();
    }

    fn on_duplicate_ack(&mut self, _count: u32) {}

    // BBR relies purely on the BDP model; loss signals do not shrink the
    // window. The RTO machinery upstream still retransmits regardless.
    fn on_timeout(&mut self) {}

    fn on_fast_retransmit(&mut self, _next_seq: u64) {}

    fn effective_window(&self) -> usize {
        self.cwnd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_startup_mode_with_min_cwnd() {
        let bbr = Bbr::new();
        assert_eq!(bbr.mode_name(), "STARTUP");
        assert_eq!(bbr.effective_window(), MIN_CWND_SEGMENTS * MSS);
    }

    #[test]
    fn bandwidth_and_rtt_samples_are_tracked() {
        let mut bbr = Bbr::new();
        bbr.on_new_ack(MSS, MSS as u64, 2 * MSS as u64, Some(Duration::from_millis(20)));
        assert_eq!(bbr.min_rtt(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn min_rtt_only_shrinks() {
        let mut bbr = Bbr::new();
        bbr.on_new_ack(MSS, MSS as u64, 2 * MSS as u64, Some(Duration::from_millis(50)));
        bbr.on_new_ack(
            MSS as usize,
            2 * MSS as u64,
            3 * MSS as u64,
            Some(Duration::from_millis(80)),
        );
        assert_eq!(bbr.min_rtt(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn loss_events_do_not_shrink_window() {
        let mut bbr = Bbr::new();
        let before = bbr.effective_window();
        bbr.on_timeout();
        bbr.on_fast_retransmit(0);
        assert_eq!(bbr.effective_window(), before);
    }

    #[test]
    fn duplicate_acks_are_ignored() {
        let mut bbr = Bbr::new();
        let before = bbr.effective_window();
        bbr.on_duplicate_ack(3);
        assert_eq!(bbr.effective_window(), before);
    }
}
