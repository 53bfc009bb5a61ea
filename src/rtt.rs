//! RTT/RTO estimation, Jacobson/Karels style (RFC 6298), with the
//! reference's first-sample seeding rule rather than RFC 6298's own
//! `rttvar := sample/2, rto := srtt + 2*rttvar`.
//!
//! On the first sample: `srtt := sample`, `rttvar := sample/2`,
//! `rto := 1.5 * sample` (clamped).
//! On later samples: `rttvar := (1-beta)*rttvar + beta*|srtt - sample|`;
//! `srtt := (1-alpha)*srtt + alpha*sample`; `rto := srtt + K*rttvar` (clamped).
//!
//! Samples must only come from a segment's first transmission (Karn's
//! rule); callers are responsible for not feeding retransmit timings in.

use std::time::Duration;

const ALPHA_NUM: u32 = 1;
const ALPHA_DEN: u32 = 8;
const BETA_NUM: u32 = 1;
const BETA_DEN: u32 = 4;
const K: u32 = 4;

/// Lower clamp shared by every profile.
pub const RTO_MIN: Duration = Duration::from_millis(100);
/// Upper clamp for the Reno/CUBIC profile.
pub const RTO_MAX_RENO_CUBIC: Duration = Duration::from_secs(2);
/// Upper clamp for the BBR profile, which tolerates a wider timeout since
/// its window is driven by the BDP model rather than loss.
pub const RTO_MAX_BBR: Duration = Duration::from_secs(3);

/// RTT estimator with a caller-supplied upper RTO clamp, so one type
/// serves both the Reno/CUBIC and BBR profiles.
#[derive(Debug, Clone)]
pub struct RttEstimator {
    srtt: Option<Duration>,
    rttvar: Option<Duration>,
    rto: Duration,
    rto_max: Duration,
}

impl RttEstimator {
    /// Create an estimator clamped to `[RTO_MIN, rto_max]`.
    pub fn new(rto_max: Duration) -> Self {
        Self {
            srtt: None,
            rttvar: None,
            rto: RTO_MIN,
            rto_max,
        }
    }

    /// An estimator for the Reno/CUBIC profile (`RTO_MAX = 2s`).
    pub fn reno_cubic() -> Self {
        Self::new(RTO_MAX_RENO_CUBIC)
    }

    /// An estimator for the BBR profile (`RTO_MAX = 3s`).
    pub fn bbr() -> Self {
        Self::new(RTO_MAX_BBR)
    }

    /// Feed a fresh RTT sample (must be from a first transmission only).
    pub fn sample(&mut self, sample: Duration) {
        match self.srtt {
            None => {
                self.srtt = Some(sample);
                self.rttvar = Some(sample / 2);
                self.rto = clamp(sample + sample / 2, self.rto_max);
            }
            Some(srtt) => {
                let diff = abs_diff(srtt, sample);
                let rttvar = self.rttvar.unwrap_or(diff);
                let new_rttvar = scale(rttvar, BETA_DEN - BETA_NUM, BETA_DEN)
                    + scale(diff, BETA_NUM, BETA_DEN);
                self.rttvar = Some(new_rttvar);

                let new_srtt = scale(srtt, ALPHA_DEN - ALPHA_NUM, ALPHA_DEN)
                    + scale(sample, ALPHA_NUM, ALPHA_DEN);
                self.srtt = Some(new_srtt);

                self.rto = clamp(new_srtt + new_rttvar * K, self.rto_max);
            }
        }
    }

    pub fn srtt(&self) -> Option<Duration> {
        self.srtt
    }

    pub fn rttvar(&self) -> Option<Duration> {
        self.rttvar
    }

    /// Current retransmission timeout, always within `[RTO_MIN, rto_max]`.
    pub fn rto(&self) -> Duration {
        self.rto
    }
}

fn clamp(d: Duration, rto_max: Duration) -> Duration {
    d.clamp(RTO_MIN, rto_max)
}

fn abs_diff(a: Duration, b: Duration) -> Duration {
    if a > b {
        a - b
    } else {
        b - a
    }
}

/// `d * num / den`, computed in nanoseconds to avoid overflow on large
/// durations while keeping sub-millisecond precision.
fn scale(d: Duration, num: u32, den: u32) -> Duration {
    Duration::from_nanos((d.as_nanos() as u64 * num as u64) / den as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_uses_one_point_five_rule() {
        let mut est = RttEstimator::reno_cubic();
        est.sample(Duration::from_millis(100));
        assert_eq!(est.srtt(), Some(Duration::from_millis(100)));
        assert_eq!(est.rttvar(), Some(Duration::from_millis(50)));
        assert_eq!(est.rto(), Duration::from_millis(150));
    }

    #[test]
    fn subsequent_samples_smooth_toward_new_value() {
        let mut est = RttEstimator::reno_cubic();
        est.sample(Duration::from_millis(100));
        est.sample(Duration::from_millis(140));
        let srtt = est.srtt().unwrap();
        // srtt = 7/8*100 + 1/8*140 = 105ms
        assert!(
            srtt.as_millis() >= 104 && srtt.as_millis() <= 106,
            "srtt = {srtt:?}"
        );
    }

    #[test]
    fn rto_clamped_to_min() {
        let mut est = RttEstimator::reno_cubic();
        est.sample(Duration::from_micros(1));
        assert_eq!(est.rto(), RTO_MIN);
    }

    #[test]
    fn rto_clamped_to_profile_max() {
        let mut est = RttEstimator::reno_cubic();
        est.sample(Duration::from_secs(10));
        assert_eq!(est.rto(), RTO_MAX_RENO_CUBIC);

        let mut bbr_est = RttEstimator::bbr();
        bbr_est.sample(Duration::from_secs(10));
        assert_eq!(bbr_est.rto(), RTO_MAX_BBR);
    }
}
