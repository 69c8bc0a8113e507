//! Randomized firing periods.
//!
//! Periods are normally distributed around the template mean so firings
//! cluster near it, with a hard floor so a lucky draw can never produce a
//! near-zero period that starves the scheduler.

use crate::rng::SimRng;

/// Floor for jittered periods, as a divisor of the mean: a period never
/// falls below `mean / 10`.
pub const PERIOD_FLOOR_DIVISOR: f64 = 10.0;

/// Standard deviation as a fraction of the mean.
const SD_DIVISOR: f64 = 3.0;

/// Raw jittered period in fractional ticks: normal around `mean_period`
/// with sd `mean_period / 3`, clamped to the floor.
pub fn jittered_period(mean_period: f64, rng: &mut SimRng) -> f64 {
    let sd = mean_period / SD_DIVISOR;
    let raw = mean_period + sd * rng.next_gaussian();
    raw.max(mean_period / PERIOD_FLOOR_DIVISOR)
}

/// Jittered period scaled by an external urgency factor and converted to
/// whole ticks. Never returns 0: even a crushed period fires next tick.
pub fn period_ticks(mean_period: f64, urgency_factor: f64, rng: &mut SimRng) -> u64 {
    let scaled = jittered_period(mean_period, rng) * urgency_factor.max(0.0);
    scaled.round().max(1.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jittered_period_respects_floor() {
        let mut rng = SimRng::new(17);
        for _ in 0..10_000 {
            assert!(jittered_period(100.0, &mut rng) >= 10.0);
        }
    }

    #[test]
    fn jittered_period_clusters_around_mean() {
        let mut rng = SimRng::new(23);
        let samples = 10_000;
        let sum: f64 = (0..samples).map(|_| jittered_period(100.0, &mut rng)).sum();
        let mean = sum / samples as f64;
        // Flooring skews slightly high, so allow a generous band.
        assert!((85.0..115.0).contains(&mean), "mean period was {mean}");
    }

    #[test]
    fn period_ticks_is_at_least_one() {
        let mut rng = SimRng::new(31);
        for _ in 0..1_000 {
            assert!(period_ticks(0.2, 0.01, &mut rng) >= 1);
        }
    }

    #[test]
    fn urgency_factor_scales_periods() {
        let mut slow_rng = SimRng::new(5);
        let mut fast_rng = SimRng::new(5);
        let samples = 2_000;
        let slow: u64 = (0..samples)
            .map(|_| period_ticks(100.0, 1.0, &mut slow_rng))
            .sum();
        let fast: u64 = (0..samples)
            .map(|_| period_ticks(100.0, 0.5, &mut fast_rng))
            .sum();
        assert!(fast * 3 < slow * 2, "halved urgency did not shorten periods");
    }
}
