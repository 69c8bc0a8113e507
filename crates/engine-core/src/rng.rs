//! Deterministic random stream for the engine.
//!
//! Every stochastic decision (sampling, jitter) draws from a single seeded
//! splitmix64 stream owned by the engine. There is no ambient RNG: replaying
//! a run with the same seed and inputs reproduces every draw.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    /// splitmix64 step.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut mixed = self.state;
        mixed = (mixed ^ (mixed >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        mixed = (mixed ^ (mixed >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        mixed ^ (mixed >> 31)
    }

    /// Uniform draw in `[0, 1)` with 53 bits of precision.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1_u64 << 53) as f64)
    }

    /// Standard normal draw, Box-Muller from two uniforms.
    pub fn next_gaussian(&mut self) -> f64 {
        let u1 = self.next_f64().max(f64::MIN_POSITIVE);
        let u2 = self.next_f64();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_replays_same_stream() {
        let mut a = SimRng::new(1337);
        let mut b = SimRng::new(1337);
        for _ in 0..64 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn uniform_draws_stay_in_unit_interval() {
        let mut rng = SimRng::new(7);
        for _ in 0..10_000 {
            let value = rng.next_f64();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn gaussian_draws_center_near_zero() {
        let mut rng = SimRng::new(99);
        let samples = 10_000;
        let sum: f64 = (0..samples).map(|_| rng.next_gaussian()).sum();
        let mean = sum / samples as f64;
        assert!(mean.abs() < 0.05, "gaussian mean drifted: {mean}");
    }
}
