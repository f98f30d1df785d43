use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of the simulator's randomness.
///
/// Tests swap in a scripted implementation to make runs deterministic.
pub trait RandomSource: Send {
    /// Uniform integer in `min..=max`.
    fn percent_step(&mut self, min: u8, max: u8) -> u8;
    /// `true` with the given probability.
    fn chance(&mut self, probability: f64) -> bool;
    /// Uniform index in `0..len`; `len` must be non-zero.
    fn pick(&mut self, len: usize) -> usize;
}

pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomSource for SeededRandom {
    fn percent_step(&mut self, min: u8, max: u8) -> u8 {
        if min >= max {
            return min;
        }
        self.rng.random_range(min..=max)
    }

    fn chance(&mut self, probability: f64) -> bool {
        if probability.is_nan() || probability <= 0.0 {
            return false;
        }
        self.rng.random_bool(probability.min(1.0))
    }

    fn pick(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.random_range(0..len)
    }
}
