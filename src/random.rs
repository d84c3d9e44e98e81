//! Pseudo-random numbers for sketches (`random`, `randomSeed`)

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug)]
pub struct Random {
    rng: StdRng,
}

impl Random {
    /// Seeded from the operating system.
    pub fn new() -> Self {
        Self { rng: StdRng::from_os_rng() }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Value in `[0, max)`. Returns 0 when `max <= 0`.
    pub fn random(&mut self, max: i64) -> i64 {
        self.random_range(0, max)
    }

    /// Value in `[min, max)`. Returns `min` when the range is empty.
    pub fn random_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        self.rng.random_range(min..max)
    }

    /// Restarts the sequence; equal seeds give equal sequences.
    pub fn random_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::new()
    }
}
