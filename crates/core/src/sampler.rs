//! Bounded integer sampling over an injected random source.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::model::OperandRange;

/// Stateless-by-contract sampler wrapping a seedable RNG.
///
/// Seed it in tests to make batch generation and shuffling reproducible.
#[derive(Debug, Clone)]
pub struct RandomSampler<R = StdRng> {
    rng: R,
}

impl RandomSampler<StdRng> {
    /// Sampler seeded from the operating system.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Deterministic sampler for tests and replays.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomSampler<R> {
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Uniform integer in `[min, max]`. Returns `min` when the range is empty.
    pub fn int_between(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        self.rng.random_range(min..=max)
    }

    /// Uniform integer inside an operand range.
    pub fn int_in(&mut self, range: OperandRange) -> i64 {
        self.int_between(range.min, range.max)
    }

    /// Uniform index in `[0, len)`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "index() needs a non-empty range");
        self.rng.random_range(0..len.max(1))
    }

    /// Unbiased in-place permutation (Fisher-Yates).
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}
