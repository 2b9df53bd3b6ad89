//! Randomness sources for outcome evaluation.
//!
//! Game modules never touch a global RNG: they take any [`Randomness`]
//! implementation, so production code can hand them a thread-local source
//! while tests drive them with a seeded one and get reproducible rounds.

use rand::rngs::ThreadRng;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A uniform randomness source.
///
/// Implementors provide a single primitive draw in `[0, 1)`; the remaining
/// operations are derived from it so that every implementation behaves
/// identically given the same draw sequence.
pub trait Randomness {
    /// Uniform draw in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform integer in `[0, max)`. `max` must be non-zero.
    fn next_bounded(&mut self, max: usize) -> usize {
        debug_assert!(max > 0);
        // Bounds here are tiny (at most 52), far below f64 precision limits.
        ((self.next_f64() * max as f64) as usize).min(max - 1)
    }

    /// Returns true with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Shuffle a slice in place using Fisher-Yates.
    fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_bounded(i + 1);
            slice.swap(i, j);
        }
    }
}

/// Production source backed by the thread-local generator.
#[derive(Default)]
pub struct ThreadRandomness(ThreadRng);

impl ThreadRandomness {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Randomness for ThreadRandomness {
    fn next_f64(&mut self) -> f64 {
        self.0.gen()
    }
}

/// Deterministic source for tests and replayable simulations.
#[derive(Clone, Debug)]
pub struct SeededRandomness(ChaCha8Rng);

impl SeededRandomness {
    pub fn from_seed(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl Randomness for SeededRandomness {
    fn next_f64(&mut self) -> f64 {
        self.0.gen()
    }
}
