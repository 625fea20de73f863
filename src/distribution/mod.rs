//! Key distributions
//!
//! This module provides the access-pattern distributions used to pick a document key
//! out of a preloaded keyspace of size N. Distributions are a small closed set of
//! variants — uniform, zipfian, latest — each a pure mapping from a pseudorandom draw
//! to a key in `[1, N]`. They carry no shared mutable state beyond their own RNG, so
//! every worker owns its own instance.
//!
//! # Key space convention
//!
//! Keys are 1-based (`[1, N]`), matching document ids assigned by the workload's
//! insert counter (see [`crate::workload::KeyCounter`]), which also starts at 1.

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

pub mod latest;
pub mod uniform;
pub mod zipf;

/// A key distribution maps a uniform pseudorandom draw to a key in `[1, n]`.
///
/// # Thread Safety
///
/// Implementations must be `Send`; each worker owns its own instance so no
/// synchronization is required inside `draw`.
pub trait KeyDistribution: Send {
    /// Draw a key in `[1, n]`. `n == 0` is a degenerate keyspace and always returns 1
    /// (callers with an empty keyspace should not be drawing at all).
    fn draw(&mut self, n: u64) -> u64;
}

/// Parsed `--distribution` selector plus its parameters, as it appears in `RunConfig`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistributionKind {
    Uniform,
    /// `theta` defaults to 0.99.
    Zipfian { theta: f64 },
    /// `hot_portion` defaults to 0.20, hot-key probability defaults to 0.8.
    Latest { hot_portion: f64 },
}

impl Default for DistributionKind {
    fn default() -> Self {
        DistributionKind::Uniform
    }
}

impl DistributionKind {
    /// Instantiate the concrete distribution behind this selector, seeded
    /// deterministically from the run seed and a per-worker offset so that
    /// concurrent workers draw from independent streams.
    pub fn build(&self, seed: u64, worker_offset: u64) -> Box<dyn KeyDistribution> {
        let worker_seed = seed.wrapping_add(worker_offset.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        match *self {
            DistributionKind::Uniform => Box::new(uniform::UniformKeyDistribution::with_seed(worker_seed)),
            DistributionKind::Zipfian { theta } => {
                Box::new(zipf::ZipfKeyDistribution::with_seed(theta, worker_seed))
            }
            DistributionKind::Latest { hot_portion } => {
                Box::new(latest::LatestKeyDistribution::with_seed(hot_portion, worker_seed))
            }
        }
    }
}

pub(crate) fn rng_from_seed(seed: u64) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_distribution_is_uniform() {
        assert_eq!(DistributionKind::default(), DistributionKind::Uniform);
    }

    #[test]
    fn build_produces_independent_streams_per_worker() {
        let mut a = DistributionKind::Uniform.build(42, 0);
        let mut b = DistributionKind::Uniform.build(42, 1);
        let seq_a: Vec<u64> = (0..20).map(|_| a.draw(1_000_000)).collect();
        let seq_b: Vec<u64> = (0..20).map(|_| b.draw(1_000_000)).collect();
        assert_ne!(seq_a, seq_b);
    }
}
