//! Uniform key distribution
//!
//! Equal probability across `[1, n]`. The default distribution and the baseline
//! against which `zipf` and `latest` are judged skewed.

use super::KeyDistribution;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

pub struct UniformKeyDistribution {
    rng: Xoshiro256PlusPlus,
}

impl UniformKeyDistribution {
    pub fn new() -> Self {
        Self {
            rng: Xoshiro256PlusPlus::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }
}

impl Default for UniformKeyDistribution {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDistribution for UniformKeyDistribution {
    #[inline]
    fn draw(&mut self, n: u64) -> u64 {
        if n == 0 {
            return 1;
        }
        self.rng.gen_range(1..=n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_in_range() {
        let mut dist = UniformKeyDistribution::with_seed(1);
        for _ in 0..1000 {
            let k = dist.draw(500);
            assert!((1..=500).contains(&k));
        }
    }

    #[test]
    fn degenerate_keyspace_returns_one() {
        let mut dist = UniformKeyDistribution::new();
        assert_eq!(dist.draw(0), 1);
    }

    #[test]
    fn seeded_streams_are_reproducible() {
        let mut a = UniformKeyDistribution::with_seed(7);
        let mut b = UniformKeyDistribution::with_seed(7);
        for _ in 0..50 {
            assert_eq!(a.draw(10_000), b.draw(10_000));
        }
    }

    #[test]
    fn roughly_uniform_coverage() {
        let mut dist = UniformKeyDistribution::with_seed(99);
        let mut buckets = [0u32; 10];
        for _ in 0..20_000 {
            let k = dist.draw(100);
            buckets[((k - 1) / 10) as usize] += 1;
        }
        for count in buckets {
            assert!(count > 1500 && count < 2500, "bucket count {count} out of range");
        }
    }
}
