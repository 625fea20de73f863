//! Zipfian key distribution
//!
//! Power-law access pattern where small keys are drawn far more often than large
//! ones: `P(k) ∝ k^(-theta)`. Default `theta = 0.99`. Exactness of the
//! zeta normalization constant is not required — only that earlier keys are strictly
//! more frequent than later ones — so this uses inverse-transform sampling over a
//! precomputed CDF rather than a closed-form zeta function.

use super::KeyDistribution;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Zipfian distributions over very large keyspaces are capped to this many distinct
/// CDF entries; keys are then scaled back up proportionally. This keeps
/// initialization sub-millisecond even for multi-million-row preloads.
const MAX_CDF_ENTRIES: u64 = 1_000_000;

pub struct ZipfKeyDistribution {
    theta: f64,
    cdf: Vec<f64>,
    cdf_keyspace: u64,
    rng: Xoshiro256PlusPlus,
}

impl ZipfKeyDistribution {
    pub fn new(theta: f64) -> Self {
        Self::with_seed(theta, rand::random())
    }

    pub fn with_seed(theta: f64, seed: u64) -> Self {
        assert!(theta >= 0.0, "zipfian theta must be non-negative, got {theta}");
        Self {
            theta,
            cdf: Vec::new(),
            cdf_keyspace: 0,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    fn ensure_cdf(&mut self, n: u64) {
        if self.cdf_keyspace == n && !self.cdf.is_empty() {
            return;
        }
        let entries = n.min(MAX_CDF_ENTRIES) as usize;
        let mut h = 0.0f64;
        for i in 1..=entries {
            h += (i as f64).powf(-self.theta);
        }
        let mut cdf = Vec::with_capacity(entries);
        let mut cumulative = 0.0f64;
        for i in 1..=entries {
            cumulative += (i as f64).powf(-self.theta) / h;
            cdf.push(cumulative);
        }
        self.cdf = cdf;
        self.cdf_keyspace = n;
    }
}

impl KeyDistribution for ZipfKeyDistribution {
    fn draw(&mut self, n: u64) -> u64 {
        if n == 0 {
            return 1;
        }
        self.ensure_cdf(n);
        let u: f64 = self.rng.gen();
        let rank = match self
            .cdf
            .binary_search_by(|v| v.partial_cmp(&u).unwrap_or(std::cmp::Ordering::Greater))
        {
            Ok(i) | Err(i) => i,
        };
        let scaled = ((rank as u64) * n) / (self.cdf.len() as u64);
        scaled.min(n - 1) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_in_range() {
        let mut dist = ZipfKeyDistribution::with_seed(0.99, 1);
        for _ in 0..500 {
            let k = dist.draw(1000);
            assert!((1..=1000).contains(&k));
        }
    }

    #[test]
    fn degenerate_keyspace_returns_one() {
        let mut dist = ZipfKeyDistribution::with_seed(0.99, 1);
        assert_eq!(dist.draw(0), 1);
    }

    #[test]
    fn earlier_keys_are_more_frequent() {
        let mut dist = ZipfKeyDistribution::with_seed(1.2, 42);
        let n = 1000u64;
        let mut buckets = [0u32; 10];
        for _ in 0..20_000 {
            let k = dist.draw(n);
            let bucket = (((k - 1) * 10) / n) as usize;
            buckets[bucket.min(9)] += 1;
        }
        assert!(
            buckets[0] > buckets[9] * 2,
            "expected strong skew toward low keys: {buckets:?}"
        );
    }

    #[test]
    fn reproducible_with_same_seed() {
        let mut a = ZipfKeyDistribution::with_seed(0.99, 5);
        let mut b = ZipfKeyDistribution::with_seed(0.99, 5);
        for _ in 0..100 {
            assert_eq!(a.draw(10_000), b.draw(10_000));
        }
    }
}
