//! "Latest" key distribution
//!
//! Models temporal locality after inserts: with probability 0.8 draw uniformly from
//! the top `hot_portion · n` keys (the most recently inserted), otherwise draw
//! uniformly from the whole keyspace. Default `hot_portion = 0.20`.
//!
//! "Top" keys are the highest-numbered ones, since the workload's key counter hands
//! out ids in increasing order — the newest documents have the largest ids.

use super::KeyDistribution;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

const HOT_KEY_PROBABILITY: f64 = 0.8;

pub struct LatestKeyDistribution {
    hot_portion: f64,
    rng: Xoshiro256PlusPlus,
}

impl LatestKeyDistribution {
    pub fn new(hot_portion: f64) -> Self {
        Self::with_seed(hot_portion, rand::random())
    }

    pub fn with_seed(hot_portion: f64, seed: u64) -> Self {
        assert!(
            hot_portion > 0.0 && hot_portion <= 1.0,
            "hot_portion must be in (0, 1], got {hot_portion}"
        );
        Self {
            hot_portion,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }
}

impl KeyDistribution for LatestKeyDistribution {
    fn draw(&mut self, n: u64) -> u64 {
        if n == 0 {
            return 1;
        }
        let hot_size = ((n as f64) * self.hot_portion).ceil().clamp(1.0, n as f64) as u64;
        if self.rng.gen_bool(HOT_KEY_PROBABILITY) {
            let lo = n - hot_size + 1;
            self.rng.gen_range(lo..=n)
        } else {
            self.rng.gen_range(1..=n)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_in_range() {
        let mut dist = LatestKeyDistribution::with_seed(0.2, 3);
        for _ in 0..1000 {
            let k = dist.draw(500);
            assert!((1..=500).contains(&k));
        }
    }

    #[test]
    fn degenerate_keyspace_returns_one() {
        let mut dist = LatestKeyDistribution::with_seed(0.2, 3);
        assert_eq!(dist.draw(0), 1);
    }

    #[test]
    fn favors_the_tail_of_the_keyspace() {
        let mut dist = LatestKeyDistribution::with_seed(0.2, 11);
        let n = 1000u64;
        let hot_threshold = n - (n / 5) + 1;
        let mut hot_hits = 0u32;
        let samples = 20_000;
        for _ in 0..samples {
            if dist.draw(n) >= hot_threshold {
                hot_hits += 1;
            }
        }
        let ratio = hot_hits as f64 / samples as f64;
        // ~0.8 hot-portion draws + a small contribution from the uniform fallback.
        assert!(ratio > 0.75, "expected strong recency bias, got {ratio}");
    }
}
