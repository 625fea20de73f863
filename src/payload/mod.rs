//! Synthetic document payload generation
//!
//! Produces byte-sized JSON documents for insert/update/bulk operations. To avoid
//! allocating on the hot path, a fixed pool of pre-generated payloads is built once
//! per requested size and shared (via `Arc`) across every operation that needs that
//! size.

use rand::distributions::Alphanumeric;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::sync::Arc;

/// Number of documents pre-generated per distinct size.
const POOL_SIZE: usize = 1000;

/// Number of string fields in the synthetic document structure.
const FIELD_COUNT: usize = 10;

/// A ready-to-send document body, shared by reference so cloning a payload for many
/// concurrent requests is a refcount bump, not a copy.
pub type Payload = Arc<Vec<u8>>;

/// Generates and caches synthetic documents of a requested serialized size.
pub struct PayloadGenerator {
    seed: u64,
    pools: std::collections::HashMap<u64, Arc<Vec<Payload>>>,
}

impl PayloadGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            pools: std::collections::HashMap::new(),
        }
    }

    /// Get (building and caching if necessary) the payload pool for `size_bytes`,
    /// then hand back one entry chosen by `slot` (typically an operation counter or
    /// RNG draw, modulo the pool size — callers don't need the distribution to be
    /// uniform, just cheap and varied enough to defeat naive compression).
    pub fn get(&mut self, size_bytes: usize, slot: u64) -> Payload {
        let pool = self
            .pools
            .entry(size_bytes as u64)
            .or_insert_with(|| Arc::new(build_pool(size_bytes, self.seed ^ size_bytes as u64)))
            .clone();
        pool[(slot as usize) % pool.len()].clone()
    }
}

fn build_pool(size_bytes: usize, seed: u64) -> Vec<Payload> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    (0..POOL_SIZE)
        .map(|_| Arc::new(build_document(size_bytes, &mut rng)))
        .collect()
}

/// Structural overhead of the empty document shell: 10 fields named `f0`..`f9`, each
/// `"fN":"..."` plus braces and commas.
fn structural_overhead() -> usize {
    let mut shell_len = 2; // { }
    for i in 0..FIELD_COUNT {
        // "fN":"" plus a trailing comma for all but the last field
        shell_len += format!("\"f{i}\":\"\"").len() + 1;
    }
    shell_len
}

fn build_document(size_bytes: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<u8> {
    let overhead = structural_overhead();
    if size_bytes <= overhead {
        // Too small to hold the real structure: fall back to a single filler character.
        return vec![b'x'; size_bytes];
    }

    let fill_budget = size_bytes - overhead;
    let per_field = fill_budget / FIELD_COUNT;
    let remainder = fill_budget % FIELD_COUNT;

    let mut doc = String::with_capacity(size_bytes + 16);
    doc.push('{');
    for i in 0..FIELD_COUNT {
        let field_len = if i < remainder { per_field + 1 } else { per_field };
        let value: String = rng
            .sample_iter(&Alphanumeric)
            .take(field_len)
            .map(char::from)
            .collect();
        doc.push_str(&format!("\"f{i}\":\"{value}\""));
        if i + 1 < FIELD_COUNT {
            doc.push(',');
        }
    }
    doc.push('}');
    doc.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_requested_size_when_above_overhead() {
        let mut gen = PayloadGenerator::new(1);
        let payload = gen.get(1024, 0);
        assert_eq!(payload.len(), 1024);
    }

    #[test]
    fn falls_back_to_filler_when_too_small() {
        let mut gen = PayloadGenerator::new(1);
        let payload = gen.get(4, 0);
        assert_eq!(payload.len(), 4);
        assert!(payload.iter().all(|&b| b == b'x'));
    }

    #[test]
    fn pool_is_reused_across_calls() {
        let mut gen = PayloadGenerator::new(42);
        let a = gen.get(256, 0);
        let b = gen.get(256, POOL_SIZE as u64); // wraps back to slot 0
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_slots_generally_differ() {
        let mut gen = PayloadGenerator::new(42);
        let a = gen.get(256, 0);
        let b = gen.get(256, 1);
        assert_ne!(a, b);
    }

    #[test]
    fn deterministic_for_a_given_seed() {
        let mut gen_a = PayloadGenerator::new(7);
        let mut gen_b = PayloadGenerator::new(7);
        assert_eq!(gen_a.get(512, 3), gen_b.get(512, 3));
    }
}
