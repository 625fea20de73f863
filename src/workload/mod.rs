//! Workload generators
//!
//! A `ProfileKind` selects one of a small closed set of access patterns, each
//! producing the next [`Operation`] from a worker-owned RNG and key distribution
//! plus a shared key counter — an enum over a fixed set of structs, not an open
//! trait hierarchy meant for third-party extension.

pub mod operation;

pub use operation::{Operation, VectorSearchMode};

use crate::config::MixWeights;
use crate::distribution::{rng_from_seed, DistributionKind, KeyDistribution};
use crate::payload::PayloadGenerator;
use rand::Rng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared, cross-worker document-id counter. Inserts reserve the next id with a
/// single atomic increment; the required property is just that concurrent inserts
/// receive distinct ids.
pub struct KeyCounter(AtomicU64);

impl KeyCounter {
    pub fn new(preloaded: u64) -> Self {
        Self(AtomicU64::new(preloaded))
    }

    /// Reserve and return the next id (1-based, continuing after the preloaded
    /// range).
    pub fn next_id(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Size of the keyspace as of this call — i.e. the highest id handed out (or
    /// preloaded) so far.
    pub fn current_size(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// State shared by every worker's workload generator instance.
pub struct WorkloadContext {
    pub keys: Arc<KeyCounter>,
    pub doc_size_bytes: usize,
    pub distribution: DistributionKind,
    pub mix: MixWeights,
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSearchVariant {
    Rare,
    Common,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Mixed,
    WritesOnly,
    ReadsOnly,
    QueryById,
    BulkWrites,
    RandomReadsTwoCollections,
    ParameterizedEquality,
    ParameterizedRange,
    TextPrefix,
    FullText(TextSearchVariant),
    VectorSearch { exact: bool },
}

impl ProfileKind {
    /// True if operations from this profile grow the keyspace or mutate existing
    /// documents.
    pub fn is_mutating(&self) -> bool {
        matches!(self, ProfileKind::Mixed | ProfileKind::WritesOnly | ProfileKind::BulkWrites)
    }

    /// The read-only variant run during warmup for a mutating profile, sampling the
    /// already-preloaded keyspace instead of growing or mutating it. Non-mutating
    /// profiles warm up as themselves.
    pub fn warmup_variant(&self) -> ProfileKind {
        match self {
            ProfileKind::Mixed | ProfileKind::WritesOnly | ProfileKind::BulkWrites => ProfileKind::ReadsOnly,
            other => *other,
        }
    }

    pub fn build(&self, ctx: &WorkloadContext, worker_offset: u64) -> Box<dyn WorkloadGenerator> {
        let worker_seed = ctx.seed.wrapping_add(worker_offset.wrapping_mul(0xD1B5_4A32_D192_ED03));
        let distribution = ctx.distribution.build(worker_seed, worker_offset);
        let rng = rng_from_seed(worker_seed ^ 0xA5A5_A5A5_A5A5_A5A5);
        let payload_gen = PayloadGenerator::new(worker_seed);

        Box::new(ProfileGenerator {
            profile: *self,
            keys: Arc::clone(&ctx.keys),
            doc_size_bytes: ctx.doc_size_bytes,
            mix: ctx.mix,
            distribution,
            payload_gen,
            rng,
        })
    }
}

pub trait WorkloadGenerator: Send {
    fn next_operation(&mut self) -> Operation;
}

struct ProfileGenerator {
    profile: ProfileKind,
    keys: Arc<KeyCounter>,
    doc_size_bytes: usize,
    mix: MixWeights,
    distribution: Box<dyn KeyDistribution>,
    payload_gen: PayloadGenerator,
    rng: Xoshiro256PlusPlus,
}

const BULK_BATCH_SIZE: usize = 50;
const VECTOR_DIM: usize = 128;
const RARE_TERMS: &[&str] = &["xenolith", "quiddity", "gossamer"];
const COMMON_TERMS: &[&str] = &["order", "customer", "invoice"];
const COLLECTIONS: &[&str] = &["Orders", "Users"];

impl ProfileGenerator {
    fn existing_key(&mut self) -> u64 {
        let n = self.keys.current_size();
        self.distribution.draw(n)
    }

    fn insert_op(&mut self) -> Operation {
        let id = self.keys.next_id();
        let payload = self.payload_gen.get(self.doc_size_bytes, id);
        Operation::Insert { id, payload }
    }

    fn update_op(&mut self) -> Operation {
        let id = self.existing_key();
        let payload = self.payload_gen.get(self.doc_size_bytes, id ^ self.rng.gen::<u64>());
        Operation::Update { id, payload }
    }

    fn read_op(&mut self, collection: Option<&'static str>) -> Operation {
        let id = self.existing_key();
        Operation::ReadById { id, collection }
    }

    fn mixed_op(&mut self) -> Operation {
        let roll = self.rng.gen_range(0..100u32);
        if roll < self.mix.reads_pct {
            self.read_op(None)
        } else if roll < self.mix.reads_pct + self.mix.writes_pct {
            self.insert_op()
        } else {
            self.update_op()
        }
    }

    fn query_by_id_op(&mut self) -> Operation {
        let id = self.existing_key();
        Operation::Query {
            text: format!("from Docs where id() = 'docs/{id}'"),
            parameters: Vec::new(),
        }
    }

    fn bulk_op(&mut self) -> Operation {
        let documents = (0..BULK_BATCH_SIZE)
            .map(|_| {
                let id = self.keys.next_id();
                let payload = self.payload_gen.get(self.doc_size_bytes, id);
                (id, payload)
            })
            .collect();
        Operation::BulkInsert { documents }
    }

    fn random_reads_two_collections_op(&mut self) -> Operation {
        let collection = COLLECTIONS[self.rng.gen_range(0..COLLECTIONS.len())];
        self.read_op(Some(collection))
    }

    fn parameterized_equality_op(&mut self) -> Operation {
        let id = self.existing_key();
        Operation::Query {
            text: "from Docs where Field = $p0".to_string(),
            parameters: vec![("p0".to_string(), id.to_string())],
        }
    }

    fn parameterized_range_op(&mut self) -> Operation {
        let lo = self.existing_key();
        let hi = lo + 100;
        Operation::Query {
            text: "from Docs where Field between $p0 and $p1".to_string(),
            parameters: vec![("p0".to_string(), lo.to_string()), ("p1".to_string(), hi.to_string())],
        }
    }

    fn text_prefix_op(&mut self) -> Operation {
        let term = COMMON_TERMS[self.rng.gen_range(0..COMMON_TERMS.len())];
        let prefix: String = term.chars().take(3).collect();
        Operation::Query {
            text: "from Docs where startsWith(Field, $p0)".to_string(),
            parameters: vec![("p0".to_string(), prefix)],
        }
    }

    fn full_text_op(&mut self, variant: TextSearchVariant) -> Operation {
        let term = match variant {
            TextSearchVariant::Rare => RARE_TERMS[self.rng.gen_range(0..RARE_TERMS.len())],
            TextSearchVariant::Common => COMMON_TERMS[self.rng.gen_range(0..COMMON_TERMS.len())],
            TextSearchVariant::Mixed => {
                if self.rng.gen_bool(0.5) {
                    RARE_TERMS[self.rng.gen_range(0..RARE_TERMS.len())]
                } else {
                    COMMON_TERMS[self.rng.gen_range(0..COMMON_TERMS.len())]
                }
            }
        };
        Operation::Query {
            text: "from Docs where search(Field, $p0)".to_string(),
            parameters: vec![("p0".to_string(), term.to_string())],
        }
    }

    fn vector_search_op(&mut self, exact: bool) -> Operation {
        let vector: Vec<f32> = (0..VECTOR_DIM).map(|_| self.rng.gen_range(-1.0..1.0)).collect();
        let (threshold, mode) = if exact {
            (None, VectorSearchMode::Exact)
        } else {
            (Some(0.8), VectorSearchMode::Approximate)
        };
        Operation::VectorSearch {
            vector,
            field: "Embedding",
            k: 10,
            threshold,
            mode,
        }
    }
}

impl WorkloadGenerator for ProfileGenerator {
    fn next_operation(&mut self) -> Operation {
        match self.profile {
            ProfileKind::Mixed => self.mixed_op(),
            ProfileKind::WritesOnly => self.insert_op(),
            ProfileKind::ReadsOnly => self.read_op(None),
            ProfileKind::QueryById => self.query_by_id_op(),
            ProfileKind::BulkWrites => self.bulk_op(),
            ProfileKind::RandomReadsTwoCollections => self.random_reads_two_collections_op(),
            ProfileKind::ParameterizedEquality => self.parameterized_equality_op(),
            ProfileKind::ParameterizedRange => self.parameterized_range_op(),
            ProfileKind::TextPrefix => self.text_prefix_op(),
            ProfileKind::FullText(variant) => self.full_text_op(variant),
            ProfileKind::VectorSearch { exact } => self.vector_search_op(exact),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(mix: MixWeights) -> WorkloadContext {
        WorkloadContext {
            keys: Arc::new(KeyCounter::new(1000)),
            doc_size_bytes: 256,
            distribution: DistributionKind::Uniform,
            mix,
            seed: 7,
        }
    }

    #[test]
    fn writes_only_always_inserts_and_grows_the_keyspace() {
        let context = ctx(MixWeights {
            reads_pct: 0,
            writes_pct: 100,
            updates_pct: 0,
        });
        let mut gen = ProfileKind::WritesOnly.build(&context, 0);
        for _ in 0..10 {
            match gen.next_operation() {
                Operation::Insert { .. } => {}
                other => panic!("expected Insert, got {other:?}"),
            }
        }
        assert_eq!(context.keys.current_size(), 1010);
    }

    #[test]
    fn reads_only_never_mutates_the_key_counter() {
        let context = ctx(MixWeights {
            reads_pct: 100,
            writes_pct: 0,
            updates_pct: 0,
        });
        let mut gen = ProfileKind::ReadsOnly.build(&context, 0);
        for _ in 0..20 {
            match gen.next_operation() {
                Operation::ReadById { id, .. } => assert!(id >= 1 && id <= 1000),
                other => panic!("expected ReadById, got {other:?}"),
            }
        }
        assert_eq!(context.keys.current_size(), 1000);
    }

    #[test]
    fn mixed_profile_respects_its_weights_roughly() {
        let context = ctx(MixWeights {
            reads_pct: 80,
            writes_pct: 20,
            updates_pct: 0,
        });
        let mut gen = ProfileKind::Mixed.build(&context, 0);
        let mut reads = 0;
        let mut writes = 0;
        for _ in 0..5000 {
            match gen.next_operation() {
                Operation::ReadById { .. } => reads += 1,
                Operation::Insert { .. } => writes += 1,
                other => panic!("unexpected op {other:?}"),
            }
        }
        let ratio = reads as f64 / (reads + writes) as f64;
        assert!((ratio - 0.8).abs() < 0.03, "ratio was {ratio}");
    }

    #[test]
    fn bulk_writes_batches_are_the_configured_size() {
        let context = ctx(MixWeights {
            reads_pct: 0,
            writes_pct: 100,
            updates_pct: 0,
        });
        let mut gen = ProfileKind::BulkWrites.build(&context, 0);
        match gen.next_operation() {
            Operation::BulkInsert { documents } => assert_eq!(documents.len(), BULK_BATCH_SIZE),
            other => panic!("expected BulkInsert, got {other:?}"),
        }
    }

    #[test]
    fn mutating_profiles_warm_up_as_reads_only() {
        assert_eq!(ProfileKind::Mixed.warmup_variant(), ProfileKind::ReadsOnly);
        assert_eq!(ProfileKind::BulkWrites.warmup_variant(), ProfileKind::ReadsOnly);
        assert_eq!(ProfileKind::QueryById.warmup_variant(), ProfileKind::QueryById);
    }

    #[test]
    fn vector_search_exact_has_no_threshold() {
        let context = ctx(MixWeights {
            reads_pct: 100,
            writes_pct: 0,
            updates_pct: 0,
        });
        let mut gen = ProfileKind::VectorSearch { exact: true }.build(&context, 0);
        match gen.next_operation() {
            Operation::VectorSearch { threshold, mode, vector, .. } => {
                assert_eq!(threshold, None);
                assert_eq!(mode, VectorSearchMode::Exact);
                assert_eq!(vector.len(), VECTOR_DIM);
            }
            other => panic!("expected VectorSearch, got {other:?}"),
        }
    }
}
