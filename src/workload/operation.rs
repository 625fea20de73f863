//! The operation value type emitted by workload generators.

use crate::payload::Payload;

#[derive(Debug, Clone)]
pub enum Operation {
    ReadById {
        id: u64,
        /// Some profiles alternate between two synthetic collections to model
        /// random cross-collection reads.
        collection: Option<&'static str>,
    },
    Insert {
        id: u64,
        payload: Payload,
    },
    Update {
        id: u64,
        payload: Payload,
    },
    BulkInsert {
        documents: Vec<(u64, Payload)>,
    },
    Query {
        text: String,
        parameters: Vec<(String, String)>,
    },
    VectorSearch {
        vector: Vec<f32>,
        field: &'static str,
        k: usize,
        threshold: Option<f32>,
        mode: VectorSearchMode,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorSearchMode {
    Approximate,
    Exact,
}
