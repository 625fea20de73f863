//! Crate-wide error type
//!
//! Split between `anyhow` at the process boundary and a typed error enum at module
//! boundaries: internal code returns `KneeError` so callers can match on the failure
//! kind (configuration vs. negotiation vs. measurement defect), while `main` and
//! other top-level entry points work in terms of `anyhow::Result` via `?` and
//! `.context(...)`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KneeError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("protocol negotiation failed for {requested}: {detail}")]
    Negotiation { requested: String, detail: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("measurement defect: {0}")]
    MeasurementDefect(String),
}

pub type Result<T> = std::result::Result<T, KneeError>;
