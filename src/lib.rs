//! kneeload - closed-loop load generator that locates the throughput/latency knee of
//! a document database deployment.
//!
//! # Architecture
//!
//! - **Config layer**: CLI + TOML overlay, validated before any network I/O
//! - **Workload generation**: pluggable access-pattern profiles over key distributions
//! - **Transport**: raw (manual wire accounting) and client (`reqwest`-delegated) HTTP
//! - **Generators**: closed-loop (fixed concurrency) and rate-driven (paced dispatch)
//! - **Telemetry**: generator CPU, target REST admin counters, target SNMP
//! - **Analysis**: deterministic knee detection over the assembled step records

pub mod analyzer;
pub mod calibration;
pub mod config;
pub mod controller;
pub mod distribution;
pub mod error;
pub mod generator;
pub mod output;
pub mod payload;
pub mod stats;
pub mod summary;
pub mod telemetry;
pub mod transport;
pub mod util;
pub mod workload;

pub use error::{KneeError, Result};
