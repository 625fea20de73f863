//! Transport abstraction
//!
//! A transport is responsible for turning one [`Operation`](crate::workload::Operation)
//! into an HTTP request against the target deployment and reporting back what actually
//! went over the wire. Two backends implement the same contract: [`raw::RawTransport`]
//! assembles requests by hand and decodes responses itself so `bytesIn`/`bytesOut` are
//! exact; [`client::ClientTransport`] delegates to `reqwest`'s full content-negotiation
//! machinery, standing in for the target's native client.
//!
//! # Architecture
//!
//! The `Transport` trait lets the generator and calibrator stay agnostic to which
//! backend is in play.

pub mod client;
pub mod negotiator;
pub mod raw;

use crate::error::Result;
use crate::workload::Operation;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Outcome of executing one [`Operation`] against the target.
#[derive(Debug, Clone)]
pub struct TransportResult {
    pub success: bool,
    pub bytes_out: u64,
    pub bytes_in: u64,
    /// Short, human-readable failure detail. `None` on success, and also `None`
    /// when the operation was cut short by the step deadline rather than failing.
    pub error_detail: Option<String>,
}

impl TransportResult {
    pub fn ok(bytes_out: u64, bytes_in: u64) -> Self {
        Self {
            success: true,
            bytes_out,
            bytes_in,
            error_detail: None,
        }
    }

    pub fn failed(bytes_out: u64, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            bytes_out,
            bytes_in: 0,
            error_detail: Some(detail.into()),
        }
    }

    /// A request cut short by cancellation is not an error: it counts toward
    /// neither the success nor the error tally.
    pub fn cancelled() -> Self {
        Self {
            success: true,
            bytes_out: 0,
            bytes_in: 0,
            error_detail: None,
        }
    }
}

/// One calibration probe's timing.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationSample {
    pub ttfb_us: u64,
    pub total_us: u64,
}

/// Common contract both transport backends implement.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one operation, honoring `cancel` for in-flight cutoff at a step
    /// deadline.
    async fn execute(&self, op: &Operation, cancel: &CancellationToken) -> TransportResult;

    /// Issue a single lightweight GET against `path`, for calibration use. Does not
    /// affect the latency recorder or byte counters.
    async fn calibrate(&self, path: &str) -> Result<CalibrationSample>;

    /// Insert one document directly, used for keyspace preloading.
    async fn put_document(&self, id: u64, payload: &[u8]) -> Result<()>;

    /// Best-effort raw admin-endpoint body, for the REST telemetry adapter to parse.
    /// `None` if the endpoint is unreachable or the target doesn't expose one.
    async fn get_server_counters(&self) -> Option<String>;

    /// One-shot reachability check run before any ramp step begins.
    async fn validate(&self) -> Result<()>;
}
