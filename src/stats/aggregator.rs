//! Step record assembly
//!
//! Combines a step's latency snapshot, counters, and telemetry sample into the
//! `StepRecord` that the knee analyzer and output layer consume. This is pure,
//! synchronous data-shaping code — no I/O happens here, it only runs after a step's
//! measurement phase has already completed.

use crate::stats::histogram::{HistogramBin, LatencyHistogram, PercentileSet};
use crate::telemetry::TelemetrySample;
use std::time::Duration;

/// Everything measured or derived for one step of the ramp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StepRecord {
    /// The concurrency or rate value this step ran at.
    pub step_value: u64,
    pub duration: Duration,
    pub success_count: u64,
    pub error_count: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    /// Raw percentiles in milliseconds.
    pub raw: PercentileSet,
    /// `max(0, raw - baseline_floor)`, only present once baseline calibration succeeded.
    pub normalized: Option<PercentileSet>,
    pub error_rate: f64,
    /// `(successes + errors) / duration`.
    pub throughput: f64,
    /// `(bytes_in + bytes_out) * 8 / (link_bps * duration)`, only present when a link
    /// speed was configured.
    pub network_utilization: Option<f64>,
    pub telemetry: TelemetrySample,
    /// Rolling dispatch-rate stats; only populated by the rate-driven generator.
    pub rolling_rate: Option<RollingRateStats>,
    /// `success_count + error_count`.
    pub sample_count: u64,
    /// Total count recorded in the latency histogram, including any
    /// coordinated-omission backfill. Exceeds `sample_count` only when a stall
    /// forced the recorder to backfill samples for operations that hadn't
    /// completed yet.
    pub corrected_count: u64,
    /// Operations the generator dispatched during the window, counted independently
    /// of whether a worker slot was free to run them immediately.
    pub scheduled_operations: u64,
    /// Configured target arrival rate `R`, for rate-mode steps. `None` under the
    /// closed-loop shape, which paces by worker count rather than a target rate.
    pub target_throughput: Option<f64>,
    /// This step's latency histogram, exported as (value, count) bins for the
    /// summary's histogram output.
    pub bins: Vec<HistogramBin>,
}

/// Rolling request-rate statistics over a trailing window, reported by the
/// rate-driven generator when dispatcher slots saturate.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct RollingRateStats {
    pub median: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub last: f64,
    pub sample_count: u64,
}

/// Inputs needed to assemble one step's record, gathered by the step controller
/// after a measurement phase completes.
pub struct StepInputs {
    pub step_value: u64,
    pub duration: Duration,
    pub success_count: u64,
    pub error_count: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub histogram: LatencyHistogram,
    pub baseline_floor_ms: Option<PercentileSet>,
    pub link_bps: Option<f64>,
    pub telemetry: TelemetrySample,
    pub rolling_rate: Option<RollingRateStats>,
    /// Operations the generator dispatched during the window; see
    /// `StepRecord::scheduled_operations`.
    pub scheduled_operations: u64,
    /// Configured target arrival rate `R`, for rate-mode steps.
    pub target_throughput: Option<f64>,
}

impl StepRecord {
    pub fn assemble(inputs: StepInputs) -> Self {
        let bins = inputs.histogram.bins();
        let corrected_count = inputs.histogram.len();
        let raw = PercentileSet::from_histogram_ms(&inputs.histogram);
        let normalized = inputs.baseline_floor_ms.map(|floor| {
            // The floor carries one value per percentile point; the knee-relevant
            // subtraction is against p50, but every field is floored independently
            // against its own baseline percentile.
            PercentileSet {
                p50: (raw.p50 - floor.p50).max(0.0),
                p75: (raw.p75 - floor.p75).max(0.0),
                p90: (raw.p90 - floor.p90).max(0.0),
                p95: (raw.p95 - floor.p95).max(0.0),
                p99: (raw.p99 - floor.p99).max(0.0),
                p999: (raw.p999 - floor.p999).max(0.0),
                p9999: (raw.p9999 - floor.p9999).max(0.0),
                max: (raw.max - floor.max).max(0.0),
            }
        });

        let total_ops = inputs.success_count + inputs.error_count;
        let error_rate = if total_ops == 0 {
            0.0
        } else {
            inputs.error_count as f64 / total_ops as f64
        };
        let secs = inputs.duration.as_secs_f64();
        let throughput = if secs > 0.0 { total_ops as f64 / secs } else { 0.0 };
        let network_utilization = inputs.link_bps.and_then(|link_bps| {
            if link_bps <= 0.0 || secs <= 0.0 {
                None
            } else {
                let bits = (inputs.bytes_in + inputs.bytes_out) as f64 * 8.0;
                Some(bits / (link_bps * secs))
            }
        });

        StepRecord {
            step_value: inputs.step_value,
            duration: inputs.duration,
            success_count: inputs.success_count,
            error_count: inputs.error_count,
            bytes_in: inputs.bytes_in,
            bytes_out: inputs.bytes_out,
            raw,
            normalized,
            error_rate,
            throughput,
            network_utilization,
            telemetry: inputs.telemetry,
            rolling_rate: inputs.rolling_rate,
            sample_count: total_ops,
            corrected_count,
            scheduled_operations: inputs.scheduled_operations,
            target_throughput: inputs.target_throughput,
            bins,
        }
    }
}
