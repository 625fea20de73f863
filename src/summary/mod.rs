//! Summary assembly
//!
//! Folds everything a run produced — the resolved options, the step sequence, the
//! knee analysis, protocol/compression negotiation outcomes, and the baseline
//! calibration report — into the single [`Summary`] document the output layer
//! serializes. Pure, synchronous data-shaping, same as [`crate::stats::aggregator`].

use crate::analyzer::{Knee, Verdict};
use crate::calibration::CalibrationReport;
use crate::config::{CompressionMode, HttpVersionPref, RunConfig};
use crate::stats::{HistogramBin, StepRecord};

#[derive(Debug, Clone, serde::Serialize)]
pub struct SummaryOptions {
    pub url: String,
    pub database: String,
    pub profile: String,
    pub transport: String,
    pub shape: String,
    pub concurrency_start: u64,
    pub concurrency_end: u64,
    pub concurrency_factor: f64,
    pub seed: u64,
}

impl SummaryOptions {
    fn from_config(cfg: &RunConfig) -> Self {
        Self {
            url: cfg.url.clone(),
            database: cfg.database.clone(),
            profile: format!("{:?}", cfg.profile),
            transport: match cfg.transport {
                crate::config::TransportKind::Raw => "raw".to_string(),
                crate::config::TransportKind::Client => "client".to_string(),
            },
            shape: match cfg.shape {
                crate::config::LoadShape::Closed => "closed".to_string(),
                crate::config::LoadShape::Rate => "rate".to_string(),
            },
            concurrency_start: cfg.plan.start,
            concurrency_end: cfg.plan.end,
            concurrency_factor: cfg.plan.factor,
            seed: cfg.seed,
        }
    }
}

fn compression_name(mode: CompressionMode) -> &'static str {
    match mode {
        CompressionMode::Identity => "identity",
        CompressionMode::Gzip => "gzip",
        CompressionMode::Brotli => "br",
        CompressionMode::Deflate => "deflate",
        CompressionMode::Zstd => "zstd",
    }
}

fn http_version_name(version: HttpVersionPref) -> &'static str {
    match version {
        HttpVersionPref::Auto => "auto",
        HttpVersionPref::Http1_1 => "1.1",
        HttpVersionPref::Http2 => "2",
        HttpVersionPref::Http3 => "3",
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SummaryKnee {
    pub step_index: usize,
    pub concurrency: u64,
    pub reason: String,
}

impl From<&Knee> for SummaryKnee {
    fn from(knee: &Knee) -> Self {
        Self {
            step_index: knee.step_index,
            concurrency: knee.step_value,
            reason: knee.reason.clone(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Summary {
    pub options: SummaryOptions,
    pub steps: Vec<StepRecord>,
    /// Per-step latency histogram bins, in step order — one entry per `steps[i]`,
    /// kept alongside the derived percentiles for lossless reconstruction.
    pub histograms: Vec<Vec<HistogramBin>>,
    pub knee: Option<SummaryKnee>,
    pub verdict: String,
    pub client_compression: String,
    pub effective_http_version: String,
    pub calibration_floor_us: Option<u64>,
    pub calibration_failed_attempts: usize,
}

pub struct SummaryInputs<'a> {
    pub cfg: &'a RunConfig,
    pub steps: Vec<StepRecord>,
    pub knee: Option<Knee>,
    pub verdict: Verdict,
    pub negotiated_http_version: HttpVersionPref,
    pub calibration: &'a CalibrationReport,
}

impl Summary {
    pub fn assemble(inputs: SummaryInputs<'_>) -> Self {
        let histograms = inputs.steps.iter().map(|step| step.bins.clone()).collect();
        Summary {
            options: SummaryOptions::from_config(inputs.cfg),
            steps: inputs.steps,
            histograms,
            knee: inputs.knee.as_ref().map(SummaryKnee::from),
            verdict: inputs.verdict.as_str().to_string(),
            client_compression: compression_name(inputs.cfg.compression).to_string(),
            effective_http_version: http_version_name(inputs.negotiated_http_version).to_string(),
            calibration_floor_us: inputs.calibration.run_wide_floor_us(),
            calibration_failed_attempts: inputs.calibration.diagnostics.failed,
        }
    }
}
