//! Run configuration
//!
//! `RunConfig` is the single validated, immutable value the rest of the crate runs
//! from. It is assembled by layering an optional TOML file under CLI flags (CLI
//! wins on any field both supply) and then checked by [`validator::validate`] before
//! any network I/O happens. The validation layer is split from parsing so cross-field
//! checks run once, in one place, after CLI and TOML are merged.

pub mod cli;
pub mod convert;
pub mod toml_config;
pub mod units;
pub mod validator;

use crate::distribution::DistributionKind;
use crate::workload::ProfileKind;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadShape {
    Closed,
    Rate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Raw,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMode {
    Identity,
    Gzip,
    Brotli,
    Deflate,
    Zstd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersionPref {
    Auto,
    Http1_1,
    Http2,
    Http3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatenciesMode {
    Normalized,
    Raw,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnmpProfile {
    Minimal,
    Extended,
}

/// A geometric (start, end, factor) ramp specification, shared by the closed-loop
/// concurrency ramp and the rate-mode target-rate ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPlanSpec {
    pub start: u64,
    pub end: u64,
    pub factor: f64,
}

impl StepPlanSpec {
    /// Expand into the strictly increasing sequence `next = max(⌈current·factor⌉,
    /// current+1)`, terminating at or past `end`.
    pub fn expand(&self) -> Vec<u64> {
        let mut values = vec![self.start];
        let mut current = self.start;
        while current < self.end {
            let scaled = (current as f64 * self.factor).ceil() as u64;
            current = scaled.max(current + 1);
            values.push(current);
        }
        values
    }
}

/// Mixed-profile read/write/update weights, normalized to integer percentages
/// summing to exactly 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixWeights {
    pub reads_pct: u32,
    pub writes_pct: u32,
    pub updates_pct: u32,
}

impl MixWeights {
    /// Normalize arbitrary non-negative weights to integer percentages summing to
    /// 100, distributing the rounding remainder to the weights with the largest
    /// fractional part (largest-remainder method).
    pub fn normalize(reads: f64, writes: f64, updates: f64) -> Self {
        let total = reads + writes + updates;
        if total <= 0.0 {
            return Self {
                reads_pct: 100,
                writes_pct: 0,
                updates_pct: 0,
            };
        }
        let raw = [reads / total * 100.0, writes / total * 100.0, updates / total * 100.0];
        let mut floors = [raw[0].floor(), raw[1].floor(), raw[2].floor()];
        let mut remainder = 100 - floors.iter().sum::<f64>() as i64;

        let mut fractional: Vec<(usize, f64)> = raw.iter().enumerate().map(|(i, v)| (i, v - v.floor())).collect();
        fractional.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

        let mut idx = 0;
        while remainder > 0 {
            floors[fractional[idx % fractional.len()].0] += 1.0;
            remainder -= 1;
            idx += 1;
        }

        Self {
            reads_pct: floors[0] as u32,
            writes_pct: floors[1] as u32,
            updates_pct: floors[2] as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KneeThresholds {
    /// Minimum required throughput growth fraction step-over-step, below which the
    /// knee rule may fire (e.g. 0.05 for 5%).
    pub d_thr: f64,
    /// Minimum p95 growth fraction step-over-step, above which the knee rule may
    /// fire.
    pub d_p95: f64,
    /// Error-rate ceiling beyond which the ramp stops.
    pub max_err: f64,
}

impl Default for KneeThresholds {
    fn default() -> Self {
        Self {
            d_thr: 0.05,
            d_p95: 0.20,
            max_err: 0.05,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub snmp_enabled: bool,
    pub snmp_profile: SnmpProfile,
    pub snmp_port: u16,
    pub snmp_interval: Duration,
    pub snmp_timeout: Duration,
    pub rest_counters_enabled: bool,
    pub rest_counters_interval: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            snmp_enabled: false,
            snmp_profile: SnmpProfile::Minimal,
            snmp_port: 161,
            snmp_interval: crate::telemetry::snmp::DEFAULT_INTERVAL,
            snmp_timeout: crate::telemetry::snmp::DEFAULT_TIMEOUT,
            rest_counters_enabled: false,
            rest_counters_interval: crate::telemetry::rest_counters::DEFAULT_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub json_path: Option<String>,
    pub csv_path: Option<String>,
    pub latencies: LatenciesMode,
    pub verbose: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_path: None,
            csv_path: None,
            latencies: LatenciesMode::Both,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub url: String,
    pub database: String,
    pub profile: ProfileKind,
    pub mix: MixWeights,
    pub distribution: DistributionKind,
    pub doc_size_bytes: usize,
    pub transport: TransportKind,
    pub compression: CompressionMode,
    pub http_version: HttpVersionPref,
    pub strict_http_version: bool,
    pub shape: LoadShape,
    pub plan: StepPlanSpec,
    pub warmup: Duration,
    pub measurement: Duration,
    pub preload: u64,
    pub seed: u64,
    pub knee: KneeThresholds,
    pub link_mbps: Option<f64>,
    pub network_limited: bool,
    pub telemetry: TelemetryConfig,
    pub output: OutputConfig,
    pub config_path: Option<String>,
}
