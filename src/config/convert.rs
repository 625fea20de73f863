//! CLI → `RunConfig` conversion
//!
//! Plain functions turning parsed CLI values (plus the unit parsers in
//! [`super::units`]) into the enums and composite structs `RunConfig` is built from.

use super::cli::{
    CompressionArg, DistributionArg, HttpVersionArg, LatenciesArg, Mode, ProfileArg, SnmpProfileArg, TransportArg,
};
use super::units::{parse_duration_secs, parse_percent, parse_size, parse_time_us};
use super::{
    CompressionMode, HttpVersionPref, KneeThresholds, LatenciesMode, LoadShape, MixWeights, OutputConfig, RunConfig,
    SnmpProfile, StepPlanSpec, TelemetryConfig, TransportKind,
};
use crate::distribution::DistributionKind;
use crate::workload::{ProfileKind, TextSearchVariant};
use anyhow::{bail, Context, Result};
use std::time::Duration;

pub fn from_cli(mode: Mode) -> Result<RunConfig> {
    let (shape, args) = match mode {
        Mode::Closed(args) => (LoadShape::Closed, args),
        Mode::Rate(args) => (LoadShape::Rate, args),
    };

    let plan = parse_ramp(&args.ramp)?;
    let knee = parse_knee_rule(&args.knee_rule, parse_percent(&args.max_errors)? / 100.0)?;

    Ok(RunConfig {
        url: args.url,
        database: args.database,
        profile: convert_profile(args.profile),
        mix: MixWeights::normalize(args.reads, args.writes, args.updates),
        distribution: convert_distribution(args.distribution, args.zipf_theta, args.hot_portion),
        doc_size_bytes: parse_size(&args.doc_size)? as usize,
        transport: convert_transport(args.transport),
        compression: convert_compression(args.compression),
        http_version: convert_http_version(args.http_version),
        strict_http_version: args.strict_http_version,
        shape,
        plan,
        warmup: Duration::from_secs(parse_duration_secs(&args.warmup)?),
        measurement: Duration::from_secs(parse_duration_secs(&args.duration)?),
        preload: args.preload,
        seed: args.seed,
        knee,
        link_mbps: args.link_mbps,
        network_limited: args.network_limited,
        telemetry: TelemetryConfig {
            snmp_enabled: args.snmp_enabled,
            snmp_profile: convert_snmp_profile(args.snmp_profile),
            snmp_port: args.snmp_port,
            snmp_interval: Duration::from_micros(parse_time_us(&args.snmp_interval)?),
            snmp_timeout: Duration::from_micros(parse_time_us(&args.snmp_timeout)?),
            rest_counters_enabled: args.rest_counters_enabled,
            rest_counters_interval: Duration::from_micros(parse_time_us(&args.rest_counters_interval)?),
        },
        output: OutputConfig {
            json_path: args.out_json,
            csv_path: args.out_csv,
            latencies: convert_latencies(args.latencies),
            verbose: args.verbose,
        },
        config_path: args.config,
    })
}

fn convert_profile(arg: ProfileArg) -> ProfileKind {
    match arg {
        ProfileArg::Mixed => ProfileKind::Mixed,
        ProfileArg::Writes => ProfileKind::WritesOnly,
        ProfileArg::Reads => ProfileKind::ReadsOnly,
        ProfileArg::QueryById => ProfileKind::QueryById,
        ProfileArg::BulkWrites => ProfileKind::BulkWrites,
        ProfileArg::RandomReads => ProfileKind::RandomReadsTwoCollections,
        ProfileArg::ParameterizedEquality => ProfileKind::ParameterizedEquality,
        ProfileArg::Range => ProfileKind::ParameterizedRange,
        ProfileArg::TextPrefix => ProfileKind::TextPrefix,
        ProfileArg::TextSearch => ProfileKind::FullText(TextSearchVariant::Common),
        ProfileArg::TextSearchRare => ProfileKind::FullText(TextSearchVariant::Rare),
        ProfileArg::TextSearchCommon => ProfileKind::FullText(TextSearchVariant::Common),
        ProfileArg::TextSearchMixed => ProfileKind::FullText(TextSearchVariant::Mixed),
        ProfileArg::VectorSearch => ProfileKind::VectorSearch { exact: false },
        ProfileArg::VectorSearchExact => ProfileKind::VectorSearch { exact: true },
    }
}

fn convert_distribution(arg: DistributionArg, zipf_theta: f64, hot_portion: f64) -> DistributionKind {
    match arg {
        DistributionArg::Uniform => DistributionKind::Uniform,
        DistributionArg::Zipfian => DistributionKind::Zipfian { theta: zipf_theta },
        DistributionArg::Latest => DistributionKind::Latest { hot_portion },
    }
}

fn convert_transport(arg: TransportArg) -> TransportKind {
    match arg {
        TransportArg::Raw => TransportKind::Raw,
        TransportArg::Client => TransportKind::Client,
    }
}

fn convert_compression(arg: CompressionArg) -> CompressionMode {
    match arg {
        CompressionArg::Identity => CompressionMode::Identity,
        CompressionArg::Gzip => CompressionMode::Gzip,
        CompressionArg::Zstd => CompressionMode::Zstd,
        CompressionArg::Br => CompressionMode::Brotli,
        CompressionArg::Deflate => CompressionMode::Deflate,
    }
}

fn convert_http_version(arg: HttpVersionArg) -> HttpVersionPref {
    match arg {
        HttpVersionArg::Auto => HttpVersionPref::Auto,
        HttpVersionArg::Http1_1 => HttpVersionPref::Http1_1,
        HttpVersionArg::Http2 => HttpVersionPref::Http2,
        HttpVersionArg::Http3 => HttpVersionPref::Http3,
    }
}

fn convert_snmp_profile(arg: SnmpProfileArg) -> SnmpProfile {
    match arg {
        SnmpProfileArg::Minimal => SnmpProfile::Minimal,
        SnmpProfileArg::Extended => SnmpProfile::Extended,
    }
}

fn convert_latencies(arg: LatenciesArg) -> LatenciesMode {
    match arg {
        LatenciesArg::Normalized => LatenciesMode::Normalized,
        LatenciesArg::Raw => LatenciesMode::Raw,
        LatenciesArg::Both => LatenciesMode::Both,
    }
}

/// Parse "start..endxfactor", e.g. "8..512x2" or "1000..8000x2.0".
fn parse_ramp(s: &str) -> Result<StepPlanSpec> {
    let (range, factor_str) = s.split_once('x').with_context(|| format!("ramp spec missing 'x<factor>': {s}"))?;
    let (start_str, end_str) = range.split_once("..").with_context(|| format!("ramp spec missing '..': {s}"))?;
    let start: u64 = start_str.trim().parse().with_context(|| format!("invalid ramp start: {s}"))?;
    let end: u64 = end_str.trim().parse().with_context(|| format!("invalid ramp end: {s}"))?;
    let factor: f64 = factor_str.trim().parse().with_context(|| format!("invalid ramp factor: {s}"))?;
    Ok(StepPlanSpec { start, end, factor })
}

/// Parse "dthr=<p>,dp95=<p>", e.g. "dthr=5%,dp95=20%".
fn parse_knee_rule(s: &str, max_err: f64) -> Result<KneeThresholds> {
    let mut d_thr = None;
    let mut d_p95 = None;
    for part in s.split(',') {
        let (key, value) = part.split_once('=').with_context(|| format!("invalid knee-rule term: {part}"))?;
        match key.trim() {
            "dthr" => d_thr = Some(parse_percent(value)? / 100.0),
            "dp95" => d_p95 = Some(parse_percent(value)? / 100.0),
            other => bail!("unknown knee-rule key: {other}"),
        }
    }
    let defaults = KneeThresholds::default();
    Ok(KneeThresholds {
        d_thr: d_thr.unwrap_or(defaults.d_thr),
        d_p95: d_p95.unwrap_or(defaults.d_p95),
        max_err: max_err.max(defaults.max_err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_ramp_spec() {
        let plan = parse_ramp("8..512x2").unwrap();
        assert_eq!(plan.start, 8);
        assert_eq!(plan.end, 512);
        assert_eq!(plan.factor, 2.0);
    }

    #[test]
    fn parses_a_knee_rule_and_takes_the_max_error_ceiling() {
        let knee = parse_knee_rule("dthr=5%,dp95=20%", 0.10).unwrap();
        assert_eq!(knee.d_thr, 0.05);
        assert_eq!(knee.d_p95, 0.20);
        assert_eq!(knee.max_err, 0.10);
    }

    #[test]
    fn knee_rule_enforces_the_five_percent_floor() {
        let knee = parse_knee_rule("dthr=5%,dp95=20%", 0.01).unwrap();
        assert_eq!(knee.max_err, 0.05);
    }

    #[test]
    fn rejects_malformed_ramp_specs() {
        assert!(parse_ramp("8-512x2").is_err());
        assert!(parse_ramp("8..512").is_err());
    }
}
