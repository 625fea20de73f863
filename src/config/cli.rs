//! Command-line surface
//!
//! A `clap`-derived `Cli` with `closed` and `rate` subcommands, option list grouped
//! into flat, comment-delimited sections (target, workload, transport, ramp, ...).
//! Cross-field validation lives in [`super::validator`], run once after CLI and TOML
//! are merged, not here.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "kneeload", about = "Locate the throughput/latency knee of a document database deployment")]
pub struct Cli {
    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Closed-loop: N worker tasks, concurrency ramps per the step plan.
    Closed(CommonArgs),
    /// Rate-driven: operations dispatched at a fixed arrival rate, rate ramps per
    /// the step plan.
    Rate(CommonArgs),
}

#[derive(Parser, Debug)]
pub struct CommonArgs {
    // === Target ===
    /// Base URL of the target deployment.
    #[arg(long)]
    pub url: String,
    /// Logical database/collection name on the target.
    #[arg(long)]
    pub database: String,

    // === Workload ===
    #[arg(long, value_enum, default_value = "mixed")]
    pub profile: ProfileArg,
    #[arg(long, default_value_t = 3.0)]
    pub reads: f64,
    #[arg(long, default_value_t = 1.0)]
    pub writes: f64,
    #[arg(long, default_value_t = 0.0)]
    pub updates: f64,
    #[arg(long, value_enum, default_value = "uniform")]
    pub distribution: DistributionArg,
    #[arg(long, default_value_t = 0.99)]
    pub zipf_theta: f64,
    #[arg(long, default_value_t = 0.20)]
    pub hot_portion: f64,
    #[arg(long, default_value = "1KB")]
    pub doc_size: String,

    // === Transport ===
    #[arg(long, value_enum, default_value = "client")]
    pub transport: TransportArg,
    #[arg(long, value_enum, default_value = "identity")]
    pub compression: CompressionArg,
    #[arg(long = "http-version", value_enum, default_value = "auto")]
    pub http_version: HttpVersionArg,
    #[arg(long)]
    pub strict_http_version: bool,

    // === Ramp ===
    /// "start..endxfactor", e.g. "8..512x2". Concurrency for `closed`, target rate
    /// for `rate`.
    #[arg(long = "concurrency", visible_alias = "step")]
    pub ramp: String,
    #[arg(long, default_value = "10s")]
    pub warmup: String,
    #[arg(long, default_value = "30s")]
    pub duration: String,

    // === Keyspace ===
    #[arg(long, default_value_t = 10_000)]
    pub preload: u64,
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    // === Knee / stop conditions ===
    #[arg(long, default_value = "5%")]
    pub max_errors: String,
    /// "dthr=<p>,dp95=<p>"
    #[arg(long, default_value = "dthr=5%,dp95=20%")]
    pub knee_rule: String,

    // === Network attribution ===
    #[arg(long)]
    pub link_mbps: Option<f64>,
    #[arg(long)]
    pub network_limited: bool,

    // === Telemetry ===
    #[arg(long)]
    pub snmp_enabled: bool,
    #[arg(long, value_enum, default_value = "minimal")]
    pub snmp_profile: SnmpProfileArg,
    #[arg(long, default_value_t = 161)]
    pub snmp_port: u16,
    #[arg(long, default_value = "250ms")]
    pub snmp_interval: String,
    #[arg(long, default_value = "1s")]
    pub snmp_timeout: String,
    #[arg(long)]
    pub rest_counters_enabled: bool,
    #[arg(long, default_value = "2s")]
    pub rest_counters_interval: String,

    // === Output ===
    #[arg(long = "out")]
    pub out_json: Option<String>,
    #[arg(long = "out-csv")]
    pub out_csv: Option<String>,
    #[arg(long, value_enum, default_value = "both")]
    pub latencies: LatenciesArg,
    #[arg(long)]
    pub verbose: bool,
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileArg {
    Mixed,
    Writes,
    Reads,
    QueryById,
    BulkWrites,
    RandomReads,
    ParameterizedEquality,
    Range,
    TextPrefix,
    TextSearch,
    TextSearchRare,
    TextSearchCommon,
    TextSearchMixed,
    VectorSearch,
    VectorSearchExact,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionArg {
    Uniform,
    Zipfian,
    Latest,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportArg {
    Raw,
    Client,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionArg {
    Identity,
    Gzip,
    Zstd,
    Br,
    Deflate,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersionArg {
    Auto,
    #[value(name = "1.1")]
    Http1_1,
    #[value(name = "2")]
    Http2,
    #[value(name = "3")]
    Http3,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnmpProfileArg {
    Minimal,
    Extended,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatenciesArg {
    Normalized,
    Raw,
    Both,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_closed_invocation() {
        let cli = Cli::parse_from([
            "kneeload",
            "closed",
            "--url",
            "http://localhost:8080",
            "--database",
            "bench",
            "--concurrency",
            "8..512x2",
        ]);
        match cli.mode {
            Mode::Closed(args) => {
                assert_eq!(args.url, "http://localhost:8080");
                assert_eq!(args.ramp, "8..512x2");
                assert_eq!(args.profile, ProfileArg::Mixed);
            }
            Mode::Rate(_) => panic!("expected closed mode"),
        }
    }

    #[test]
    fn rate_mode_accepts_the_step_alias() {
        let cli = Cli::parse_from([
            "kneeload",
            "rate",
            "--url",
            "http://localhost:8080",
            "--database",
            "bench",
            "--step",
            "1000..8000x2",
        ]);
        assert!(matches!(cli.mode, Mode::Rate(_)));
    }
}
