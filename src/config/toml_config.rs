//! Optional TOML overlay
//!
//! A run can be driven entirely by flags, but repeated runs against the same
//! deployment are usually easier to keep in a file. `load` reads the file named by
//! `--config`, if any, and `apply` layers its values under the already-parsed CLI
//! args — a field set on the command line always wins over the file, matching the
//! teacher's own TOML-overlay behavior in `config::toml`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileConfig {
    pub url: Option<String>,
    pub database: Option<String>,
    pub profile: Option<String>,
    pub reads: Option<f64>,
    pub writes: Option<f64>,
    pub updates: Option<f64>,
    pub distribution: Option<String>,
    pub zipf_theta: Option<f64>,
    pub hot_portion: Option<f64>,
    pub doc_size: Option<String>,
    pub transport: Option<String>,
    pub compression: Option<String>,
    pub http_version: Option<String>,
    pub concurrency: Option<String>,
    pub warmup: Option<String>,
    pub duration: Option<String>,
    pub preload: Option<u64>,
    pub seed: Option<u64>,
    pub max_errors: Option<String>,
    pub knee_rule: Option<String>,
    pub link_mbps: Option<f64>,
    pub snmp_enabled: Option<bool>,
    pub snmp_profile: Option<String>,
    pub snmp_port: Option<u16>,
    pub rest_counters_enabled: Option<bool>,
    pub out_json: Option<String>,
    pub out_csv: Option<String>,
}

pub fn load(path: &Path) -> Result<FileConfig> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
}

/// Fill in any `CommonArgs` string/bool field still at its clap default from the
/// file, without ever overwriting a value the user actually passed on the command
/// line. Only the handful of fields worth setting from a file are covered; the
/// remainder (e.g. `--verbose`) are CLI-only by convention.
pub fn apply(file: &FileConfig, args: &mut super::cli::CommonArgs) {
    if args.url.is_empty() {
        if let Some(v) = &file.url {
            args.url = v.clone();
        }
    }
    if args.database.is_empty() {
        if let Some(v) = &file.database {
            args.database = v.clone();
        }
    }
    if let (true, Some(v)) = (args.doc_size == "1KB", &file.doc_size) {
        args.doc_size = v.clone();
    }
    if let (true, Some(v)) = (args.warmup == "10s", &file.warmup) {
        args.warmup = v.clone();
    }
    if let (true, Some(v)) = (args.duration == "30s", &file.duration) {
        args.duration = v.clone();
    }
    if let (true, Some(v)) = (args.max_errors == "5%", &file.max_errors) {
        args.max_errors = v.clone();
    }
    if let (true, Some(v)) = (args.knee_rule == "dthr=5%,dp95=20%", &file.knee_rule) {
        args.knee_rule = v.clone();
    }
    if args.out_json.is_none() {
        args.out_json = file.out_json.clone();
    }
    if args.out_csv.is_none() {
        args.out_csv = file.out_csv.clone();
    }
    if args.link_mbps.is_none() {
        args.link_mbps = file.link_mbps;
    }
    if let Some(v) = file.preload {
        if args.preload == 10_000 {
            args.preload = v;
        }
    }
    if let Some(v) = file.snmp_port {
        if args.snmp_port == 161 {
            args.snmp_port = v;
        }
    }
    if !args.snmp_enabled {
        args.snmp_enabled = file.snmp_enabled.unwrap_or(false);
    }
    if !args.rest_counters_enabled {
        args.rest_counters_enabled = file.rest_counters_enabled.unwrap_or(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parses_a_minimal_toml_document() {
        let raw = r#"
            url = "http://localhost:8080"
            database = "bench"
            reads = 3.0
        "#;
        let cfg: FileConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(cfg.reads, Some(3.0));
        assert_eq!(cfg.writes, None);
    }

    #[test]
    fn file_values_do_not_override_explicit_cli_flags() {
        let file = FileConfig {
            doc_size: Some("4KB".to_string()),
            ..Default::default()
        };
        let mut args = super::super::cli::Cli::parse_from([
            "kneeload",
            "closed",
            "--url",
            "http://localhost:8080",
            "--database",
            "bench",
            "--concurrency",
            "8..512x2",
            "--doc-size",
            "16KB",
        ]);
        let super::super::cli::Mode::Closed(ref mut common) = args.mode else {
            panic!("expected closed mode")
        };
        apply(&file, common);
        assert_eq!(common.doc_size, "16KB");
    }

    #[test]
    fn file_values_fill_in_unset_fields() {
        let file = FileConfig {
            doc_size: Some("4KB".to_string()),
            ..Default::default()
        };
        let mut args = super::super::cli::Cli::parse_from([
            "kneeload",
            "closed",
            "--url",
            "http://localhost:8080",
            "--database",
            "bench",
            "--concurrency",
            "8..512x2",
        ]);
        let super::super::cli::Mode::Closed(ref mut common) = args.mode else {
            panic!("expected closed mode")
        };
        apply(&file, common);
        assert_eq!(common.doc_size, "4KB");
    }
}
