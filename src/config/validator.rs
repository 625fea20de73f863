//! Cross-field validation
//!
//! Runs once, after CLI/TOML assembly and before any network I/O, exactly the
//! teacher's `config::validator` placement. Each rule is a plain check against
//! `RunConfig`; violations are collected so a user gets every problem in one pass
//! instead of fixing flags one error at a time.

use super::RunConfig;
use anyhow::{bail, Result};

pub fn validate(cfg: &RunConfig) -> Result<()> {
    let mut problems = Vec::new();

    if cfg.url.trim().is_empty() {
        problems.push("url must not be empty".to_string());
    }
    if !cfg.url.starts_with("http://") && !cfg.url.starts_with("https://") {
        problems.push(format!("url must start with http:// or https://: {}", cfg.url));
    }
    if cfg.database.trim().is_empty() {
        problems.push("database must not be empty".to_string());
    }

    if cfg.plan.start == 0 {
        problems.push("ramp start must be at least 1".to_string());
    }
    if cfg.plan.end < cfg.plan.start {
        problems.push(format!("ramp end ({}) must be >= start ({})", cfg.plan.end, cfg.plan.start));
    }
    if cfg.plan.factor <= 1.0 {
        problems.push(format!("ramp factor must be > 1.0, got {}", cfg.plan.factor));
    }

    if cfg.doc_size_bytes == 0 {
        problems.push("doc-size must be greater than zero".to_string());
    }

    if cfg.mix.reads_pct + cfg.mix.writes_pct + cfg.mix.updates_pct != 100 {
        problems.push("mix weights must normalize to exactly 100".to_string());
    }

    if !(0.0..=1.0).contains(&cfg.knee.d_thr) {
        problems.push(format!("knee d_thr must be within [0,1], got {}", cfg.knee.d_thr));
    }
    if !(0.0..=1.0).contains(&cfg.knee.d_p95) {
        problems.push(format!("knee d_p95 must be within [0,1], got {}", cfg.knee.d_p95));
    }
    if !(0.0..=1.0).contains(&cfg.knee.max_err) {
        problems.push(format!("max-errors must be within [0,1], got {}", cfg.knee.max_err));
    }

    if cfg.network_limited && cfg.link_mbps.is_none() {
        problems.push("--network-limited requires --link-mbps".to_string());
    }
    if let Some(mbps) = cfg.link_mbps {
        if mbps <= 0.0 {
            problems.push(format!("link-mbps must be positive, got {mbps}"));
        }
    }

    if cfg.measurement.is_zero() {
        problems.push("duration must be greater than zero".to_string());
    }

    if cfg.telemetry.snmp_port == 0 {
        problems.push("snmp-port must be nonzero".to_string());
    }

    if let Some(path) = &cfg.output.csv_path {
        if path.trim().is_empty() {
            problems.push("--out-csv must not be an empty path".to_string());
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        bail!("invalid configuration:\n  - {}", problems.join("\n  - "))
    }
}
