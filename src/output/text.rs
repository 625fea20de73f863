//! Human-readable text output

use crate::summary::Summary;
use crate::util::time::{format_duration, format_rate};

/// Print a compact console summary: one line per step, then the knee/verdict line.
pub fn print_summary(summary: &Summary) {
    println!("═══════════════════════════════════════════════════════════");
    println!("                    KNEE RUN RESULTS");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!("Target:      {}/{}", summary.options.url, summary.options.database);
    println!("Profile:     {}", summary.options.profile);
    println!("Transport:   {} ({})", summary.options.transport, summary.client_compression);
    println!("HTTP:        {}", summary.effective_http_version);
    println!();

    if let Some(floor_us) = summary.calibration_floor_us {
        println!("Baseline floor: {}", format_duration(std::time::Duration::from_micros(floor_us)));
    } else {
        println!("Baseline floor: unavailable ({} calibration attempts failed)", summary.calibration_failed_attempts);
    }
    println!();

    println!("{:>12} {:>10} {:>9} {:>10} {:>10} {:>10}", "concurrency", "throughput", "err_rate", "p50", "p95", "p99");
    for step in &summary.steps {
        println!(
            "{:>12} {:>10} {:>9.2}% {:>10} {:>10} {:>10}",
            step.step_value,
            format_rate(step.throughput),
            step.error_rate * 100.0,
            format_duration(std::time::Duration::from_secs_f64(step.raw.p50 / 1000.0)),
            format_duration(std::time::Duration::from_secs_f64(step.raw.p95 / 1000.0)),
            format_duration(std::time::Duration::from_secs_f64(step.raw.p99 / 1000.0)),
        );
    }
    println!();

    match &summary.knee {
        Some(knee) => println!("Knee: concurrency={} reason=\"{}\"", knee.concurrency, knee.reason),
        None => println!("Knee: none (no steps completed)"),
    }
    println!("Verdict: {}", summary.verdict);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Verdict;
    use crate::calibration::{CalibrationDiagnostics, CalibrationReport};
    use crate::config::{
        CompressionMode, HttpVersionPref, KneeThresholds, LoadShape, MixWeights, OutputConfig, StepPlanSpec, TelemetryConfig,
        TransportKind,
    };
    use crate::distribution::DistributionKind;
    use crate::stats::{StepInputs, StepRecord};
    use crate::summary::SummaryInputs;
    use crate::telemetry::TelemetrySample;
    use crate::workload::ProfileKind;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn prints_without_panicking_on_a_populated_summary() {
        let cfg = crate::config::RunConfig {
            url: "https://target.example".to_string(),
            database: "bench".to_string(),
            profile: ProfileKind::ReadsOnly,
            mix: MixWeights {
                reads_pct: 100,
                writes_pct: 0,
                updates_pct: 0,
            },
            distribution: DistributionKind::Uniform,
            doc_size_bytes: 1024,
            transport: TransportKind::Raw,
            compression: CompressionMode::Identity,
            http_version: HttpVersionPref::Auto,
            strict_http_version: false,
            shape: LoadShape::Closed,
            plan: StepPlanSpec {
                start: 8,
                end: 16,
                factor: 2.0,
            },
            warmup: Duration::from_secs(1),
            measurement: Duration::from_secs(1),
            preload: 0,
            seed: 1,
            knee: KneeThresholds::default(),
            link_mbps: None,
            network_limited: false,
            telemetry: TelemetryConfig::default(),
            output: OutputConfig::default(),
            config_path: None,
        };
        let step = StepRecord::assemble(StepInputs {
            step_value: 8,
            duration: Duration::from_secs(1),
            success_count: 100,
            error_count: 0,
            bytes_in: 0,
            bytes_out: 0,
            histogram: crate::stats::histogram::LatencyHistogram::new_empty(),
            baseline_floor_ms: None,
            link_bps: None,
            telemetry: TelemetrySample::default(),
            rolling_rate: None,
            scheduled_operations: 0,
            target_throughput: None,
        });
        let calibration = CalibrationReport {
            per_endpoint: HashMap::new(),
            diagnostics: CalibrationDiagnostics::default(),
        };
        let summary = Summary::assemble(SummaryInputs {
            cfg: &cfg,
            steps: vec![step],
            knee: None,
            verdict: Verdict::Unknown,
            negotiated_http_version: HttpVersionPref::Http2,
            calibration: &calibration,
        });

        print_summary(&summary);
    }
}
