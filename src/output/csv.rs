//! CSV per-step output
//!
//! Hand-writes a header row plus one row per step, `writeln!` into a plain `File` —
//! no external CSV crate. The column set grows by one block of target-side fields
//! when SNMP telemetry was enabled for the run; the base columns are always present.

use crate::summary::Summary;
use crate::Result;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub struct CsvWriter {
    file: File,
    snmp_enabled: bool,
}

impl CsvWriter {
    pub fn create(path: &Path, snmp_enabled: bool) -> Result<Self> {
        let mut file =
            File::create(path).map_err(|e| crate::error::KneeError::Configuration(format!("creating {}: {e}", path.display())))?;
        write!(
            file,
            "concurrency,throughput,error_rate,bytes_in,bytes_out,p50_ms,p90_ms,p95_ms,p99_ms,p999_ms,max_ms,\
             p50_norm_ms,p95_norm_ms,network_utilization,client_cpu"
        )
        .map_err(io_err)?;
        if snmp_enabled {
            write!(
                file,
                ",target_machine_cpu,target_process_cpu,target_managed_mem_mib,target_unmanaged_mem_mib,\
                 target_io_read_ops_s,target_io_write_ops_s,target_request_rate"
            )
            .map_err(io_err)?;
        }
        writeln!(file).map_err(io_err)?;
        Ok(Self { file, snmp_enabled })
    }

    pub fn write_summary(&mut self, summary: &Summary) -> Result<()> {
        for step in &summary.steps {
            let p50_norm = step.normalized.map(|p| p.p50.to_string()).unwrap_or_default();
            let p95_norm = step.normalized.map(|p| p.p95.to_string()).unwrap_or_default();
            let network_utilization = step.network_utilization.map(|v| v.to_string()).unwrap_or_default();
            let client_cpu = step.telemetry.generator_cpu_utilization.map(|v| v.to_string()).unwrap_or_default();

            write!(
                self.file,
                "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
                step.step_value,
                step.throughput,
                step.error_rate,
                step.bytes_in,
                step.bytes_out,
                step.raw.p50,
                step.raw.p90,
                step.raw.p95,
                step.raw.p99,
                step.raw.p999,
                step.raw.max,
                p50_norm,
                p95_norm,
                network_utilization,
                client_cpu,
            )
            .map_err(io_err)?;

            if self.snmp_enabled {
                let target = step.telemetry.target;
                write!(
                    self.file,
                    ",{},{},{},{},{},{},{}",
                    opt(target.and_then(|t| t.machine_cpu)),
                    opt(target.and_then(|t| t.process_cpu)),
                    opt(target.and_then(|t| t.managed_memory_mib)),
                    opt(target.and_then(|t| t.unmanaged_memory_mib)),
                    opt(target.and_then(|t| t.io_read_ops_per_sec)),
                    opt(target.and_then(|t| t.io_write_ops_per_sec)),
                    opt(target.and_then(|t| t.request_rate)),
                )
                .map_err(io_err)?;
            }

            writeln!(self.file).map_err(io_err)?;
        }
        Ok(())
    }
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn io_err(e: std::io::Error) -> crate::error::KneeError {
    crate::error::KneeError::Configuration(format!("writing CSV output: {e}"))
}

/// Convenience entry point mirroring [`crate::output::json::write`].
pub fn write(summary: &Summary, path: &Path, snmp_enabled: bool) -> Result<()> {
    let mut writer = CsvWriter::create(path, snmp_enabled)?;
    writer.write_summary(summary)
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

    fn sample_step(value: u64) -> StepRecord {
        StepRecord::assemble(StepInputs {
            step_value: value,
            duration: Duration::from_secs(1),
            success_count: 100,
            error_count: 0,
            bytes_in: 1000,
            bytes_out: 500,
            histogram: crate::stats::histogram::LatencyHistogram::new_empty(),
            baseline_floor_ms: None,
            link_bps: None,
            telemetry: TelemetrySample::default(),
            rolling_rate: None,
            scheduled_operations: 0,
            target_throughput: None,
        })
    }

    fn base_config() -> crate::config::RunConfig {
        crate::config::RunConfig {
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
        }
    }

    #[test]
    fn writes_a_header_and_one_row_per_step() {
        let cfg = base_config();
        let calibration = CalibrationReport {
            per_endpoint: HashMap::new(),
            diagnostics: CalibrationDiagnostics::default(),
        };
        let summary = Summary::assemble(SummaryInputs {
            cfg: &cfg,
            steps: vec![sample_step(8), sample_step(16)],
            knee: None,
            verdict: Verdict::Unknown,
            negotiated_http_version: HttpVersionPref::Http2,
            calibration: &calibration,
        });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steps.csv");
        write(&summary, &path, false).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3); // header + 2 steps
        assert!(lines[0].starts_with("concurrency,throughput"));
        assert!(!lines[0].contains("target_machine_cpu"));
    }

    #[test]
    fn snmp_enabled_adds_target_columns() {
        let cfg = base_config();
        let calibration = CalibrationReport {
            per_endpoint: HashMap::new(),
            diagnostics: CalibrationDiagnostics::default(),
        };
        let summary = Summary::assemble(SummaryInputs {
            cfg: &cfg,
            steps: vec![sample_step(8)],
            knee: None,
            verdict: Verdict::Unknown,
            negotiated_http_version: HttpVersionPref::Http2,
            calibration: &calibration,
        });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steps_snmp.csv");
        write(&summary, &path, true).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.lines().next().unwrap().contains("target_machine_cpu"));
    }
}
