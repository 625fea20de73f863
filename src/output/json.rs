//! JSON summary output

use crate::summary::Summary;
use crate::Result;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Write the full summary document as pretty-printed JSON.
pub fn write(summary: &Summary, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| crate::error::KneeError::Configuration(format!("creating {}: {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, summary)
        .map_err(|e| crate::error::KneeError::Configuration(format!("serializing summary to {}: {e}", path.display())))?;
    Ok(())
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
    use crate::summary::SummaryInputs;
    use crate::workload::ProfileKind;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn writes_valid_json_to_disk() {
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
        let calibration = CalibrationReport {
            per_endpoint: HashMap::new(),
            diagnostics: CalibrationDiagnostics::default(),
        };
        let summary = Summary::assemble(SummaryInputs {
            cfg: &cfg,
            steps: Vec::new(),
            knee: None,
            verdict: Verdict::Unknown,
            negotiated_http_version: HttpVersionPref::Http2,
            calibration: &calibration,
        });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write(&summary, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed["verdict"], "unknown");
        assert!(parsed["histograms"].is_array());
    }
}
