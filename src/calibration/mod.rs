//! Baseline latency calibration
//!
//! Before the ramp starts, `BaselineCalibrator` issues a handful of lightweight GETs
//! per endpoint, interleaved by randomized delays, and keeps the 5th-percentile
//! total/TTFB time per endpoint as a normalization floor.

use crate::transport::Transport;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_ATTEMPTS: usize = 32;
const DELAY_MEAN_MS: f64 = 150.0;
const DELAY_STDDEV_MS: f64 = 25.0;
const DELAY_MIN_MS: u64 = 20;
const DELAY_MAX_MS: u64 = 200;

/// Endpoints probed during calibration. Chosen to be cheap, side-effect-free reads.
const ENDPOINTS: &[&str] = &["/build/version", "/databases"];

#[derive(Debug, Clone, Copy)]
pub struct EndpointFloor {
    pub ttfb_p5_us: u64,
    pub total_p5_us: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CalibrationDiagnostics {
    pub total_attempts: usize,
    pub successful: usize,
    pub failed: usize,
    pub failure_reasons: HashMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct CalibrationReport {
    pub per_endpoint: HashMap<String, EndpointFloor>,
    pub diagnostics: CalibrationDiagnostics,
}

impl CalibrationReport {
    /// The run-wide baseline floor: the minimum total-time 5th-percentile observed
    /// across all endpoints that produced at least one sample. `None` when every
    /// endpoint failed — normalization is disabled for the run in that case.
    pub fn run_wide_floor_us(&self) -> Option<u64> {
        self.per_endpoint.values().map(|f| f.total_p5_us).min()
    }
}

pub struct BaselineCalibrator<'a> {
    transport: &'a dyn Transport,
    attempts: usize,
}

impl<'a> BaselineCalibrator<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self {
            transport,
            attempts: DEFAULT_ATTEMPTS,
        }
    }

    pub async fn run(&self) -> CalibrationReport {
        let mut per_endpoint = HashMap::new();
        let mut diagnostics = CalibrationDiagnostics::default();
        let normal = Normal::new(DELAY_MEAN_MS, DELAY_STDDEV_MS).expect("fixed, valid normal parameters");
        let mut rng = rand::thread_rng();

        for &endpoint in ENDPOINTS {
            let mut ttfb_samples = Vec::with_capacity(self.attempts);
            let mut total_samples = Vec::with_capacity(self.attempts);

            for attempt in 0..self.attempts {
                diagnostics.total_attempts += 1;
                match self.transport.calibrate(endpoint).await {
                    Ok(sample) => {
                        diagnostics.successful += 1;
                        ttfb_samples.push(sample.ttfb_us);
                        total_samples.push(sample.total_us);
                    }
                    Err(e) => {
                        diagnostics.failed += 1;
                        *diagnostics.failure_reasons.entry(e.to_string()).or_insert(0) += 1;
                    }
                }

                if attempt + 1 < self.attempts {
                    let delay_ms = normal.sample(&mut rng).clamp(DELAY_MIN_MS as f64, DELAY_MAX_MS as f64);
                    tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
                }
            }

            if !total_samples.is_empty() {
                per_endpoint.insert(
                    endpoint.to_string(),
                    EndpointFloor {
                        ttfb_p5_us: percentile_5(&mut ttfb_samples),
                        total_p5_us: percentile_5(&mut total_samples),
                    },
                );
            }
        }

        CalibrationReport { per_endpoint, diagnostics }
    }
}

fn percentile_5(samples: &mut [u64]) -> u64 {
    samples.sort_unstable();
    let idx = ((samples.len() as f64) * 0.05).floor() as usize;
    samples[idx.min(samples.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{CalibrationSample, TransportResult};
    use crate::workload::Operation;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct AlwaysOk;

    #[async_trait]
    impl Transport for AlwaysOk {
        async fn execute(&self, _op: &Operation, _cancel: &CancellationToken) -> TransportResult {
            TransportResult::ok(0, 0)
        }
        async fn calibrate(&self, _path: &str) -> crate::error::Result<CalibrationSample> {
            Ok(CalibrationSample { ttfb_us: 1000, total_us: 2000 })
        }
        async fn put_document(&self, _id: u64, _payload: &[u8]) -> crate::error::Result<()> {
            Ok(())
        }
        async fn get_server_counters(&self) -> Option<String> {
            None
        }
        async fn validate(&self) -> crate::error::Result<()> {
            Ok(())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Transport for AlwaysFails {
        async fn execute(&self, _op: &Operation, _cancel: &CancellationToken) -> TransportResult {
            TransportResult::failed(0, "boom")
        }
        async fn calibrate(&self, _path: &str) -> crate::error::Result<CalibrationSample> {
            Err(crate::error::KneeError::Transport("unreachable".to_string()))
        }
        async fn put_document(&self, _id: u64, _payload: &[u8]) -> crate::error::Result<()> {
            Err(crate::error::KneeError::Transport("unreachable".to_string()))
        }
        async fn get_server_counters(&self) -> Option<String> {
            None
        }
        async fn validate(&self) -> crate::error::Result<()> {
            Err(crate::error::KneeError::Transport("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn successful_calibration_produces_a_floor_per_endpoint() {
        let transport = AlwaysOk;
        let mut calibrator = BaselineCalibrator::new(&transport);
        calibrator.attempts = 4;
        let report = calibrator.run().await;
        assert_eq!(report.per_endpoint.len(), ENDPOINTS.len());
        assert_eq!(report.run_wide_floor_us(), Some(2000));
        assert_eq!(report.diagnostics.failed, 0);
    }

    #[tokio::test]
    async fn all_endpoints_failing_disables_normalization() {
        let transport = AlwaysFails;
        let mut calibrator = BaselineCalibrator::new(&transport);
        calibrator.attempts = 2;
        let report = calibrator.run().await;
        assert!(report.per_endpoint.is_empty());
        assert_eq!(report.run_wide_floor_us(), None);
        assert_eq!(report.diagnostics.failed, ENDPOINTS.len() * 2);
    }

    #[test]
    fn percentile_5_of_a_sorted_run() {
        let mut samples: Vec<u64> = (1..=100).collect();
        assert_eq!(percentile_5(&mut samples), 5);
    }
}
