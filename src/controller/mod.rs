//! Step controller
//!
//! Drives one ramp from start to end: for each step value, run a discarded warmup
//! pass, reset the recorder, run the measured pass, assemble a `StepRecord`, and
//! decide whether to keep ramping. Stops early once a step's error rate blows past
//! the configured ceiling.
//!
//! Telemetry pollers run continuously for the whole ramp rather than being
//! restarted every step — reading `.current()` right after a step's measurement
//! window is equivalent to "start at measurement begin, stop at measurement end"
//! for a poller whose cadence is much shorter than a step, and it avoids tearing
//! down and recreating the SNMP/REST adapters every step (see `DESIGN.md`).

use crate::calibration::CalibrationReport;
use crate::config::RunConfig;
use crate::generator::{closed::ClosedLoopGenerator, rate::RateLoadGenerator, MeasurementOutcome};
use crate::stats::histogram::PercentileSet;
use crate::stats::{LatencyRecorder, StepInputs, StepRecord};
use crate::telemetry::cpu;
use crate::telemetry::rest_counters::RestCountersAdapter;
use crate::telemetry::snmp::SnmpAdapter;
use crate::telemetry::{Poller, TargetSample, TelemetrySample};
use crate::transport::Transport;
use crate::workload::WorkloadContext;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const CPU_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct StepController {
    cfg: Arc<RunConfig>,
    transport: Arc<dyn Transport>,
    ctx: Arc<WorkloadContext>,
    recorder: LatencyRecorder,
    cpu_poller: Poller<f64>,
    rest_poller: Option<Poller<TargetSample>>,
    snmp_poller: Option<Poller<TargetSample>>,
    baseline_floor_ms: Option<PercentileSet>,
}

impl StepController {
    pub fn new(
        cfg: Arc<RunConfig>,
        transport: Arc<dyn Transport>,
        ctx: Arc<WorkloadContext>,
        calibration: &CalibrationReport,
        rest_adapter: Option<RestCountersAdapter>,
        snmp_adapter: Option<SnmpAdapter>,
    ) -> Self {
        let baseline_floor_ms = calibration.run_wide_floor_us().map(|us| {
            let floor_ms = us as f64 / 1000.0;
            PercentileSet {
                p50: floor_ms,
                p75: floor_ms,
                p90: floor_ms,
                p95: floor_ms,
                p99: floor_ms,
                p999: floor_ms,
                p9999: floor_ms,
                max: floor_ms,
            }
        });

        let cpu_poller = cpu::spawn(CPU_POLL_INTERVAL);
        let rest_poller = rest_adapter.map(|a| a.spawn(cfg.telemetry.rest_counters_interval));
        let snmp_poller = snmp_adapter.map(|a| a.spawn(cfg.telemetry.snmp_interval));

        Self {
            cfg,
            transport,
            ctx,
            recorder: LatencyRecorder::new(),
            cpu_poller,
            rest_poller,
            snmp_poller,
            baseline_floor_ms,
        }
    }

    /// Run the full ramp, returning one `StepRecord` per completed step.
    pub async fn run(&mut self) -> Vec<StepRecord> {
        let plan = self.cfg.plan.expand();
        let mut records = Vec::with_capacity(plan.len());

        for &value in &plan {
            let span = tracing::info_span!("step", value);
            let _enter = span.enter();

            self.warmup(value).await;
            self.recorder.snapshot_and_reset(); // discard anything touched during warmup

            let outcome = self.measure(value).await;
            let histogram = self.recorder.snapshot_and_reset();
            let telemetry = self.current_telemetry();

            let target_throughput = match self.cfg.shape {
                crate::config::LoadShape::Rate => Some(value as f64),
                crate::config::LoadShape::Closed => None,
            };

            let record = StepRecord::assemble(StepInputs {
                step_value: value,
                duration: self.cfg.measurement,
                success_count: outcome.success_count,
                error_count: outcome.error_count,
                bytes_in: outcome.bytes_in,
                bytes_out: outcome.bytes_out,
                histogram,
                baseline_floor_ms: self.baseline_floor_ms,
                link_bps: self.cfg.link_mbps.map(|mbps| mbps * 1_000_000.0),
                telemetry,
                rolling_rate: outcome.rolling_rate,
                scheduled_operations: outcome.scheduled_count,
                target_throughput,
            });

            let error_rate = record.error_rate;
            records.push(record);

            let ceiling = self.cfg.knee.max_err.max(0.05);
            if error_rate > ceiling {
                warn!(error_rate, ceiling, "stopping ramp: error rate exceeded ceiling");
                break;
            }
            info!(value, error_rate, "step complete");
        }

        self.shutdown();
        records
    }

    fn shutdown(&mut self) {
        self.cpu_poller.stop();
        if let Some(poller) = self.rest_poller.as_mut() {
            poller.stop();
        }
        if let Some(poller) = self.snmp_poller.as_mut() {
            poller.stop();
        }
    }

    fn current_telemetry(&self) -> TelemetrySample {
        let rest = self.rest_poller.as_ref().and_then(Poller::current);
        let snmp = self.snmp_poller.as_ref().and_then(Poller::current);
        TelemetrySample {
            generator_cpu_utilization: self.cpu_poller.current(),
            target: TelemetrySample::merge_target(rest, snmp),
        }
    }

    async fn warmup(&mut self, value: u64) {
        let warmup_profile = self.cfg.profile.warmup_variant();
        match self.cfg.shape {
            crate::config::LoadShape::Closed => {
                ClosedLoopGenerator::run(
                    value,
                    self.cfg.warmup,
                    Arc::clone(&self.transport),
                    Arc::clone(&self.ctx),
                    warmup_profile,
                    None,
                )
                .await;
            }
            crate::config::LoadShape::Rate => {
                RateLoadGenerator::run(
                    value as f64,
                    self.cfg.warmup,
                    Arc::clone(&self.transport),
                    Arc::clone(&self.ctx),
                    warmup_profile,
                    None,
                )
                .await;
            }
        }
    }

    async fn measure(&mut self, value: u64) -> MeasurementOutcome {
        let recorder_handle = self.recorder.handle();
        match self.cfg.shape {
            crate::config::LoadShape::Closed => {
                ClosedLoopGenerator::run(
                    value,
                    self.cfg.measurement,
                    Arc::clone(&self.transport),
                    Arc::clone(&self.ctx),
                    self.cfg.profile,
                    Some(recorder_handle),
                )
                .await
            }
            crate::config::LoadShape::Rate => {
                RateLoadGenerator::run(
                    value as f64,
                    self.cfg.measurement,
                    Arc::clone(&self.transport),
                    Arc::clone(&self.ctx),
                    self.cfg.profile,
                    Some(recorder_handle),
                )
                .await
            }
        }
    }
}
