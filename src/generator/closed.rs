//! Closed-loop generator
//!
//! Spawns C long-lived worker tasks against a shared deadline. Each worker owns its
//! own workload generator and runs a tight loop: draw the next operation, stamp a
//! monotonic timestamp, execute it through the transport, record the latency (or the
//! error), and go again — concurrency is bounded by the worker count, never by an
//! arrival rate.

use super::MeasurementOutcome;
use crate::stats::RecorderHandle;
use crate::transport::Transport;
use crate::workload::{ProfileKind, WorkloadContext};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub struct ClosedLoopGenerator;

impl ClosedLoopGenerator {
    /// Run `concurrency` workers for `duration`. When `recorder` is `None`, latencies
    /// are discarded — this is how the warmup pass touches the server without
    /// polluting the measured histogram.
    pub async fn run(
        concurrency: u64,
        duration: Duration,
        transport: Arc<dyn Transport>,
        ctx: Arc<WorkloadContext>,
        profile: ProfileKind,
        recorder: Option<RecorderHandle>,
    ) -> MeasurementOutcome {
        let cancel = CancellationToken::new();
        let successes = Arc::new(AtomicU64::new(0));
        let errors = Arc::new(AtomicU64::new(0));
        let bytes_in = Arc::new(AtomicU64::new(0));
        let bytes_out = Arc::new(AtomicU64::new(0));
        let scheduled = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::with_capacity(concurrency as usize);
        for worker_offset in 0..concurrency {
            let transport = Arc::clone(&transport);
            let ctx = Arc::clone(&ctx);
            let cancel = cancel.clone();
            let recorder = recorder.clone();
            let successes = Arc::clone(&successes);
            let errors = Arc::clone(&errors);
            let bytes_in = Arc::clone(&bytes_in);
            let bytes_out = Arc::clone(&bytes_out);
            let scheduled = Arc::clone(&scheduled);

            handles.push(tokio::spawn(async move {
                let mut generator = profile.build(&ctx, worker_offset);
                let mut recorder = recorder;
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let op = generator.next_operation();
                    scheduled.fetch_add(1, Ordering::Relaxed);
                    let start = Instant::now();
                    let result = transport.execute(&op, &cancel).await;
                    let elapsed = elapsed_us(start);
                    bytes_out.fetch_add(result.bytes_out, Ordering::Relaxed);

                    if cancel.is_cancelled() {
                        break;
                    }

                    if result.success {
                        successes.fetch_add(1, Ordering::Relaxed);
                        bytes_in.fetch_add(result.bytes_in, Ordering::Relaxed);
                    } else {
                        errors.fetch_add(1, Ordering::Relaxed);
                    }

                    if let Some(recorder) = recorder.as_mut() {
                        // Latency is attributed to the op regardless of success/error.
                        let _ = recorder.record(elapsed);
                    }
                }
            }));
        }

        let _ = tokio::time::sleep(duration).await;
        cancel.cancel();
        for handle in handles {
            let _ = handle.await;
        }

        MeasurementOutcome {
            success_count: successes.load(Ordering::Relaxed),
            error_count: errors.load(Ordering::Relaxed),
            bytes_in: bytes_in.load(Ordering::Relaxed),
            bytes_out: bytes_out.load(Ordering::Relaxed),
            rolling_rate: None,
            scheduled_count: scheduled.load(Ordering::Relaxed),
        }
    }
}

/// Wall-clock latency of one operation, in whole microseconds, saturating rather than
/// panicking on an implausibly long individual request.
pub(crate) fn elapsed_us(start: Instant) -> u64 {
    start.elapsed().as_micros().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MixWeights;
    use crate::distribution::DistributionKind;
    use crate::transport::{CalibrationSample, TransportResult};
    use crate::workload::{KeyCounter, Operation};
    use async_trait::async_trait;

    struct AlwaysOkTransport;

    #[async_trait]
    impl Transport for AlwaysOkTransport {
        async fn execute(&self, _op: &Operation, _cancel: &CancellationToken) -> TransportResult {
            TransportResult::ok(128, 256)
        }
        async fn calibrate(&self, _path: &str) -> crate::error::Result<CalibrationSample> {
            Ok(CalibrationSample { ttfb_us: 0, total_us: 0 })
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

    #[tokio::test]
    async fn closed_loop_accumulates_successes_and_bytes() {
        let ctx = Arc::new(WorkloadContext {
            keys: Arc::new(KeyCounter::new(1000)),
            doc_size_bytes: 128,
            distribution: DistributionKind::Uniform,
            mix: MixWeights {
                reads_pct: 100,
                writes_pct: 0,
                updates_pct: 0,
            },
            seed: 1,
        });
        let outcome = ClosedLoopGenerator::run(
            4,
            Duration::from_millis(50),
            Arc::new(AlwaysOkTransport),
            ctx,
            ProfileKind::ReadsOnly,
            None,
        )
        .await;
        assert!(outcome.success_count > 0);
        assert_eq!(outcome.error_count, 0);
        assert!(outcome.bytes_in > 0);
        assert!(outcome.scheduled_count >= outcome.success_count + outcome.error_count);
    }
}
