//! Concurrent latency recording with coordinated-omission correction
//!
//! Backed by `hdrhistogram::sync::SyncHistogram`, which gives every worker a cheap
//! cloneable [`Recorder`](hdrhistogram::sync::Recorder) writer handle and the
//! controller a single reader side that `refresh()`es pending writes before
//! snapshotting, which keeps snapshot-and-reset effectively wait-free with respect to
//! concurrent writers.

use crate::error::{KneeError, Result};
use crate::stats::histogram::{LatencyHistogram, MAX_LATENCY_US, MIN_LATENCY_US, SIGNIFICANT_DIGITS};
use hdrhistogram::sync::{Recorder, SyncHistogram};
use hdrhistogram::Histogram;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Owns the live (writable) side of a step's latency histogram. Lives for the whole
/// run; `snapshot_and_reset` is called once per step boundary.
pub struct LatencyRecorder {
    sync_hist: SyncHistogram<u64>,
    max_observed_us: Arc<AtomicU64>,
}

/// A per-worker write handle. Cloning is cheap; hand one to every worker task at the
/// start of a step's measurement phase.
#[derive(Clone)]
pub struct RecorderHandle {
    recorder: Recorder<u64>,
    max_observed_us: Arc<AtomicU64>,
}

impl LatencyRecorder {
    pub fn new() -> Self {
        let hist = Histogram::<u64>::new_with_bounds(MIN_LATENCY_US, MAX_LATENCY_US, SIGNIFICANT_DIGITS)
            .expect("static histogram bounds are always valid");
        Self {
            sync_hist: hist.into_sync(),
            max_observed_us: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Obtain a new writer handle. Workers call this once at the start of a step.
    pub fn handle(&self) -> RecorderHandle {
        RecorderHandle {
            recorder: self.sync_hist.recorder(),
            max_observed_us: Arc::clone(&self.max_observed_us),
        }
    }

    /// Pull all pending writer-side samples into the reader-side histogram, detach an
    /// immutable snapshot of it, and reset both the live histogram and the
    /// max-observed tracker so the next step starts from zero. No sample recorded
    /// after this call can appear in the returned snapshot.
    pub fn snapshot_and_reset(&mut self) -> LatencyHistogram {
        self.sync_hist.refresh();
        let snapshot = LatencyHistogram::from_hdr((*self.sync_hist).clone());
        self.sync_hist.clear();
        self.max_observed_us.store(0, Ordering::Relaxed);
        snapshot
    }
}

impl Default for LatencyRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderHandle {
    /// Record a single observed latency, unconditionally.
    ///
    /// Fails fast if `observed_us` exceeds the histogram's upper bound — that
    /// indicates a measurement defect (e.g. a hung connection whose "latency" is
    /// actually a stuck clock), not a legitimately slow operation.
    pub fn record(&mut self, observed_us: u64) -> Result<()> {
        self.track_max(observed_us);
        self.recorder.record(observed_us.max(MIN_LATENCY_US)).map_err(|_| {
            KneeError::MeasurementDefect(format!(
                "observed latency {observed_us}us exceeds the {MAX_LATENCY_US}us recorder bound"
            ))
        })
    }

    /// Record with coordinated-omission correction: in addition to the real sample,
    /// back-fill synthetic samples at `expected_interval_us` whenever the observed
    /// latency is much larger than the expected inter-arrival time. This is the
    /// textbook HdrHistogram `recordValueWithExpectedInterval` backfill.
    pub fn record_with_expected_interval(&mut self, observed_us: u64, expected_interval_us: u64) -> Result<()> {
        self.record(observed_us)?;
        if expected_interval_us == 0 || observed_us <= expected_interval_us {
            return Ok(());
        }
        let mut missing = observed_us - expected_interval_us;
        while missing >= expected_interval_us {
            self.recorder.record(missing.max(MIN_LATENCY_US)).map_err(|_| {
                KneeError::MeasurementDefect(format!(
                    "coordinated-omission backfill value {missing}us exceeds the {MAX_LATENCY_US}us recorder bound"
                ))
            })?;
            missing -= expected_interval_us;
        }
        Ok(())
    }

    fn track_max(&self, observed_us: u64) {
        self.max_observed_us.fetch_max(observed_us, Ordering::Relaxed);
    }
}
