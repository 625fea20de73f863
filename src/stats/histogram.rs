//! Immutable latency histogram snapshot
//!
//! Wraps an `hdrhistogram::Histogram<u64>` recording latencies in whole microseconds,
//! spanning 1 µs .. 60 s at 3 significant digits (~0.1% precision). A
//! `LatencyHistogram` is produced once per step by detaching the live recorder (see
//! [`crate::stats::recorder::LatencyRecorder`]) and is never mutated afterward — it is
//! the thing that gets percentile-queried and exported.

use hdrhistogram::Histogram;

/// Lower bound of the tracked range: 1 microsecond.
pub const MIN_LATENCY_US: u64 = 1;
/// Upper bound of the tracked range: 60 seconds, in microseconds.
pub const MAX_LATENCY_US: u64 = 60_000_000;
/// Significant digits of precision (~0.1%).
pub const SIGNIFICANT_DIGITS: u8 = 3;

/// One (value, count) bin as exported for JSON artifacts and cross-process
/// reconstruction: a histogram snapshot, serialized to bins and rebuilt elsewhere,
/// must yield percentiles identical to the original within one bin width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HistogramBin {
    /// Representative value of this bucket, in microseconds.
    pub value_us: u64,
    pub count: u64,
}

#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    inner: Histogram<u64>,
}

impl LatencyHistogram {
    pub fn new_empty() -> Self {
        let inner = Histogram::new_with_bounds(MIN_LATENCY_US, MAX_LATENCY_US, SIGNIFICANT_DIGITS)
            .expect("static histogram bounds are always valid");
        Self { inner }
    }

    pub(crate) fn from_hdr(inner: Histogram<u64>) -> Self {
        Self { inner }
    }

    /// Value at `percentile` (0.0..=100.0), in microseconds. Returns 0 on an empty
    /// histogram rather than an error.
    pub fn percentile_us(&self, percentile: f64) -> u64 {
        if self.inner.is_empty() {
            return 0;
        }
        self.inner.value_at_percentile(percentile)
    }

    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn max_us(&self) -> u64 {
        if self.inner.is_empty() {
            0
        } else {
            self.inner.max()
        }
    }

    pub fn min_us(&self) -> u64 {
        if self.inner.is_empty() {
            0
        } else {
            self.inner.min()
        }
    }

    /// Export the recorded bins (value, count) for embedding in JSON artifacts and
    /// for cross-process / file-based reconstruction.
    pub fn bins(&self) -> Vec<HistogramBin> {
        self.inner
            .iter_recorded()
            .map(|v| HistogramBin {
                value_us: v.value_iterated_to(),
                count: v.count_at_value(),
            })
            .collect()
    }

    /// Rebuild a histogram from exported bins. Percentiles computed from the result
    /// match the original to within one bin width, since each bin's representative
    /// value is re-recorded `count` times at the original resolution.
    pub fn from_bins(bins: &[HistogramBin]) -> Self {
        let mut inner = Histogram::new_with_bounds(MIN_LATENCY_US, MAX_LATENCY_US, SIGNIFICANT_DIGITS)
            .expect("static histogram bounds are always valid");
        for bin in bins {
            let _ = inner.record_n(bin.value_us.max(MIN_LATENCY_US), bin.count);
        }
        Self { inner }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new_empty()
    }
}

/// The standard percentile points reported in a step record.
pub const STEP_PERCENTILES: [(&str, f64); 7] = [
    ("p50", 50.0),
    ("p75", 75.0),
    ("p90", 90.0),
    ("p95", 95.0),
    ("p99", 99.0),
    ("p999", 99.9),
    ("p9999", 99.99),
];

/// The fixed set of percentiles plus max, computed from one histogram.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PercentileSet {
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub p999: f64,
    pub p9999: f64,
    pub max: f64,
}

impl PercentileSet {
    /// Compute raw percentiles (microseconds, as `f64` milliseconds — the unit used
    /// throughout the summary and CSV output) from a histogram.
    pub fn from_histogram_ms(hist: &LatencyHistogram) -> Self {
        let us_to_ms = |us: u64| us as f64 / 1000.0;
        Self {
            p50: us_to_ms(hist.percentile_us(50.0)),
            p75: us_to_ms(hist.percentile_us(75.0)),
            p90: us_to_ms(hist.percentile_us(90.0)),
            p95: us_to_ms(hist.percentile_us(95.0)),
            p99: us_to_ms(hist.percentile_us(99.0)),
            p999: us_to_ms(hist.percentile_us(99.9)),
            p9999: us_to_ms(hist.percentile_us(99.99)),
            max: us_to_ms(hist.max_us()),
        }
    }

    /// `normalized = max(0, raw - floor)` at every percentile point.
    pub fn normalized(&self, baseline_floor_ms: f64) -> Self {
        let sub = |v: f64| (v - baseline_floor_ms).max(0.0);
        Self {
            p50: sub(self.p50),
            p75: sub(self.p75),
            p90: sub(self.p90),
            p95: sub(self.p95),
            p99: sub(self.p99),
            p999: sub(self.p999),
            p9999: sub(self.p9999),
            max: sub(self.max),
        }
    }

    /// True if p50 ≤ p90 ≤ p95 ≤ p99 ≤ p999 ≤ p9999 ≤ max.
    pub fn is_monotone(&self) -> bool {
        self.p50 <= self.p90
            && self.p90 <= self.p95
            && self.p95 <= self.p99
            && self.p99 <= self.p999
            && self.p999 <= self.p9999
            && self.p9999 <= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_percentiles_are_zero() {
        let hist = LatencyHistogram::new_empty();
        assert_eq!(hist.percentile_us(50.0), 0);
        assert_eq!(hist.max_us(), 0);
    }

    #[test]
    fn bins_round_trip_percentiles_within_a_bucket_width() {
        let mut inner = Histogram::<u64>::new_with_bounds(MIN_LATENCY_US, MAX_LATENCY_US, SIGNIFICANT_DIGITS).unwrap();
        for v in 1..=1000u64 {
            inner.record(v * 100).unwrap();
        }
        let original = LatencyHistogram::from_hdr(inner);
        let bins = original.bins();
        let rebuilt = LatencyHistogram::from_bins(&bins);

        for p in [50.0, 90.0, 99.0] {
            let a = original.percentile_us(p) as i64;
            let b = rebuilt.percentile_us(p) as i64;
            assert!((a - b).abs() <= (a / 100).max(1), "p{p}: {a} vs {b}");
        }
    }

    #[test]
    fn percentile_set_monotonicity_holds_for_synthetic_data() {
        let mut inner = Histogram::<u64>::new_with_bounds(MIN_LATENCY_US, MAX_LATENCY_US, SIGNIFICANT_DIGITS).unwrap();
        for v in 1..=10_000u64 {
            inner.record(v).unwrap();
        }
        let hist = LatencyHistogram::from_hdr(inner);
        let set = PercentileSet::from_histogram_ms(&hist);
        assert!(set.is_monotone());
    }

    #[test]
    fn normalization_floors_at_zero() {
        let set = PercentileSet {
            p50: 1.0,
            p75: 2.0,
            p90: 3.0,
            p95: 4.0,
            p99: 5.0,
            p999: 6.0,
            p9999: 7.0,
            max: 8.0,
        };
        let normalized = set.normalized(10.0);
        assert_eq!(normalized.p50, 0.0);
        assert_eq!(normalized.max, 0.0);
    }
}
