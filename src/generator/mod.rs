//! Load generators
//!
//! Two strategies for driving one measurement window's worth of operations at the
//! transport: [`closed::ClosedLoopGenerator`] runs a fixed pool of worker tasks as
//! fast as each completes its previous request; [`rate::RateLoadGenerator`] paces
//! dispatch at a target arrival rate through a bounded worker-slot pool. Both record
//! into a shared [`crate::stats::RecorderHandle`] and return the same
//! [`MeasurementOutcome`].

pub mod closed;
pub mod rate;

use crate::stats::RollingRateStats;

/// Raw counters and timing a generator accumulates over one measurement window,
/// before the step controller folds in the histogram snapshot and telemetry sample.
#[derive(Debug, Clone, Default)]
pub struct MeasurementOutcome {
    pub success_count: u64,
    pub error_count: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub rolling_rate: Option<RollingRateStats>,
    /// Operations dispatched during the window, counted independently of whether
    /// they went on to succeed or error — the closed-loop equivalent of the rate
    /// generator's tick counter.
    pub scheduled_count: u64,
}
