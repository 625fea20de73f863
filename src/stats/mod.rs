pub mod aggregator;
pub mod histogram;
pub mod recorder;

pub use aggregator::{RollingRateStats, StepInputs, StepRecord};
pub use histogram::{HistogramBin, LatencyHistogram, PercentileSet};
pub use recorder::{LatencyRecorder, RecorderHandle};
