//! Telemetry pollers
//!
//! Three independent background samplers feed a step's telemetry picture: the
//! generator's own CPU utilization, a REST admin-endpoint counter adapter, and an
//! SNMP adapter. Each runs on its own timer and exposes a synchronous `start`/`stop`/
//! `current` API backed by an internal Tokio task — callers never await a poller
//! directly, they just read whatever the latest sample happens to be.

pub mod cpu;
pub mod rest_counters;
pub mod snmp;

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Running,
    Stopping,
}

/// A background sampler that calls an async `sample_fn` on a fixed interval and keeps
/// the most recent result behind a mutex. Generic over the sample type so the same
/// machinery backs the CPU, REST-counters, and SNMP adapters.
pub struct Poller<T: Send + 'static> {
    state: Arc<Mutex<PollerState>>,
    latest: Arc<Mutex<Option<T>>>,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Poller<T> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PollerState::Idle)),
            latest: Arc::new(Mutex::new(None)),
            cancel: None,
            handle: None,
        }
    }

    pub fn state(&self) -> PollerState {
        *self.state.lock()
    }

    /// Start sampling on `interval`. A no-op if already running.
    pub fn start<F, Fut>(&mut self, interval: Duration, mut sample_fn: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Option<T>> + Send,
    {
        if *self.state.lock() == PollerState::Running {
            return;
        }
        let token = CancellationToken::new();
        let child = token.clone();
        let latest = Arc::clone(&self.latest);
        let state = Arc::clone(&self.state);
        *state.lock() = PollerState::Running;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Some(sample) = sample_fn().await {
                            *latest.lock() = Some(sample);
                        }
                    }
                }
            }
            *state.lock() = PollerState::Idle;
        });

        self.cancel = Some(token);
        self.handle = Some(handle);
    }

    /// Signal the background task to stop. Returns immediately; the task winds down
    /// and transitions to `Idle` on its own.
    pub fn stop(&mut self) {
        if let Some(token) = self.cancel.take() {
            *self.state.lock() = PollerState::Stopping;
            token.cancel();
        }
        self.handle = None;
    }
}

impl<T: Clone + Send + 'static> Poller<T> {
    pub fn current(&self) -> Option<T> {
        self.latest.lock().clone()
    }
}

impl<T: Send + 'static> Default for Poller<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Merged telemetry reading for a single step, combining whichever adapters are
/// enabled. When both the REST-counters and SNMP adapters are enabled, SNMP values
/// win on any field they both populate.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySample {
    /// Generator-process CPU utilization in [0, 1], averaged since the last sample.
    pub generator_cpu_utilization: Option<f64>,
    pub target: Option<TargetSample>,
}

impl TelemetrySample {
    /// Merge two samples for the same step, preferring `snmp` wherever it has a
    /// value, falling back to `rest` otherwise.
    pub fn merge_target(rest: Option<TargetSample>, snmp: Option<TargetSample>) -> Option<TargetSample> {
        match (rest, snmp) {
            (None, None) => None,
            (Some(r), None) => Some(r),
            (None, Some(s)) => Some(s),
            (Some(r), Some(s)) => Some(r.overridden_by(s)),
        }
    }
}

/// Target-side metrics, populated from the REST counters adapter and/or SNMP.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct TargetSample {
    pub machine_cpu: Option<f64>,
    pub process_cpu: Option<f64>,
    pub managed_memory_mib: Option<f64>,
    pub unmanaged_memory_mib: Option<f64>,
    pub dirty_memory_mib: Option<f64>,
    pub load_average_1m: Option<f64>,
    pub io_read_ops_per_sec: Option<f64>,
    pub io_write_ops_per_sec: Option<f64>,
    pub io_read_bytes_per_sec: Option<f64>,
    pub io_write_bytes_per_sec: Option<f64>,
    pub total_requests: Option<u64>,
    pub request_rate: Option<f64>,
}

impl TargetSample {
    /// Field-by-field override: any field `other` has set wins, otherwise keep `self`.
    fn overridden_by(self, other: TargetSample) -> TargetSample {
        TargetSample {
            machine_cpu: other.machine_cpu.or(self.machine_cpu),
            process_cpu: other.process_cpu.or(self.process_cpu),
            managed_memory_mib: other.managed_memory_mib.or(self.managed_memory_mib),
            unmanaged_memory_mib: other.unmanaged_memory_mib.or(self.unmanaged_memory_mib),
            dirty_memory_mib: other.dirty_memory_mib.or(self.dirty_memory_mib),
            load_average_1m: other.load_average_1m.or(self.load_average_1m),
            io_read_ops_per_sec: other.io_read_ops_per_sec.or(self.io_read_ops_per_sec),
            io_write_ops_per_sec: other.io_write_ops_per_sec.or(self.io_write_ops_per_sec),
            io_read_bytes_per_sec: other.io_read_bytes_per_sec.or(self.io_read_bytes_per_sec),
            io_write_bytes_per_sec: other.io_write_bytes_per_sec.or(self.io_write_bytes_per_sec),
            total_requests: other.total_requests.or(self.total_requests),
            request_rate: other.request_rate.or(self.request_rate),
        }
    }
}
