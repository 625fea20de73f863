//! Generator-process CPU poller
//!
//! Samples `/proc/self/stat` on an interval and reports CPU utilization in [0, 1] as
//! `Δcpu_time / (Δwall_time · cores)`, averaged since the previous sample.

use crate::telemetry::Poller;
use crate::util::resource::ResourceSnapshot;
use std::time::Duration;

/// Spawn a poller that samples generator CPU utilization every `interval`.
pub fn spawn(interval: Duration) -> Poller<f64> {
    let mut poller = Poller::new();
    let mut previous: Option<ResourceSnapshot> = None;
    let cores = ResourceSnapshot::num_cpus().unwrap_or(1).max(1) as f64;

    poller.start(interval, move || {
        let prev = previous;
        let sample = ResourceSnapshot::take();
        if let Some(current) = sample {
            previous = Some(current);
        }
        async move {
            let current = sample?;
            let prev = prev?;
            let wall_us = current.timestamp.duration_since(prev.timestamp).as_micros() as u64;
            if wall_us == 0 {
                return None;
            }
            let cpu_us = (current.cpu_user_us + current.cpu_system_us)
                .saturating_sub(prev.cpu_user_us + prev.cpu_system_us);
            Some((cpu_us as f64 / wall_us as f64) / cores)
        }
    });
    poller
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn poller_eventually_reports_a_sample_on_linux() {
        let mut poller = spawn(Duration::from_millis(5));
        // Keep the process busy briefly so there is CPU time to observe.
        let mut sum: u64 = 0;
        for i in 0..5_000_000u64 {
            sum = sum.wrapping_add(i);
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        poller.stop();
        // On non-Linux CI this legitimately stays None; only assert the shape when set.
        if let Some(util) = poller.current() {
            assert!(util >= 0.0);
            assert!(sum > 0);
        }
    }
}
