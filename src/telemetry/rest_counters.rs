//! REST admin-counters adapter
//!
//! Polls a target's admin debug endpoint for memory, CPU, and I/O counters. The
//! endpoint reports human-readable sizes ("3.23 GBytes") rather than raw numbers;
//! [`parse_human_bytes`] converts those into MiB. CPU usage is derived the same way
//! as the generator's own poller: delta-CPU-time over delta-wall-time across
//! consecutive samples. I/O rates are derived from the most recent `IO_SAMPLE_WINDOW`
//! operations the endpoint reports, not the adapter's own sampling interval.

use crate::telemetry::{Poller, TargetSample};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);
const IO_SAMPLE_WINDOW: usize = 10;

/// One raw reading from the admin endpoint, before rate derivation.
#[derive(Debug, Clone, Copy)]
struct RawCounters {
    at: Instant,
    process_cpu_time_us: u64,
    managed_memory_mib: f64,
    unmanaged_memory_mib: f64,
    io_ops_completed: u64,
    io_bytes_transferred: u64,
}

/// Parses admin-endpoint responses and tracks the rolling state needed to turn
/// cumulative counters into rates.
pub struct RestCountersAdapter {
    client: reqwest::Client,
    endpoint: String,
    previous: Option<RawCounters>,
    io_window: VecDeque<(Instant, u64, u64)>,
}

impl RestCountersAdapter {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            previous: None,
            io_window: VecDeque::with_capacity(IO_SAMPLE_WINDOW),
        }
    }

    /// Spawn a background poller that samples this adapter every `interval`.
    pub fn spawn(mut self, interval: Duration) -> Poller<TargetSample> {
        let mut poller = Poller::new();
        poller.start(interval, move || {
            let fut = self.sample_once();
            async move { fut.await }
        });
        poller
    }

    async fn sample_once(&mut self) -> Option<TargetSample> {
        let body = self.client.get(&self.endpoint).send().await.ok()?.text().await.ok()?;
        let raw = parse_admin_response(&body)?;
        let sample = self.derive(raw);
        Some(sample)
    }

    fn derive(&mut self, raw: RawCounters) -> TargetSample {
        let process_cpu = self.previous.map(|prev| {
            let wall_us = raw.at.duration_since(prev.at).as_micros() as u64;
            if wall_us == 0 {
                0.0
            } else {
                raw.process_cpu_time_us.saturating_sub(prev.process_cpu_time_us) as f64 / wall_us as f64
            }
        });

        self.io_window.push_back((raw.at, raw.io_ops_completed, raw.io_bytes_transferred));
        while self.io_window.len() > IO_SAMPLE_WINDOW {
            self.io_window.pop_front();
        }
        let (read_ops, read_bytes) = self.io_rate();

        self.previous = Some(raw);

        TargetSample {
            machine_cpu: None,
            process_cpu,
            managed_memory_mib: Some(raw.managed_memory_mib),
            unmanaged_memory_mib: Some(raw.unmanaged_memory_mib),
            dirty_memory_mib: None,
            load_average_1m: None,
            io_read_ops_per_sec: read_ops,
            io_write_ops_per_sec: None,
            io_read_bytes_per_sec: read_bytes,
            io_write_bytes_per_sec: None,
            total_requests: None,
            request_rate: None,
        }
    }

    fn io_rate(&self) -> (Option<f64>, Option<f64>) {
        let (oldest_at, oldest_ops, oldest_bytes) = *self.io_window.front().unwrap();
        let (newest_at, newest_ops, newest_bytes) = *self.io_window.back().unwrap();
        let elapsed = newest_at.duration_since(oldest_at).as_secs_f64();
        if elapsed <= 0.0 || self.io_window.len() < 2 {
            return (None, None);
        }
        let ops_rate = newest_ops.saturating_sub(oldest_ops) as f64 / elapsed;
        let bytes_rate = newest_bytes.saturating_sub(oldest_bytes) as f64 / elapsed;
        (Some(ops_rate), Some(bytes_rate))
    }
}

/// Parse a JSON admin-counters response into raw counters. Only the handful of
/// fields this adapter cares about are pulled out; unknown fields are ignored.
fn parse_admin_response(body: &str) -> Option<RawCounters> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    Some(RawCounters {
        at: Instant::now(),
        process_cpu_time_us: value.get("ProcessCpuTimeUs")?.as_u64()?,
        managed_memory_mib: value
            .get("ManagedMemory")
            .and_then(|v| v.as_str())
            .and_then(parse_human_bytes)
            .unwrap_or(0.0),
        unmanaged_memory_mib: value
            .get("UnmanagedMemory")
            .and_then(|v| v.as_str())
            .and_then(parse_human_bytes)
            .unwrap_or(0.0),
        io_ops_completed: value.get("IoOpsCompleted").and_then(|v| v.as_u64()).unwrap_or(0),
        io_bytes_transferred: value.get("IoBytesTransferred").and_then(|v| v.as_u64()).unwrap_or(0),
    })
}

/// Parse a human-readable size such as `"3.23 GBytes"` or `"512 KB"` into MiB.
pub fn parse_human_bytes(text: &str) -> Option<f64> {
    let text = text.trim();
    let split_at = text.find(|c: char| !c.is_ascii_digit() && c != '.' && c != '-')?;
    let (number, unit) = text.split_at(split_at);
    let value: f64 = number.trim().parse().ok()?;
    let unit = unit.trim().to_ascii_lowercase();
    let mib = match unit.as_str() {
        "b" | "byte" | "bytes" => value / (1024.0 * 1024.0),
        "kb" | "kbyte" | "kbytes" => value / 1024.0,
        "mb" | "mbyte" | "mbytes" => value,
        "gb" | "gbyte" | "gbytes" => value * 1024.0,
        "tb" | "tbyte" | "tbytes" => value * 1024.0 * 1024.0,
        _ => return None,
    };
    Some(mib)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gbytes_into_mib() {
        assert!((parse_human_bytes("3.23 GBytes").unwrap() - 3307.52).abs() < 0.5);
    }

    #[test]
    fn parses_plain_mbytes() {
        assert_eq!(parse_human_bytes("512 MBytes"), Some(512.0));
    }

    #[test]
    fn rejects_unknown_units() {
        assert_eq!(parse_human_bytes("512 furlongs"), None);
    }

    #[test]
    fn parses_admin_json_with_the_fields_this_adapter_needs() {
        let body = r#"{"ProcessCpuTimeUs": 1000000, "ManagedMemory": "1.00 GBytes", "UnmanagedMemory": "256 MBytes", "IoOpsCompleted": 42, "IoBytesTransferred": 4096}"#;
        let raw = parse_admin_response(body).unwrap();
        assert_eq!(raw.process_cpu_time_us, 1_000_000);
        assert_eq!(raw.managed_memory_mib, 1024.0);
        assert_eq!(raw.io_ops_completed, 42);
    }

    #[tokio::test]
    async fn derives_zero_cpu_on_the_first_sample() {
        let client = reqwest::Client::new();
        let mut adapter = RestCountersAdapter::new(client, "http://unused.invalid");
        let raw = RawCounters {
            at: Instant::now(),
            process_cpu_time_us: 500,
            managed_memory_mib: 10.0,
            unmanaged_memory_mib: 1.0,
            io_ops_completed: 1,
            io_bytes_transferred: 1024,
        };
        let sample = adapter.derive(raw);
        assert_eq!(sample.process_cpu, None);
        assert_eq!(sample.managed_memory_mib, Some(10.0));
    }
}
