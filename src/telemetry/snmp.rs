//! SNMP telemetry adapter
//!
//! Polls a fixed set of object identifiers under a vendor enterprise prefix. Two
//! profiles are supported: `minimal` (machine CPU, process CPU, managed/unmanaged
//! memory) and `extended` (adds dirty memory, load average, I/O rates, and request
//! counters). Counter-typed OIDs are converted to per-second rates from the delta
//! between consecutive samples; gauge-typed OIDs pass straight through. The first
//! sample after (re)connecting has no prior delta to compute from and reports `None`
//! rates for every counter field.

use crate::telemetry::{Poller, TargetSample};
use csnmp::{ObjectIdentifier, Snmp2cClient};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::{Duration, Instant};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_COMMUNITY: &str = "ravendb";

/// Vendor enterprise OID prefix all the object identifiers below live under.
const VENDOR_PREFIX: &str = "1.3.6.1.4.1.45751.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Minimal,
    Extended,
}

struct Oids {
    machine_cpu: &'static str,
    process_cpu: &'static str,
    managed_memory_mib: &'static str,
    unmanaged_memory_mib: &'static str,
    dirty_memory_mib: &'static str,
    load_average_1m: &'static str,
    io_read_ops: &'static str,
    io_write_ops: &'static str,
    total_requests: &'static str,
}

const OIDS: Oids = Oids {
    machine_cpu: "1.1",
    process_cpu: "1.2",
    managed_memory_mib: "1.3",
    unmanaged_memory_mib: "1.4",
    dirty_memory_mib: "2.1",
    load_average_1m: "2.2",
    io_read_ops: "2.3",
    io_write_ops: "2.4",
    total_requests: "2.5",
};

fn oid(suffix: &str) -> ObjectIdentifier {
    ObjectIdentifier::from_str(&format!("{VENDOR_PREFIX}.{suffix}")).expect("static OID is well-formed")
}

/// Which counter-typed OIDs the most recent poll observed, kept around so the next
/// poll can compute a per-second rate.
struct PreviousCounters {
    at: Instant,
    io_read_ops: Option<u64>,
    io_write_ops: Option<u64>,
    total_requests: Option<u64>,
}

pub struct SnmpAdapter {
    client: Snmp2cClient,
    profile: Profile,
    previous: Option<PreviousCounters>,
}

impl SnmpAdapter {
    pub async fn connect(
        target: SocketAddr,
        community: &str,
        timeout: Duration,
        profile: Profile,
    ) -> crate::error::Result<Self> {
        let client = Snmp2cClient::new(target, community.as_bytes().to_vec(), None, Some(timeout))
            .await
            .map_err(|e| crate::error::KneeError::Transport(format!("snmp connect to {target}: {e}")))?;
        Ok(Self {
            client,
            profile,
            previous: None,
        })
    }

    pub fn spawn(mut self, interval: Duration) -> Poller<TargetSample> {
        let mut poller = Poller::new();
        poller.start(interval, move || {
            let fut = self.poll_once();
            async move { fut.await }
        });
        poller
    }

    async fn poll_once(&mut self) -> Option<TargetSample> {
        let mut wanted = vec![oid(OIDS.machine_cpu), oid(OIDS.process_cpu), oid(OIDS.managed_memory_mib), oid(OIDS.unmanaged_memory_mib)];
        if self.profile == Profile::Extended {
            wanted.extend([
                oid(OIDS.dirty_memory_mib),
                oid(OIDS.load_average_1m),
                oid(OIDS.io_read_ops),
                oid(OIDS.io_write_ops),
                oid(OIDS.total_requests),
            ]);
        }

        let mut values = HashMap::new();
        for id in wanted {
            if let Ok(v) = self.client.get(id).await {
                values.insert(id, v);
            }
        }

        Some(self.derive(&values))
    }

    fn derive(&mut self, values: &HashMap<ObjectIdentifier, csnmp::ObjectValue>) -> TargetSample {
        let gauge = |suffix: &str| gauge_value(values.get(&oid(suffix)));
        let counter = |suffix: &str| counter_value(values.get(&oid(suffix)));

        let now = Instant::now();
        let read_ops_raw = counter(OIDS.io_read_ops);
        let write_ops_raw = counter(OIDS.io_write_ops);
        let total_requests_raw = counter(OIDS.total_requests);

        let (io_read_ops_per_sec, io_write_ops_per_sec, request_rate) = match &self.previous {
            None => (None, None, None),
            Some(prev) => {
                let elapsed = now.duration_since(prev.at).as_secs_f64();
                let rate = |cur: Option<u64>, old: Option<u64>| match (cur, old) {
                    (Some(c), Some(o)) if elapsed > 0.0 => Some(c.saturating_sub(o) as f64 / elapsed),
                    _ => None,
                };
                (
                    rate(read_ops_raw, prev.io_read_ops),
                    rate(write_ops_raw, prev.io_write_ops),
                    rate(total_requests_raw, prev.total_requests),
                )
            }
        };

        self.previous = Some(PreviousCounters {
            at: now,
            io_read_ops: read_ops_raw,
            io_write_ops: write_ops_raw,
            total_requests: total_requests_raw,
        });

        TargetSample {
            machine_cpu: gauge(OIDS.machine_cpu),
            process_cpu: gauge(OIDS.process_cpu),
            managed_memory_mib: gauge(OIDS.managed_memory_mib),
            unmanaged_memory_mib: gauge(OIDS.unmanaged_memory_mib),
            dirty_memory_mib: if self.profile == Profile::Extended { gauge(OIDS.dirty_memory_mib) } else { None },
            load_average_1m: if self.profile == Profile::Extended { gauge(OIDS.load_average_1m) } else { None },
            io_read_ops_per_sec,
            io_write_ops_per_sec,
            io_read_bytes_per_sec: None,
            io_write_bytes_per_sec: None,
            total_requests: total_requests_raw,
            request_rate,
        }
    }
}

fn gauge_value(value: Option<&csnmp::ObjectValue>) -> Option<f64> {
    match value? {
        csnmp::ObjectValue::Integer(v) => Some(*v as f64),
        csnmp::ObjectValue::Gauge32(v) => Some(*v as f64),
        csnmp::ObjectValue::Unsigned32(v) => Some(*v as f64),
        _ => None,
    }
}

fn counter_value(value: Option<&csnmp::ObjectValue>) -> Option<u64> {
    match value? {
        csnmp::ObjectValue::Counter32(v) => Some(*v as u64),
        csnmp::ObjectValue::Counter64(v) => Some(*v),
        _ => None,
    }
}
