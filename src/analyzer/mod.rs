//! Knee analyzer
//!
//! Walks the ordered step records produced by [`crate::controller::StepController`]
//! and picks the step at which the target stopped scaling: throughput growth falls
//! below `dThr` while p95 growth exceeds `dP95`, once both steps are already in the
//! "danger zone" (p50 ≥ 100 ms). This is a pure, synchronous procedure — no I/O, no
//! randomness — so the same step sequence always yields the same knee.

use crate::config::KneeThresholds;
use crate::stats::StepRecord;

const DANGER_ZONE_P50_MS: f64 = 100.0;
const RECOVERY_THRESHOLD: f64 = 0.03;
/// Guards the Δp95 denominator against a near-zero previous p95.
const EPSILON_MS: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct Knee {
    pub step_index: usize,
    pub step_value: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    NetworkLimited,
    ClientLimitedCpu,
    Unknown,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::NetworkLimited => "network-limited",
            Verdict::ClientLimitedCpu => "client-limited (CPU)",
            Verdict::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone)]
pub struct KneeAnalysis {
    pub knee: Option<Knee>,
    pub verdict: Verdict,
}

/// A single step's throughput/p95 pair, whatever percentile set (raw or normalized)
/// the caller decided should drive knee detection.
struct StepPoint {
    thr: f64,
    p50: f64,
    p95: f64,
}

fn point_of(step: &StepRecord) -> StepPoint {
    let percentiles = step.normalized.unwrap_or(step.raw);
    StepPoint {
        thr: step.throughput,
        p50: percentiles.p50,
        p95: percentiles.p95,
    }
}

/// Fractional delta `(cur - prev) / prev`, using `EPSILON_MS` to guard a near-zero
/// denominator on the p95 side only (throughput is never legitimately zero once a
/// step has run).
fn delta_thr(prev: &StepPoint, cur: &StepPoint) -> f64 {
    if prev.thr == 0.0 {
        0.0
    } else {
        (cur.thr - prev.thr) / prev.thr
    }
}

fn delta_p95(prev: &StepPoint, cur: &StepPoint) -> f64 {
    (cur.p95 - prev.p95) / (prev.p95 + EPSILON_MS)
}

pub struct KneeAnalyzer {
    thresholds: KneeThresholds,
}

impl KneeAnalyzer {
    pub fn new(thresholds: KneeThresholds) -> Self {
        Self { thresholds }
    }

    pub fn analyze(&self, steps: &[StepRecord]) -> KneeAnalysis {
        let knee = self.find_knee(steps);
        let verdict = knee
            .as_ref()
            .map(|k| self.classify(&steps[k.step_index]))
            .unwrap_or(Verdict::Unknown);
        KneeAnalysis { knee, verdict }
    }

    fn find_knee(&self, steps: &[StepRecord]) -> Option<Knee> {
        if steps.is_empty() {
            return None;
        }
        if steps.len() == 1 {
            return Some(Knee {
                step_index: 0,
                step_value: steps[0].step_value,
                reason: "single-step".to_string(),
            });
        }

        let points: Vec<StepPoint> = steps.iter().map(point_of).collect();

        for i in 1..steps.len() {
            if steps[i].error_rate > self.thresholds.max_err {
                return Some(Knee {
                    step_index: i - 1,
                    step_value: steps[i - 1].step_value,
                    reason: "errors>maxErr".to_string(),
                });
            }

            let prev = &points[i - 1];
            let cur = &points[i];

            if prev.p50.max(cur.p50) < DANGER_ZONE_P50_MS {
                continue;
            }

            // An outright throughput regression alongside rising tail latency is a
            // stronger signal than the growth-rate thresholds below, so it takes
            // priority and fires unconditionally (no recovery deferral).
            if cur.thr < prev.thr && cur.p95 > prev.p95 {
                return Some(Knee {
                    step_index: i - 1,
                    step_value: steps[i - 1].step_value,
                    reason: "Thr↓ & p95↑".to_string(),
                });
            }

            let d_thr = delta_thr(prev, cur);
            let d_p95 = delta_p95(prev, cur);

            let smoothed = if i >= 2 {
                let prev2 = &points[i - 2];
                let d_thr_prior = delta_thr(prev2, prev);
                let d_p95_prior = delta_p95(prev2, prev);
                Some(((d_thr + d_thr_prior) / 2.0, (d_p95 + d_p95_prior) / 2.0))
            } else {
                None
            };

            let direct_fires = d_thr < self.thresholds.d_thr && d_p95 > self.thresholds.d_p95;
            let smoothed_fires = smoothed.map(|(t, p)| t < self.thresholds.d_thr && p > self.thresholds.d_p95).unwrap_or(false);

            if direct_fires || smoothed_fires {
                if let Some(next) = points.get(i + 1) {
                    let recovery = delta_thr(prev, next);
                    if recovery > RECOVERY_THRESHOLD {
                        continue; // deferred: the next step recovers, so this wasn't the knee
                    }
                }
                return Some(Knee {
                    step_index: i - 1,
                    step_value: steps[i - 1].step_value,
                    reason: "Δthr & Δp95".to_string(),
                });
            }
        }

        let last = steps.len() - 1;
        Some(Knee {
            step_index: last,
            step_value: steps[last].step_value,
            reason: "end-of-range".to_string(),
        })
    }

    fn classify(&self, step: &StepRecord) -> Verdict {
        if step.network_utilization.map(|u| u >= 0.85).unwrap_or(false) {
            return Verdict::NetworkLimited;
        }
        if step.telemetry.generator_cpu_utilization.map(|c| c >= 0.85).unwrap_or(false) {
            return Verdict::ClientLimitedCpu;
        }
        Verdict::Unknown
    }
}
