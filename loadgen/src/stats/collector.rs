//! Metrics collector - concurrent aggregation of checks, request outcomes and durations
//!
//! Counters are atomics and per-check tallies live in a `DashMap`, so virtual clients
//! record without contending on one lock; only the duration samples sit behind a
//! `RwLock`. Every record is mirrored into the `metrics` facade for external export.

use dashmap::DashMap;
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use super::latency::{LatencyStats, LatencySummary};
use crate::scenario::{CheckResult, Iteration, RequestSample};

/// Pass/fail tally of one check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckCounts {
    pub passes: u64,
    pub fails: u64,
}

impl CheckCounts {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }
}

/// Per-check line of the run report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub scenario: String,
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

/// Point-in-time copy of everything the thresholds look at
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub failed_requests: u64,
    pub checks_passed: u64,
    pub checks_failed: u64,
    pub iterations: u64,
    pub durations: LatencyStats,
}

impl StatsSnapshot {
    /// Fraction of failed requests (0.0 to 1.0)
    pub fn failure_rate(&self) -> f64 {
        ratio(self.failed_requests, self.requests)
    }

    /// Fraction of failed checks (0.0 to 1.0)
    pub fn check_failure_rate(&self) -> f64 {
        ratio(self.checks_failed, self.checks_passed + self.checks_failed)
    }

    pub fn latency_summary(&self) -> Option<LatencySummary> {
        self.durations.summary()
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total > 0 {
        part as f64 / total as f64
    } else {
        0.0
    }
}

/// Run-wide aggregator shared by every virtual client
#[derive(Debug, Default)]
pub struct MetricsCollector {
    requests: AtomicU64,
    failed_requests: AtomicU64,
    setup_requests: AtomicU64,
    iterations: AtomicU64,
    checks: DashMap<(&'static str, &'static str), CheckCounts>,
    durations: RwLock<LatencyStats>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_check(&self, check: &CheckResult) {
        let mut counts = self.checks.entry((check.scenario, check.name)).or_default();
        if check.passed {
            counts.passes += 1;
        } else {
            counts.fails += 1;
        }
        drop(counts);

        counter!(
            "loadgen_checks_total",
            "check" => check.name,
            "result" => if check.passed { "pass" } else { "fail" }
        )
        .increment(1);
    }

    /// Record a scenario request: counts toward failure rate and duration percentiles
    pub async fn record_request(&self, sample: &RequestSample) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        counter!("loadgen_requests_total", "endpoint" => sample.endpoint.name()).increment(1);

        if sample.failed {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
            counter!("loadgen_requests_failed_total", "endpoint" => sample.endpoint.name())
                .increment(1);
        }

        if let Some(latency) = sample.latency {
            self.durations.write().await.record(latency);
            histogram!("loadgen_request_duration_seconds", "endpoint" => sample.endpoint.name())
                .record(latency);
        }
    }

    /// Record a provisioning request. Setup traffic is tallied apart from the run's
    /// request metrics so thresholds reflect the scenario alone.
    pub fn record_setup_request(&self, sample: &RequestSample) {
        self.setup_requests.fetch_add(1, Ordering::Relaxed);
        counter!("loadgen_setup_requests_total", "failed" => if sample.failed { "true" } else { "false" })
            .increment(1);
    }

    pub async fn record_iteration(&self, iteration: &Iteration) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
        counter!("loadgen_iterations_total").increment(1);
        for check in &iteration.checks {
            self.record_check(check);
        }
        for sample in &iteration.requests {
            self.record_request(sample).await;
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    pub fn setup_requests(&self) -> u64 {
        self.setup_requests.load(Ordering::Relaxed)
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    /// Current fraction of failed scenario requests
    pub fn failure_rate(&self) -> f64 {
        ratio(self.failed_requests(), self.requests())
    }

    pub fn check_counts(&self, scenario: &'static str, name: &'static str) -> CheckCounts {
        self.checks
            .get(&(scenario, name))
            .map(|c| *c)
            .unwrap_or_default()
    }

    /// Per-check tallies, sorted by scenario then check name
    pub fn checks(&self) -> Vec<CheckSummary> {
        let mut checks: Vec<CheckSummary> = self
            .checks
            .iter()
            .map(|entry| {
                let (scenario, name) = *entry.key();
                CheckSummary {
                    scenario: scenario.to_string(),
                    name: name.to_string(),
                    passes: entry.passes,
                    fails: entry.fails,
                }
            })
            .collect();
        checks.sort_by(|a, b| (&a.scenario, &a.name).cmp(&(&b.scenario, &b.name)));
        checks
    }

    /// Current duration percentile without copying the samples
    pub async fn duration_percentile(&self, p: f64) -> Option<Duration> {
        let durations = self.durations.read().await.clone();
        durations.percentile(p)
    }

    pub async fn snapshot(&self) -> StatsSnapshot {
        let (checks_passed, checks_failed) = self
            .checks
            .iter()
            .fold((0, 0), |(p, f), c| (p + c.passes, f + c.fails));

        StatsSnapshot {
            requests: self.requests(),
            failed_requests: self.failed_requests(),
            checks_passed,
            checks_failed,
            iterations: self.iterations(),
            durations: self.durations.read().await.clone(),
        }
    }
}
