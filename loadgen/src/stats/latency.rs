//! Request duration samples and percentile math

use serde::Serialize;
use std::time::Duration;

/// Latency statistics collected during a run
#[derive(Debug, Default, Clone)]
pub struct LatencyStats {
    samples: Vec<Duration>,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    pub fn record(&mut self, latency: Duration) {
        self.samples.push(latency);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn sorted(&self) -> Vec<Duration> {
        let mut sorted = self.samples.clone();
        sorted.sort();
        sorted
    }

    /// Calculate percentile (0-100)
    pub fn percentile(&self, p: f64) -> Option<Duration> {
        percentile_of(&self.sorted(), p)
    }

    pub fn p95(&self) -> Option<Duration> {
        self.percentile(95.0)
    }

    pub fn mean(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: u128 = self.samples.iter().map(Duration::as_nanos).sum();
        Some(mean_of(total, self.samples.len()))
    }

    pub fn min(&self) -> Option<Duration> {
        self.samples.iter().min().copied()
    }

    pub fn max(&self) -> Option<Duration> {
        self.samples.iter().max().copied()
    }

    /// All reported aggregates at once, sorting the samples a single time
    pub fn summary(&self) -> Option<LatencySummary> {
        let sorted = self.sorted();
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;

        Some(LatencySummary {
            count: sorted.len(),
            min_ms: ms(*sorted.first()?),
            avg_ms: ms(self.mean()?),
            med_ms: ms(percentile_of(&sorted, 50.0)?),
            p90_ms: ms(percentile_of(&sorted, 90.0)?),
            p95_ms: ms(percentile_of(&sorted, 95.0)?),
            p99_ms: ms(percentile_of(&sorted, 99.0)?),
            max_ms: ms(*sorted.last()?),
        })
    }
}

fn mean_of(total_nanos: u128, count: usize) -> Duration {
    let nanos = total_nanos / count.max(1) as u128;
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

fn percentile_of(sorted: &[Duration], p: f64) -> Option<Duration> {
    if sorted.is_empty() {
        return None;
    }

    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    Some(sorted[idx.min(sorted.len() - 1)])
}

/// Aggregated request durations, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    pub min_ms: f64,
    pub avg_ms: f64,
    pub med_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}
