//! Run metrics: concurrent collection, latency percentiles and threshold evaluation

mod collector;
mod latency;
mod thresholds;

pub use collector::{CheckCounts, CheckSummary, MetricsCollector, StatsSnapshot};
pub use latency::{LatencyStats, LatencySummary};
pub use thresholds::{
    Aggregate, Comparison, MetricName, Threshold, ThresholdOutcome, ThresholdParseError,
    ThresholdStatus, evaluate_all, parse_thresholds,
};
