//! Threshold predicates over aggregated run metrics
//!
//! Thresholds are written as `metric: expr[, expr...]` groups separated by `;`, e.g.
//! `http_req_failed: rate<0.0001; http_req_duration: p(95)<50`.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::collector::StatsSnapshot;

/// Threshold parse errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThresholdParseError {
    #[error("Threshold '{0}' is missing a 'metric:' prefix")]
    MissingMetric(String),

    #[error("Unknown threshold metric '{0}'")]
    UnknownMetric(String),

    #[error("Threshold expression '{0}' has no '<' or '<=' comparison")]
    MissingComparison(String),

    #[error("Unknown aggregate '{aggregate}' in threshold expression '{expression}'")]
    UnknownAggregate {
        aggregate: String,
        expression: String,
    },

    #[error("Metric '{metric}' does not support '{aggregate}'")]
    Unsupported {
        metric: &'static str,
        aggregate: String,
    },

    #[error("Invalid bound in threshold expression '{0}'")]
    InvalidBound(String),

    #[error("Percentile in '{0}' must be between 0 and 100")]
    InvalidPercentile(String),
}

/// Metrics a threshold can watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MetricName {
    /// Fraction of failed scenario requests
    #[serde(rename = "http_req_failed")]
    HttpReqFailed,
    /// Fraction of failed checks
    #[serde(rename = "checks")]
    Checks,
    /// Request durations in milliseconds
    #[serde(rename = "http_req_duration")]
    HttpReqDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::HttpReqFailed => "http_req_failed",
            MetricName::Checks => "checks",
            MetricName::HttpReqDuration => "http_req_duration",
        }
    }

    fn parse(name: &str) -> Result<Self, ThresholdParseError> {
        match name {
            "http_req_failed" => Ok(MetricName::HttpReqFailed),
            "checks" => Ok(MetricName::Checks),
            "http_req_duration" => Ok(MetricName::HttpReqDuration),
            other => Err(ThresholdParseError::UnknownMetric(other.to_string())),
        }
    }

    fn is_rate(&self) -> bool {
        !matches!(self, MetricName::HttpReqDuration)
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregate {
    Rate,
    Percentile(f64),
    Avg,
    Med,
    Min,
    Max,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Rate => f.write_str("rate"),
            Aggregate::Percentile(p) => write!(f, "p({})", p),
            Aggregate::Avg => f.write_str("avg"),
            Aggregate::Med => f.write_str("med"),
            Aggregate::Min => f.write_str("min"),
            Aggregate::Max => f.write_str("max"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
}

impl Comparison {
    fn holds(&self, observed: f64, bound: f64) -> bool {
        match self {
            Comparison::Lt => observed < bound,
            Comparison::Le => observed <= bound,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
        }
    }
}

/// A predicate over one aggregated metric
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub metric: MetricName,
    pub aggregate: Aggregate,
    pub comparison: Comparison,
    pub bound: f64,
}

impl Threshold {
    /// Failure rate strictly below `ceiling`
    pub fn failure_rate_below(ceiling: f64) -> Self {
        Self {
            metric: MetricName::HttpReqFailed,
            aggregate: Aggregate::Rate,
            comparison: Comparison::Lt,
            bound: ceiling,
        }
    }

    /// `p`-th percentile request duration strictly below `bound_ms`
    pub fn duration_percentile_below(p: f64, bound_ms: f64) -> Self {
        Self {
            metric: MetricName::HttpReqDuration,
            aggregate: Aggregate::Percentile(p),
            comparison: Comparison::Lt,
            bound: bound_ms,
        }
    }

    /// Parse one expression such as `rate<0.01` or `p(95)<=200` for `metric`
    pub fn parse(metric: &str, expression: &str) -> Result<Self, ThresholdParseError> {
        let metric = MetricName::parse(metric.trim())?;
        let expression: String = expression.split_whitespace().collect();

        let (lhs, comparison, rhs) = if let Some((lhs, rhs)) = expression.split_once("<=") {
            (lhs, Comparison::Le, rhs)
        } else if let Some((lhs, rhs)) = expression.split_once('<') {
            (lhs, Comparison::Lt, rhs)
        } else {
            return Err(ThresholdParseError::MissingComparison(expression.clone()));
        };

        let aggregate = parse_aggregate(lhs, &expression)?;
        if metric.is_rate() != (aggregate == Aggregate::Rate) {
            return Err(ThresholdParseError::Unsupported {
                metric: metric.as_str(),
                aggregate: lhs.to_string(),
            });
        }

        let bound: f64 = rhs
            .parse()
            .ok()
            .filter(|b: &f64| b.is_finite())
            .ok_or_else(|| ThresholdParseError::InvalidBound(expression.clone()))?;

        Ok(Self {
            metric,
            aggregate,
            comparison,
            bound,
        })
    }

    /// Evaluate against a snapshot. Fewer than `min_samples` samples skips the threshold.
    pub fn evaluate(&self, snapshot: &StatsSnapshot, min_samples: u64) -> ThresholdOutcome {
        let (samples, observed) = match self.metric {
            MetricName::HttpReqFailed => (snapshot.requests, Some(snapshot.failure_rate())),
            MetricName::Checks => (
                snapshot.checks_passed + snapshot.checks_failed,
                Some(snapshot.check_failure_rate()),
            ),
            MetricName::HttpReqDuration => {
                let durations = &snapshot.durations;
                let observed = match self.aggregate {
                    Aggregate::Percentile(p) => durations.percentile(p),
                    Aggregate::Med => durations.percentile(50.0),
                    Aggregate::Avg => durations.mean(),
                    Aggregate::Min => durations.min(),
                    Aggregate::Max => durations.max(),
                    Aggregate::Rate => None,
                };
                (
                    durations.len() as u64,
                    observed.map(|d| d.as_secs_f64() * 1000.0),
                )
            }
        };

        let status = match observed {
            Some(value) if samples > 0 && samples >= min_samples => {
                if self.comparison.holds(value, self.bound) {
                    ThresholdStatus::Passed
                } else {
                    ThresholdStatus::Failed
                }
            }
            _ => ThresholdStatus::Skipped,
        };

        ThresholdOutcome {
            metric: self.metric,
            expression: self.expression(),
            observed,
            samples,
            status,
        }
    }

    /// The expression part, e.g. `p(95)<50`
    pub fn expression(&self) -> String {
        format!("{}{}{}", self.aggregate, self.comparison.as_str(), self.bound)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.metric, self.expression())
    }
}

fn parse_aggregate(lhs: &str, expression: &str) -> Result<Aggregate, ThresholdParseError> {
    match lhs {
        "rate" => Ok(Aggregate::Rate),
        "avg" => Ok(Aggregate::Avg),
        "med" => Ok(Aggregate::Med),
        "min" => Ok(Aggregate::Min),
        "max" => Ok(Aggregate::Max),
        _ => {
            let p = lhs
                .strip_prefix("p(")
                .and_then(|rest| rest.strip_suffix(')'))
                .ok_or_else(|| ThresholdParseError::UnknownAggregate {
                    aggregate: lhs.to_string(),
                    expression: expression.to_string(),
                })?;
            let p: f64 = p
                .parse()
                .map_err(|_| ThresholdParseError::InvalidPercentile(expression.to_string()))?;
            if !(0.0..=100.0).contains(&p) {
                return Err(ThresholdParseError::InvalidPercentile(expression.to_string()));
            }
            Ok(Aggregate::Percentile(p))
        }
    }
}

/// Parse a full threshold list: `metric: expr[, expr...]` groups separated by `;`
pub fn parse_thresholds(input: &str) -> Result<Vec<Threshold>, ThresholdParseError> {
    let mut thresholds = Vec::new();

    for group in input.split(';').map(str::trim).filter(|g| !g.is_empty()) {
        let (metric, expressions) = group
            .split_once(':')
            .ok_or_else(|| ThresholdParseError::MissingMetric(group.to_string()))?;

        for expression in expressions.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            thresholds.push(Threshold::parse(metric, expression)?);
        }
    }

    Ok(thresholds)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdStatus {
    Passed,
    Failed,
    /// Not enough samples to judge
    Skipped,
}

/// Result of evaluating one threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdOutcome {
    pub metric: MetricName,
    pub expression: String,
    pub observed: Option<f64>,
    pub samples: u64,
    pub status: ThresholdStatus,
}

impl ThresholdOutcome {
    pub fn failed(&self) -> bool {
        self.status == ThresholdStatus::Failed
    }
}

impl fmt::Display for ThresholdOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.metric, self.expression)?;
        match self.observed {
            Some(observed) if self.status != ThresholdStatus::Skipped => {
                write!(f, " (observed {:.4}, {} samples)", observed, self.samples)
            }
            _ => write!(f, " ({} samples)", self.samples),
        }
    }
}

/// Evaluate every threshold; the run passes iff none failed
pub fn evaluate_all(
    thresholds: &[Threshold],
    snapshot: &StatsSnapshot,
    min_samples: u64,
) -> (bool, Vec<ThresholdOutcome>) {
    let outcomes: Vec<ThresholdOutcome> = thresholds
        .iter()
        .map(|t| t.evaluate(snapshot, min_samples))
        .collect();
    let passed = !outcomes.iter().any(ThresholdOutcome::failed);
    (passed, outcomes)
}
