//! Run report: aggregate outcome of one load run

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

use crate::scenario::SetupReport;
use crate::stats::{CheckSummary, LatencySummary, ThresholdOutcome, ThresholdStatus};

/// Everything a run produced, ready for printing or export
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Selected scenario, `None` for a zero-traffic run
    pub scenario: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub setup: Option<SetupReport>,
    pub checks: Vec<CheckSummary>,
    pub requests: u64,
    pub failed_requests: u64,
    pub failure_rate: f64,
    /// Provisioning requests, excluded from the request metrics above
    pub setup_requests: u64,
    pub latency: Option<LatencySummary>,
    pub peak_clients: usize,
    pub spawned_clients: u64,
    pub iterations: u64,
    /// Stopped by a shutdown signal before the profile finished
    pub aborted: bool,
    pub thresholds: Vec<ThresholdOutcome>,
    pub passed: bool,
}

impl RunReport {
    pub fn failed_thresholds(&self) -> impl Iterator<Item = &ThresholdOutcome> {
        self.thresholds.iter().filter(|t| t.failed())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_json()?)
    }

    pub fn print_summary(&self) {
        println!();
        println!("═══════════════════════════════════════════════════════════════");
        println!(
            " RUN {}: {}",
            self.run_id,
            self.scenario.as_deref().unwrap_or("(no scenario)")
        );
        println!("═══════════════════════════════════════════════════════════════");
        println!();

        if let Some(ref setup) = self.setup {
            println!(" ─── Setup ───────────────────────────────────────────────────");
            println!();
            println!(
                "   Identities:   {}/{} provisioned",
                setup.provisioned, setup.requested
            );
            if !setup.failed.is_empty() {
                println!("   Failed:       {}", setup.failed.join(", "));
            }
            println!();
        }

        if !self.checks.is_empty() {
            println!(" ─── Checks ──────────────────────────────────────────────────");
            println!();
            for check in &self.checks {
                let mark = if check.fails == 0 { "✓" } else { "✗" };
                println!(
                    "   {} {:10} {:28} {:>8} pass {:>8} fail",
                    mark, check.scenario, check.name, check.passes, check.fails
                );
            }
            println!();
        }

        println!(" ─── Requests ────────────────────────────────────────────────");
        println!();
        println!("   Total:        {}", self.requests);
        println!(
            "   Failed:       {} ({:.4}%)",
            self.failed_requests,
            self.failure_rate * 100.0
        );
        println!("   Iterations:   {}", self.iterations);
        println!("   Peak clients: {}", self.peak_clients);
        if let Some(ref l) = self.latency {
            println!(
                "   Duration:     min={:.1}ms avg={:.1}ms med={:.1}ms max={:.1}ms",
                l.min_ms, l.avg_ms, l.med_ms, l.max_ms
            );
            println!(
                "                 p90={:.1}ms p95={:.1}ms p99={:.1}ms",
                l.p90_ms, l.p95_ms, l.p99_ms
            );
        }
        println!();

        if !self.thresholds.is_empty() {
            println!(" ─── Thresholds ──────────────────────────────────────────────");
            println!();
            for outcome in &self.thresholds {
                let status = match outcome.status {
                    ThresholdStatus::Passed => "PASS",
                    ThresholdStatus::Failed => "FAIL",
                    ThresholdStatus::Skipped => "SKIP",
                };
                println!("   {:4}  {}", status, outcome);
            }
            println!();
        }

        println!("═══════════════════════════════════════════════════════════════");
        let overall = if self.passed {
            "PASS"
        } else {
            "FAIL (threshold exceeded)"
        };
        if self.aborted {
            println!(" OVERALL: {} (aborted early)", overall);
        } else {
            println!(" OVERALL: {}", overall);
        }
        println!("═══════════════════════════════════════════════════════════════");
        println!();
    }
}
