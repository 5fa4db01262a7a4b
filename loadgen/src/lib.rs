//! Merch shop load generator library
//!
//! Ramps virtual clients through per-scenario stage profiles against the shop's HTTP
//! API and evaluates the collected checks and durations against thresholds. Exported
//! for the binary, integration tests and external tooling.

pub mod config;
pub mod pool;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod schedule;
pub mod stats;
pub mod target;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use report::RunReport;
pub use runner::{RunError, Runner};
pub use scenario::{Scenario, ScenarioContext, ScenarioRegistry, SetupState};
pub use schedule::{RampProfile, RateLimiter};
pub use stats::{MetricsCollector, Threshold};
pub use target::{HttpTarget, TargetService};
