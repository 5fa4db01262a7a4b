//! Load generator configuration
//!
//! Configuration is loaded from environment variables. Every variable is optional and
//! overrides one default when present and parseable.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::pool::PoolSettings;
use crate::scenario::{IdentityPlan, ScenarioPeaks, ScenarioSettings};
use crate::schedule::{DEFAULT_HOLD, DEFAULT_RISE};
use crate::stats::{Threshold, ThresholdParseError, parse_thresholds};
use crate::target::Credentials;

/// Thresholds applied when `THRESHOLDS` is not set
pub const DEFAULT_THRESHOLDS: &str = "http_req_failed: rate<0.0001; http_req_duration: p(95)<50";

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Target base URL '{0}' must start with http:// or https://")]
    InvalidBaseUrl(String),

    #[error("Sample interval must be greater than zero")]
    ZeroSampleInterval,

    #[error("Report interval must be greater than zero")]
    ZeroReportInterval,

    #[error("Request timeout must be greater than zero")]
    ZeroRequestTimeout,

    #[error("Invalid thresholds: {0}")]
    Thresholds(#[from] ThresholdParseError),
}

/// Main load generator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Scenario to run; `None` generates no traffic
    pub scenario: Option<String>,

    /// Target service configuration
    pub target: TargetConfig,

    /// Ramp and pacing configuration
    pub load: LoadConfig,

    /// Identities provisioned before the run
    pub setup: IdentityPlan,

    /// Fixed data the scenarios draw from
    pub scenarios: ScenarioSettings,

    /// Pass/fail criteria
    pub thresholds: ThresholdConfig,

    /// Where results go besides the log
    pub output: OutputConfig,
}

/// Target-service configuration
#[derive(Debug, Clone)]
pub struct TargetConfig {
    /// Base URL of the service under test
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

/// Ramp and pacing configuration
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Global request ceiling per second; 0 disables the limiter
    pub rps: u32,
    /// Pause between iterations of one client
    pub think_time: Duration,
    /// Transition segment before each peak
    pub stage_rise: Duration,
    /// Hold segment at each peak
    pub stage_hold: Duration,
    /// How often the pool reconciles live clients with the profile
    pub sample_interval: Duration,
    /// Progress log cadence
    pub report_interval: Duration,
    /// Ramp peaks per scenario
    pub peaks: ScenarioPeaks,
    /// Base seed for scenario randomness
    pub seed: Option<u64>,
}

/// Threshold configuration
#[derive(Debug, Clone)]
pub struct ThresholdConfig {
    /// `metric: expr` groups separated by `;`
    pub expressions: String,
    /// Thresholds watching fewer samples than this are skipped
    pub min_samples: u64,
}

/// Result sinks
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// JSON run summary file
    pub summary_path: Option<PathBuf>,
    /// Prometheus listener address
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scenario: None,
            target: TargetConfig::default(),
            load: LoadConfig::default(),
            setup: IdentityPlan::default(),
            scenarios: ScenarioSettings::default(),
            thresholds: ThresholdConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            rps: 1100,
            think_time: Duration::from_secs(1),
            stage_rise: DEFAULT_RISE,
            stage_hold: DEFAULT_HOLD,
            sample_interval: Duration::from_millis(100),
            report_interval: Duration::from_secs(5),
            peaks: ScenarioPeaks::default(),
            seed: None,
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            expressions: DEFAULT_THRESHOLDS.to_string(),
            min_samples: 1,
        }
    }
}

impl LoadConfig {
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            sample_interval: self.sample_interval,
            think_time: self.think_time,
            report_interval: self.report_interval,
            seed: self.seed,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Selection
        if let Some(name) = lookup("SCENARIO")
            && !name.trim().is_empty()
        {
            config.scenario = Some(name.trim().to_string());
        }

        // Target config
        if let Some(url) = lookup("TARGET_BASE_URL")
            && !url.is_empty()
        {
            config.target.base_url = url;
        }
        if let Some(secs) = parse_var(&lookup, "REQUEST_TIMEOUT_SECS") {
            config.target.request_timeout = Duration::from_secs(secs);
        }

        // Load config
        if let Some(rps) = parse_var(&lookup, "RPS") {
            config.load.rps = rps;
        }
        if let Some(ms) = parse_var(&lookup, "THINK_TIME_MS") {
            config.load.think_time = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var(&lookup, "STAGE_RISE_SECS") {
            config.load.stage_rise = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var(&lookup, "STAGE_HOLD_SECS") {
            config.load.stage_hold = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var(&lookup, "SAMPLE_INTERVAL_MS") {
            config.load.sample_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var(&lookup, "REPORT_INTERVAL_SECS") {
            config.load.report_interval = Duration::from_secs(secs);
        }
        if let Some(seed) = parse_var(&lookup, "SEED") {
            config.load.seed = Some(seed);
        }

        // Peaks
        let peaks = &mut config.load.peaks;
        for (key, slot) in [
            ("PEAKS_AUTH", &mut peaks.auth),
            ("PEAKS_INFO", &mut peaks.info),
            ("PEAKS_SEND_COIN", &mut peaks.send_coin),
            ("PEAKS_BUY", &mut peaks.buy),
        ] {
            if let Some(val) = lookup(key) {
                match parse_peaks(&val) {
                    Some(parsed) => *slot = parsed,
                    None => warn!("Ignoring {}={:?}: expected comma-separated integers", key, val),
                }
            }
        }

        // Setup config
        if let Some(count) = parse_var(&lookup, "SETUP_IDENTITIES") {
            config.setup.count = count;
        }
        if let Some(prefix) = lookup("IDENTITY_PREFIX")
            && !prefix.is_empty()
        {
            config.setup.prefix = prefix;
        }
        if let Some(password) = lookup("IDENTITY_PASSWORD") {
            config.setup.password = password;
        }

        // Scenario data
        if let Some(user) = lookup("AUTH_USER")
            && !user.is_empty()
        {
            config.scenarios.auth_user = Credentials::new(user, config.setup.password.clone());
        } else {
            config.scenarios.auth_user.password = config.setup.password.clone();
        }
        if let Some(amount) = parse_var(&lookup, "TRANSFER_AMOUNT") {
            config.scenarios.transfer_amount = amount;
        }
        if let Some(items) = lookup("SHOP_ITEMS") {
            config.scenarios.catalog = items
                .split(',')
                .map(str::trim)
                .filter(|i| !i.is_empty())
                .map(String::from)
                .collect();
        }

        // Threshold config
        if let Some(expressions) = lookup("THRESHOLDS") {
            config.thresholds.expressions = expressions;
        }
        if let Some(min) = parse_var(&lookup, "THRESHOLD_MIN_SAMPLES") {
            config.thresholds.min_samples = min;
        }

        // Output config
        if let Some(path) = lookup("SUMMARY_PATH")
            && !path.is_empty()
        {
            config.output.summary_path = Some(PathBuf::from(path));
        }
        if let Some(addr) = parse_var(&lookup, "METRICS_ADDR") {
            config.output.metrics_addr = Some(addr);
        }

        config
    }

    /// Parsed threshold list
    pub fn thresholds(&self) -> Result<Vec<Threshold>, ConfigError> {
        Ok(parse_thresholds(&self.thresholds.expressions)?)
    }

    /// Reject values the run cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.target.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(url.clone()));
        }
        if self.target.request_timeout.is_zero() {
            return Err(ConfigError::ZeroRequestTimeout);
        }
        if self.load.sample_interval.is_zero() {
            return Err(ConfigError::ZeroSampleInterval);
        }
        if self.load.report_interval.is_zero() {
            return Err(ConfigError::ZeroReportInterval);
        }
        self.thresholds()?;
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let val = lookup(key)?;
    match val.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid value", key, val);
            None
        }
    }
}

/// Parse `"150, 200,250"` into peaks. An empty string is an empty list.
pub fn parse_peaks(input: &str) -> Option<Vec<u32>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.parse().ok())
        .collect()
}
