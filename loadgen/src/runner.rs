//! Run orchestration: selection, setup, pool, threshold evaluation

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{Config, ConfigError};
use crate::pool::{ClientPool, PoolReport};
use crate::report::RunReport;
use crate::scenario::{
    RegistryError, ScenarioContext, ScenarioError, ScenarioRegistry, SetupProvider, SetupReport,
};
use crate::schedule::RateLimiter;
use crate::stats::{MetricsCollector, Threshold, evaluate_all};
use crate::target::TargetService;

/// Errors that stop a run before it can produce a report
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error("Run aborted during setup")]
    AbortedDuringSetup,
}

/// One configured load run against one target
pub struct Runner {
    config: Config,
    target: Arc<dyn TargetService>,
    registry: ScenarioRegistry,
    thresholds: Vec<Threshold>,
    collector: Arc<MetricsCollector>,
}

impl Runner {
    /// Validate `config` and build the built-in scenario registry from it
    pub fn from_config(config: Config, target: Arc<dyn TargetService>) -> Result<Self, RunError> {
        config.validate()?;
        let thresholds = config.thresholds()?;
        let registry = ScenarioRegistry::builtin(
            &config.load.peaks,
            config.load.stage_rise,
            config.load.stage_hold,
        );

        Ok(Self {
            config,
            target,
            registry,
            thresholds,
            collector: Arc::new(MetricsCollector::new()),
        })
    }

    /// Replace the scenario registry
    pub fn with_registry(mut self, registry: ScenarioRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &ScenarioRegistry {
        &self.registry
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    /// Execute the selected scenario, or nothing when none is selected.
    ///
    /// Threshold violations do not error: they come back as `passed == false` in the
    /// report. Errors are reserved for configuration problems and an abort during setup.
    pub async fn run<F>(&self, shutdown: F) -> Result<RunReport, RunError>
    where
        F: Future<Output = ()>,
    {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let Some(descriptor) = self.registry.select(self.config.scenario.as_deref())? else {
            info!("No scenario selected, nothing to run");
            return Ok(self
                .finish(run_id, started_at, None, None, PoolReport::default())
                .await);
        };
        info!("Run {} selected scenario {}", run_id, descriptor.name);

        tokio::pin!(shutdown);

        let provider = SetupProvider::new(self.config.setup.clone());
        let (state, setup) = tokio::select! {
            result = provider.provision(self.target.as_ref(), &self.collector) => result,
            _ = shutdown.as_mut() => {
                warn!("Shutdown requested during setup");
                return Err(RunError::AbortedDuringSetup);
            }
        };

        descriptor
            .scenario
            .check_preconditions(&state, &self.config.scenarios)?;

        let ctx = ScenarioContext {
            target: self.target.clone(),
            state: Arc::new(state),
            settings: Arc::new(self.config.scenarios.clone()),
        };
        let pool = ClientPool::new(
            self.config.load.pool_settings(),
            self.collector.clone(),
            RateLimiter::per_second(self.config.load.rps),
        );

        let pool_report = pool
            .run(
                descriptor.scenario.clone(),
                &descriptor.profile,
                ctx,
                shutdown.as_mut(),
            )
            .await?;

        Ok(self
            .finish(
                run_id,
                started_at,
                Some(descriptor.name.clone()),
                Some(setup),
                pool_report,
            )
            .await)
    }

    async fn finish(
        &self,
        run_id: Uuid,
        started_at: chrono::DateTime<Utc>,
        scenario: Option<String>,
        setup: Option<SetupReport>,
        pool: PoolReport,
    ) -> RunReport {
        let snapshot = self.collector.snapshot().await;
        let (passed, thresholds) = evaluate_all(
            &self.thresholds,
            &snapshot,
            self.config.thresholds.min_samples,
        );

        for outcome in thresholds.iter().filter(|t| t.failed()) {
            warn!("Threshold failed: {}", outcome);
        }

        RunReport {
            run_id,
            scenario,
            started_at,
            finished_at: Utc::now(),
            setup,
            checks: self.collector.checks(),
            requests: snapshot.requests,
            failed_requests: snapshot.failed_requests,
            failure_rate: snapshot.failure_rate(),
            setup_requests: self.collector.setup_requests(),
            latency: snapshot.latency_summary(),
            peak_clients: pool.peak_clients,
            spawned_clients: pool.spawned,
            iterations: pool.iterations,
            aborted: pool.aborted,
            thresholds,
            passed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Endpoint;
    use crate::test_utils::StubTarget;
    use std::time::Duration;

    fn config(scenario: Option<&str>) -> Config {
        let mut config = Config::default();
        config.scenario = scenario.map(String::from);
        config.setup.count = 4;
        config.load.seed = Some(7);
        config.load.stage_hold = Duration::from_secs(3);
        config.load.peaks.info = vec![3];
        config.load.peaks.send_coin = vec![3];
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_scenario_generates_no_traffic() {
        let target = StubTarget::new();
        let runner = Runner::from_config(config(None), Arc::new(target.clone())).unwrap();

        let report = runner.run(std::future::pending()).await.unwrap();

        assert!(report.passed);
        assert!(report.scenario.is_none());
        assert!(report.setup.is_none());
        assert_eq!(report.requests, 0);
        assert_eq!(target.calls(Endpoint::Auth), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_info_run_passes() {
        let target = StubTarget::new();
        let runner = Runner::from_config(config(Some("info")), Arc::new(target.clone())).unwrap();

        let report = runner.run(std::future::pending()).await.unwrap();

        assert!(report.passed, "{:?}", report.thresholds);
        assert_eq!(report.peak_clients, 3);
        assert_eq!(report.setup_requests, 4);
        assert_eq!(report.requests, target.calls(Endpoint::Info) as u64);
        assert!(report.requests > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_scenario_is_error() {
        let runner = Runner::from_config(config(Some("refund")), Arc::new(StubTarget::new())).unwrap();
        let err = runner.run(std::future::pending()).await.unwrap_err();
        assert!(matches!(err, RunError::Registry(RegistryError::Unknown { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_precondition_failure_stops_before_load() {
        let target = StubTarget::new().failing_auth(["user0", "user1", "user2"]);
        let runner = Runner::from_config(config(Some("sendCoin")), Arc::new(target.clone())).unwrap();

        let err = runner.run(std::future::pending()).await.unwrap_err();

        assert!(matches!(
            err,
            RunError::Scenario(ScenarioError::InsufficientIdentities { available: 1, .. })
        ));
        assert_eq!(target.calls(Endpoint::SendCoin), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = config(None);
        config.thresholds.expressions = "latency: p(95)<10".to_string();
        assert!(matches!(
            Runner::from_config(config, Arc::new(StubTarget::new())),
            Err(RunError::Config(ConfigError::Thresholds(_)))
        ));
    }
}
