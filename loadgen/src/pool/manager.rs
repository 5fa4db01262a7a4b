//! Virtual client pool
//!
//! A controller loop samples the ramp profile on a fixed interval and spawns or
//! retires clients until the live count matches the target. Retirement is LIFO; a
//! retired client finishes its in-flight iteration before it exits, and the pool
//! waits for every one of them before returning so no result is lost.

use futures_util::future::join_all;
use metrics::{counter, gauge};
use rand::SeedableRng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::client::{ClientShared, VirtualClient};
use crate::scenario::{Scenario, ScenarioContext, ScenarioError, ScenarioRng};
use crate::schedule::{RampProfile, RateLimiter};
use crate::stats::MetricsCollector;

/// Pool timing and seeding
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// How often the live count is reconciled with the profile
    pub sample_interval: Duration,
    /// Pause between iterations of one client
    pub think_time: Duration,
    /// Progress log cadence
    pub report_interval: Duration,
    /// Base seed; client `n` uses `seed + n`. Random when unset.
    pub seed: Option<u64>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_millis(100),
            think_time: Duration::from_secs(1),
            report_interval: Duration::from_secs(5),
            seed: None,
        }
    }
}

/// Target and live client count at one controller tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencySample {
    pub at: Duration,
    pub target: u32,
    pub clients: usize,
}

/// What the pool did over the run
#[derive(Debug, Clone, Default)]
pub struct PoolReport {
    pub peak_clients: usize,
    pub spawned: u64,
    pub iterations: u64,
    pub timeline: Vec<ConcurrencySample>,
    pub elapsed: Duration,
    /// Stopped by the shutdown signal before the profile finished
    pub aborted: bool,
}

impl PoolReport {
    /// Live client count at the last sample taken at or before `at`
    pub fn clients_at(&self, at: Duration) -> usize {
        self.timeline
            .iter()
            .take_while(|s| s.at <= at)
            .last()
            .map(|s| s.clients)
            .unwrap_or(0)
    }
}

struct LiveClient {
    retire: CancellationToken,
    handle: JoinHandle<u64>,
}

/// Owns the virtual clients of one run
pub struct ClientPool {
    settings: PoolSettings,
    collector: Arc<MetricsCollector>,
    limiter: Option<Arc<RateLimiter>>,
}

impl ClientPool {
    pub fn new(
        settings: PoolSettings,
        collector: Arc<MetricsCollector>,
        limiter: Option<Arc<RateLimiter>>,
    ) -> Self {
        Self {
            settings,
            collector,
            limiter,
        }
    }

    /// Drive `scenario` along `profile` until the profile is exhausted or `shutdown`
    /// resolves.
    ///
    /// A scenario error from any client stops the whole pool and is returned once every
    /// client has wound down.
    pub async fn run<F>(
        &self,
        scenario: Arc<dyn Scenario>,
        profile: &RampProfile,
        ctx: ScenarioContext,
        shutdown: F,
    ) -> Result<PoolReport, ScenarioError>
    where
        F: Future<Output = ()>,
    {
        let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();
        let shared = ClientShared {
            scenario: scenario.clone(),
            ctx,
            collector: self.collector.clone(),
            limiter: self.limiter.clone(),
            think_time: self.settings.think_time,
            fatal: fatal_tx,
        };

        let mut live: Vec<LiveClient> = Vec::new();
        let mut retired: Vec<JoinHandle<u64>> = Vec::new();
        let mut report = PoolReport::default();
        let mut fatal = None;

        let mut ticker = interval(self.settings.sample_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut next_progress = self.settings.report_interval;

        info!(
            "Starting scenario {} for {:?} (peak {} clients)",
            scenario.name(),
            profile.total_duration(),
            profile.max_target()
        );

        tokio::pin!(shutdown);
        let start = Instant::now();

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Shutdown requested, retiring {} clients", live.len());
                    report.aborted = true;
                    break;
                }
                Some(err) = fatal_rx.recv() => {
                    fatal = Some(err);
                    break;
                }
                _ = ticker.tick() => {}
            }

            let elapsed = start.elapsed();
            if profile.is_finished(elapsed) {
                break;
            }

            let target = profile.target_at(elapsed);
            let wanted = target as usize;

            while live.len() < wanted {
                let id = report.spawned;
                let retire = CancellationToken::new();
                let client = VirtualClient::new(id, shared.clone(), self.client_rng(id), retire.clone());
                live.push(LiveClient {
                    retire,
                    handle: tokio::spawn(client.run()),
                });
                report.spawned += 1;
                counter!("loadgen_clients_spawned_total").increment(1);
            }

            while live.len() > wanted {
                if let Some(client) = live.pop() {
                    client.retire.cancel();
                    retired.push(client.handle);
                }
            }

            report.peak_clients = report.peak_clients.max(live.len());
            report.timeline.push(ConcurrencySample {
                at: elapsed,
                target,
                clients: live.len(),
            });
            gauge!("loadgen_virtual_clients").set(live.len() as f64);

            if elapsed >= next_progress {
                self.log_progress(elapsed, target, live.len()).await;
                next_progress += self.settings.report_interval;
            }
        }

        for client in live.drain(..) {
            client.retire.cancel();
            retired.push(client.handle);
        }

        for result in join_all(retired).await {
            match result {
                Ok(iterations) => report.iterations += iterations,
                Err(e) => warn!("Client task failed: {}", e),
            }
        }
        gauge!("loadgen_virtual_clients").set(0.0);
        report.elapsed = start.elapsed();

        // Errors raised by clients that were still finishing up
        if fatal.is_none() {
            fatal = fatal_rx.try_recv().ok();
        }
        if let Some(err) = fatal {
            return Err(err);
        }

        info!(
            "Scenario {} finished: {} iterations, peak {} clients, {:?}",
            scenario.name(),
            report.iterations,
            report.peak_clients,
            report.elapsed
        );
        Ok(report)
    }

    fn client_rng(&self, id: u64) -> ScenarioRng {
        let seed = match self.settings.seed {
            Some(seed) => seed.wrapping_add(id),
            None => rand::random(),
        };
        ScenarioRng::seed_from_u64(seed)
    }

    async fn log_progress(&self, elapsed: Duration, target: u32, live: usize) {
        let p95 = self
            .collector
            .duration_percentile(95.0)
            .await
            .map(|d| format!("{:.1}ms", d.as_secs_f64() * 1000.0))
            .unwrap_or_else(|| "-".to_string());

        info!(
            "[{:>4}s] clients {}/{} | requests {} | failed {:.4}% | p95 {}",
            elapsed.as_secs(),
            live,
            target,
            self.collector.requests(),
            self.collector.failure_rate() * 100.0,
            p95
        );
    }
}
