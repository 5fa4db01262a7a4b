//! A single virtual client: wait for a rate grant, run the scenario, record, think

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::scenario::{Scenario, ScenarioContext, ScenarioError, ScenarioRng};
use crate::schedule::RateLimiter;
use crate::stats::MetricsCollector;

/// Everything a client shares with its siblings
#[derive(Clone)]
pub(crate) struct ClientShared {
    pub scenario: Arc<dyn Scenario>,
    pub ctx: ScenarioContext,
    pub collector: Arc<MetricsCollector>,
    pub limiter: Option<Arc<RateLimiter>>,
    pub think_time: Duration,
    pub fatal: mpsc::UnboundedSender<ScenarioError>,
}

pub(crate) struct VirtualClient {
    id: u64,
    shared: ClientShared,
    rng: ScenarioRng,
    retire: CancellationToken,
}

impl VirtualClient {
    pub fn new(id: u64, shared: ClientShared, rng: ScenarioRng, retire: CancellationToken) -> Self {
        Self {
            id,
            shared,
            rng,
            retire,
        }
    }

    /// Loop until retired. Returns the number of completed iterations.
    ///
    /// Retirement cuts short the rate-limit wait and the think time, never a running
    /// iteration: whatever the scenario started is finished and recorded first.
    pub async fn run(mut self) -> u64 {
        let shared = &self.shared;
        let mut iterations = 0u64;
        debug!("Client {} started", self.id);

        loop {
            match &shared.limiter {
                Some(limiter) => {
                    tokio::select! {
                        biased;
                        _ = self.retire.cancelled() => break,
                        _ = limiter.acquire() => {}
                    }
                }
                None if self.retire.is_cancelled() => break,
                None => {}
            }

            match shared.scenario.execute(&shared.ctx, &mut self.rng).await {
                Ok(iteration) => {
                    shared.collector.record_iteration(&iteration).await;
                    iterations += 1;
                }
                Err(e) => {
                    error!("Client {} stopped on scenario error: {}", self.id, e);
                    let _ = shared.fatal.send(e);
                    break;
                }
            }

            tokio::select! {
                biased;
                _ = self.retire.cancelled() => break,
                _ = tokio::time::sleep(shared.think_time) => {}
            }
        }

        debug!("Client {} retired after {} iterations", self.id, iterations);
        iterations
    }
}
