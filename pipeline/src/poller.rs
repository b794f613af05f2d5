//! Bounded completion polling for submitted queries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fxflow_common::{FxFlowError, Result};
use tracing::{debug, error, instrument, warn};

use crate::clients::query::{QueryEngine, QueryRequest, QueryState};

/// How the delay between status checks grows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay every time.
    Fixed,
    /// Multiply the delay by `factor` after each check, capped at `max_interval`.
    Exponential { factor: f64, max_interval: Duration },
}

/// Polling bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay before the second status check.
    pub interval: Duration,
    /// Status checks before giving up.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 150,
            backoff: Backoff::Fixed,
        }
    }
}

impl PollPolicy {
    /// Delay after the `attempt`-th status check (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential {
                factor,
                max_interval,
            } => {
                let exponent = attempt.saturating_sub(1).min(64) as i32;
                let secs = self.interval.as_secs_f64() * factor.powi(exponent);
                if !secs.is_finite() || secs >= max_interval.as_secs_f64() {
                    max_interval
                } else {
                    Duration::from_secs_f64(secs)
                }
            }
        }
    }
}

/// Suspends the poller between status checks.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Drives a query to a terminal state.
pub struct QueryPoller {
    policy: PollPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl QueryPoller {
    pub fn new(policy: PollPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { policy, sleeper }
    }

    /// Poller that sleeps on the tokio timer.
    pub fn with_policy(policy: PollPolicy) -> Self {
        Self::new(policy, Arc::new(TokioSleeper))
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll until the execution reaches a terminal state.
    ///
    /// Succeeds only on `Succeeded`. Any other terminal state, or running out
    /// of attempts, is an external call failure.
    #[instrument(skip(self, engine), fields(engine = engine.name()))]
    pub async fn wait(&self, engine: &dyn QueryEngine, execution_id: &str) -> Result<()> {
        let mut last = QueryState::Queued;

        for attempt in 1..=self.policy.max_attempts {
            let status = engine.query_status(execution_id).await?;

            if status.state != last && !last.can_transition_to(status.state) {
                warn!(from = ?last, to = ?status.state, "Unexpected query state transition");
            }
            last = status.state;
            debug!(attempt, state = ?status.state, "Query status");

            if status.state.is_terminal() {
                if status.state == QueryState::Succeeded {
                    return Ok(());
                }
                let reason = status.reason.unwrap_or_else(|| "no reason given".to_string());
                error!(state = ?status.state, reason = %reason, "Query did not succeed");
                return Err(FxFlowError::external(
                    engine.name(),
                    format!("query {execution_id} {:?}: {reason}", status.state),
                ));
            }

            if attempt < self.policy.max_attempts {
                self.sleeper.sleep(self.policy.delay_for(attempt)).await;
            }
        }

        error!(
            max_attempts = self.policy.max_attempts,
            state = ?last,
            "Query polling timed out"
        );
        Err(FxFlowError::external(
            engine.name(),
            format!(
                "query {execution_id} still {last:?} after {} status checks",
                self.policy.max_attempts
            ),
        ))
    }

    /// Submit, wait, and read the single numeric cell of the result.
    pub async fn execute_scalar(&self, engine: &dyn QueryEngine, request: &QueryRequest) -> Result<f64> {
        let execution_id = engine.start_query(request).await?;
        debug!(execution_id = %execution_id, "Query started");
        self.wait(engine, &execution_id).await?;
        engine.query_results(&execution_id).await?.scalar_f64()
    }
}
