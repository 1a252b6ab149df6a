use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::AgentError;

/// Attempts and backoff for one named step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
        }
    }
}

/// Runs named units of work, retrying each independently.
///
/// Steps must be safe to re-invoke: a failed attempt is simply run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepRunner {
    policy: RetryPolicy,
}

impl StepRunner {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Runner used outside the durable engine: every step runs exactly once.
    pub fn inline() -> Self {
        Self::new(RetryPolicy::once())
    }

    pub async fn run<T, F, Fut>(&self, name: &str, mut step: F) -> Result<T, AgentError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AgentError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match step().await {
                Ok(value) => {
                    debug!(step = name, attempt, "Step completed");
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts => {
                    let backoff = self.policy.backoff_after(attempt);
                    warn!(
                        step = name,
                        attempt,
                        error = %e,
                        backoff_ms = backoff.as_millis() as u64,
                        "Step failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(step = name, attempt, error = %e, "Step failed, giving up");
                    return Err(e);
                }
            }
        }
    }
}
