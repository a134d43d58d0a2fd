//! Bounded retry around node attempts
//!
//! A failing attempt is retried after a capped exponential delay until the
//! attempt budget runs out. Exhaustion is reported as a value, never raised,
//! so one bad node cannot take its siblings down with it.

use crate::config::CrawlerConfig;
use crate::{NodeError, NodeResult};
use std::future::Future;
use std::time::Duration;

/// Retry settings for one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,

    /// Delay after the first failed attempt
    pub base_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Whether a matched-but-empty extraction earns another attempt
    pub retry_empty_extraction: bool,
}

/// Result of running an attempt function under a [`RetryPolicy`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    /// The successful value, or `PermanentNodeFailure` wrapping the last cause
    pub result: NodeResult<T>,

    /// Attempts actually made
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.retry_delay(),
            max_delay: config.retry_max_delay(),
            retry_empty_extraction: config.retry_empty_extraction,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    fn should_retry(&self, error: &NodeError) -> bool {
        match error {
            NodeError::ExtractionEmpty(_) => self.retry_empty_extraction,
            other => other.is_retryable(),
        }
    }

    /// Runs `attempt_fn` until it succeeds or the budget is spent
    ///
    /// # Arguments
    ///
    /// * `label` - Name used in log lines
    /// * `attempt_fn` - Called with the 1-based attempt number
    pub async fn run<T, F, Fut>(&self, label: &str, mut attempt_fn: F) -> Attempted<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = NodeResult<T>>,
    {
        let mut attempt = 1;

        loop {
            match attempt_fn(attempt).await {
                Ok(value) => {
                    return Attempted {
                        result: Ok(value),
                        attempts: attempt,
                    }
                }
                Err(error) => {
                    let retry = self.should_retry(&error) && attempt < self.max_attempts;

                    if !retry {
                        return Attempted {
                            result: Err(NodeError::PermanentNodeFailure {
                                attempts: attempt,
                                cause: Box::new(error),
                            }),
                            attempts: attempt,
                        };
                    }

                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {} (retrying in {:?})",
                        attempt,
                        self.max_attempts,
                        label,
                        error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
