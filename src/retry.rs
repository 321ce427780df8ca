//! Retry capability injected into the weather service
//!
//! The service only sees the [`RetryExecutor`] trait; [`BackoffRetry`] is the
//! stock implementation with exponential backoff.

use crate::config::WeatherConfig;
use crate::{Result, WeatherError};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Skip the operation entirely and report [`WeatherError::Offline`]
    pub offline_mode: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&WeatherConfig::default())
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &WeatherConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay(),
            offline_mode: false,
        }
    }

    #[must_use]
    pub fn offline(mut self, offline_mode: bool) -> Self {
        self.offline_mode = offline_mode;
        self
    }

    /// Delay before retry number `attempt` (0-based), doubling each time
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// What is being retried, for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryContext {
    pub operation: &'static str,
    pub component: &'static str,
}

impl RetryContext {
    #[must_use]
    pub const fn new(component: &'static str, operation: &'static str) -> Self {
        Self {
            operation,
            component,
        }
    }
}

pub trait RetryExecutor: Send + Sync {
    /// Run `operation` until it succeeds, fails with a non-retryable error, or
    /// the policy's retry budget is spent
    fn execute_with_retry<T, F, Fut>(
        &self,
        operation: F,
        context: &RetryContext,
        policy: &RetryPolicy,
    ) -> impl Future<Output = Result<T>> + Send
    where
        T: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send;
}

/// Exponential backoff between attempts; only retryable errors are retried
#[derive(Debug, Clone, Copy, Default)]
pub struct BackoffRetry;

impl RetryExecutor for BackoffRetry {
    async fn execute_with_retry<T, F, Fut>(
        &self,
        mut operation: F,
        context: &RetryContext,
        policy: &RetryPolicy,
    ) -> Result<T>
    where
        T: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        if policy.offline_mode {
            debug!("{}: offline mode, skipping {}", context.component, context.operation);
            return Err(WeatherError::offline(context.operation));
        }

        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(
                            "{}: {} succeeded after {} retries",
                            context.component, context.operation, attempt
                        );
                    }
                    return Ok(value);
                }
                Err(error) if error.is_retryable() && attempt < policy.max_retries => {
                    let delay = policy.backoff_for_attempt(attempt);
                    attempt += 1;
                    warn!(
                        "{}: {} failed ({}), retry {}/{} in {}ms",
                        context.component,
                        context.operation,
                        error,
                        attempt,
                        policy.max_retries,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
