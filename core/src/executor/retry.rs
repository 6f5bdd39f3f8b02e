use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::ServiceError;

use super::traits::RetryStrategyPlugin;

/// Doubles the delay after every failed call, capped at `max_delay_ms`.
///
/// The engine falls back to this with [`RetryConfig::default`] when no
/// strategy is supplied.
pub struct ExponentialBackoffPlugin {
    config: RetryConfig,
}

impl ExponentialBackoffPlugin {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl Default for ExponentialBackoffPlugin {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryStrategyPlugin for ExponentialBackoffPlugin {
    fn name(&self) -> &str {
        "exponential-backoff"
    }

    fn next_delay(&self, attempt: u32, error: &ServiceError) -> Option<Duration> {
        if !self.should_retry(attempt, error) {
            return None;
        }
        let exp = 1u64 << attempt.saturating_sub(1).min(30);
        let delay = self.config.base_delay_ms.saturating_mul(exp);
        let delay = delay.min(self.config.max_delay_ms);
        Some(Duration::from_millis(delay))
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }
}
