use std::time::Duration;

use crew_core::api::{RetryConfig, RetryStrategyPlugin, ServiceError};

pub use crew_core::api::ExponentialBackoffPlugin;

/// Grows the delay by `base_delay_ms` per failed call.
pub struct LinearRetryPlugin {
    config: RetryConfig,
}

impl LinearRetryPlugin {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl RetryStrategyPlugin for LinearRetryPlugin {
    fn name(&self) -> &str {
        "linear"
    }

    fn next_delay(&self, attempt: u32, error: &ServiceError) -> Option<Duration> {
        if !self.should_retry(attempt, error) {
            return None;
        }
        let multiplier = attempt.max(1) as u64;
        let delay = self.config.base_delay_ms.saturating_mul(multiplier);
        let delay = delay.min(self.config.max_delay_ms);
        Some(Duration::from_millis(delay))
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }
}
