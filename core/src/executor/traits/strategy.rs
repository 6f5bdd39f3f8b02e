use std::time::Duration;

use crate::error::ServiceError;

/// Retry strategy plugin for transient service failures.
///
/// `attempt` counts calls already made for the current generate or critique
/// step, starting at 1. Revision attempts are never consumed by retries.
pub trait RetryStrategyPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn next_delay(&self, attempt: u32, error: &ServiceError) -> Option<Duration>;
    fn max_attempts(&self) -> u32;
    fn should_retry(&self, attempt: u32, error: &ServiceError) -> bool {
        attempt < self.max_attempts() && error.is_retryable()
    }
}
