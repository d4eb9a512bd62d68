//! Retry policy for retryable action failures

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Doubling stops here so the delay cannot overflow
const MAX_BACKOFF_SHIFT: u32 = 16;

/// How often, and how patiently, a retryable failure is reattempted
///
/// `max_retries` counts reattempts after the first failure, so an action
/// is run at most `max_retries + 1` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,

    /// Delay before the first reattempt
    pub backoff: Duration,

    /// Double the delay after each further failure
    #[serde(default)]
    pub exponential: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_secs(1),
            exponential: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Never retry
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
            exponential: false,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn exponential(mut self) -> Self {
        self.exponential = true;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if !self.exponential {
            return self.backoff;
        }
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.backoff.saturating_mul(1u32 << shift)
    }

    /// Whether another attempt is allowed after `attempt` failures
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }
}
