//! Fixed-interval retry policy.

use std::time::Duration;

use crate::config::RetrySettings;
use crate::errors::SyncError;

/// What the orchestrator does after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Transient failure with budget left: wait, then start over
    Retry { backoff: Duration },
    /// Transient failure on the last allowed attempt
    Exhausted,
    /// Non-transient failure: stop now, whatever budget is left
    Abort,
}

/// Attempt budget with a constant delay between attempts (no jitter, no growth)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Wait between a failed attempt and the next one
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self { max_attempts: settings.max_attempts.max(1), backoff: settings.backoff() }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), backoff }
    }

    /// Classifies the failure of 1-based `attempt`
    pub fn decide(&self, attempt: u32, error: &SyncError) -> RetryDecision {
        if !error.is_transient() {
            RetryDecision::Abort
        } else if attempt >= self.max_attempts {
            RetryDecision::Exhausted
        } else {
            RetryDecision::Retry { backoff: self.backoff }
        }
    }
}
