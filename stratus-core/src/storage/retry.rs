//! Retry policy for waiting on the storage dependency.

use std::time::Duration;

/// Fixed-interval retry policy.
///
/// The storage service is a hard dependency: the core waits for it rather
/// than giving up, so the default policy retries forever. The attempt cap
/// exists so a bounded variant can be swapped in without touching the
/// sequencer's loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay between attempts.
    pub interval: Duration,
    /// Maximum number of attempts, or `None` to retry without bound.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Fixed-interval policy with no attempt bound.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    /// Cap the number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Whether another attempt is allowed after `attempt` failures.
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt < max)
    }

    /// Delay to wait before the next attempt.
    pub fn delay(&self) -> Duration {
        self.interval
    }
}
