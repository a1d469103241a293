//! Retry policy for background jobs.
//!
//! # Responsibilities
//! - Decide whether a failed job is retried or dead-lettered
//! - Supply the delay before a retried job re-enters its queue
//!
//! # Design Decisions
//! - Fixed delay, no exponential growth and no jitter
//! - `max_retries` counts total attempts, so a job runs at most `max_retries` times
//! - The circuit breaker never retries; only the worker does

use std::time::Duration;

/// What happens to a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-enqueue at the tail of the live queue after the delay.
    RetryAfter(Duration),
    /// Budget exhausted; move to the failed queue.
    Exhausted,
}

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    delay: Duration,
}

impl RetryPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    /// Decide after a failure; `attempts` already includes the failed attempt.
    pub fn decide(&self, attempts: u32, max_retries: u32) -> RetryDecision {
        if attempts < max_retries {
            RetryDecision::RetryAfter(self.delay)
        } else {
            RetryDecision::Exhausted
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay_until_exhausted() {
        let policy = RetryPolicy::fixed(Duration::from_millis(10));

        assert_eq!(policy.decide(1, 3), RetryDecision::RetryAfter(Duration::from_millis(10)));
        assert_eq!(policy.decide(2, 3), RetryDecision::RetryAfter(Duration::from_millis(10)));
        assert_eq!(policy.decide(3, 3), RetryDecision::Exhausted);
        assert_eq!(policy.decide(4, 3), RetryDecision::Exhausted);
    }

    #[test]
    fn test_single_attempt_budget() {
        let policy = RetryPolicy::fixed(Duration::from_secs(5));
        assert_eq!(policy.decide(1, 1), RetryDecision::Exhausted);
    }
}
