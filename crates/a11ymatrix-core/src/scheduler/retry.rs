//! Retry policy: bounded attempts with exponential backoff.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::error::{AdapterError, FailureClass};

/// How often and how patiently transient failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = run once).
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub backoff_base_ms: u64,
    /// Upper bound for a single delay.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base_ms: 500,
            max_backoff_ms: 30_000,
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    GiveUp,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            max_retries,
            backoff_base_ms,
            ..Self::default()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(32);
        let ms = self
            .backoff_base_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    /// Decide after attempt `attempt` failed with `error`.
    pub fn decide(&self, attempt: u32, error: &AdapterError) -> RetryDecision {
        if error.class() == FailureClass::Permanent || attempt >= self.max_attempts() {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry {
            delay: self.backoff_for(attempt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, 500);
        assert_eq!(policy.backoff_for(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(1_000));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(2_000));
        assert_eq!(policy.backoff_for(60), Duration::from_millis(30_000));
    }

    #[test]
    fn transient_retried_until_max_attempts() {
        let policy = RetryPolicy::new(2, 10);
        let err = AdapterError::Network("reset".into());
        assert!(matches!(policy.decide(1, &err), RetryDecision::Retry { .. }));
        assert!(matches!(policy.decide(2, &err), RetryDecision::Retry { .. }));
        assert_eq!(policy.decide(3, &err), RetryDecision::GiveUp);
    }

    #[test]
    fn permanent_never_retried() {
        let policy = RetryPolicy::new(5, 10);
        for err in [
            AdapterError::MalformedUrl("x".into()),
            AdapterError::HttpStatus { status: 404 },
            AdapterError::Unsupported("no layout".into()),
        ] {
            assert_eq!(policy.decide(1, &err), RetryDecision::GiveUp);
        }
    }

    #[test]
    fn zero_retries_runs_once() {
        let policy = RetryPolicy::new(0, 10);
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(
            policy.decide(1, &AdapterError::Timeout { elapsed_ms: 5 }),
            RetryDecision::GiveUp
        );
    }
}
