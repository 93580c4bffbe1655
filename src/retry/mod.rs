//! Bounded retry decisions for fallible target steps.
//!
//! The policy is stateless: callers own their attempt counters and ask
//! `should_retry` after each failure. Backoff is linear so retries look like
//! a person trying again, not a client hammering the page.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::RetryConfig;

/// Failure classes the policy distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorClass {
    /// Element missing, navigation hiccup, slow page.
    TransientUi,
    /// Anything involving authentication.
    Auth,
    /// Not worth repeating.
    Fatal,
}

/// Outcome of one `should_retry` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub retry: bool,
    pub backoff: Duration,
}

impl RetryDecision {
    pub fn stop() -> Self {
        Self {
            retry: false,
            backoff: Duration::ZERO,
        }
    }

    pub fn after(backoff: Duration) -> Self {
        Self { retry: true, backoff }
    }

    pub fn backoff_ms(&self) -> u64 {
        self.backoff.as_millis() as u64
    }
}

/// Retry policy for target steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Retry N waits N * base_delay.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Decide whether the step that just failed on `attempt` (1-based) runs again.
    ///
    /// AUTH and FATAL never retry. TRANSIENT_UI retries until `max_attempts`
    /// have been used, waiting `attempt * base_delay` before the next one.
    pub fn should_retry(&self, attempt: u32, class: ErrorClass) -> RetryDecision {
        match class {
            ErrorClass::Auth | ErrorClass::Fatal => RetryDecision::stop(),
            ErrorClass::TransientUi if attempt >= self.max_attempts => RetryDecision::stop(),
            ErrorClass::TransientUi => {
                let backoff = self.base_delay.checked_mul(attempt.max(1)).unwrap_or(Duration::MAX);
                RetryDecision::after(backoff)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_auth_never_retried() {
        let policy = RetryPolicy::default();
        for attempt in 0..10 {
            assert!(!policy.should_retry(attempt, ErrorClass::Auth).retry);
        }
    }

    #[test]
    fn test_fatal_never_retried() {
        let policy = RetryPolicy::default();
        for attempt in 0..10 {
            assert!(!policy.should_retry(attempt, ErrorClass::Fatal).retry);
        }
    }

    #[test]
    fn test_transient_retried_twice_then_stops() {
        let policy = RetryPolicy::default();
        let first = policy.should_retry(1, ErrorClass::TransientUi);
        let second = policy.should_retry(2, ErrorClass::TransientUi);
        let third = policy.should_retry(3, ErrorClass::TransientUi);

        assert!(first.retry);
        assert!(second.retry);
        assert!(!third.retry);
        assert!(second.backoff > first.backoff);
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::new(5, Duration::from_millis(250));
        assert_eq!(policy.should_retry(1, ErrorClass::TransientUi).backoff_ms(), 250);
        assert_eq!(policy.should_retry(2, ErrorClass::TransientUi).backoff_ms(), 500);
        assert_eq!(policy.should_retry(3, ErrorClass::TransientUi).backoff_ms(), 750);
        assert_eq!(policy.should_retry(4, ErrorClass::TransientUi).backoff_ms(), 1000);
        assert!(!policy.should_retry(5, ErrorClass::TransientUi).retry);
    }

    #[test]
    fn test_stop_has_no_backoff() {
        let decision = RetryPolicy::default().should_retry(3, ErrorClass::TransientUi);
        assert_eq!(decision.backoff, Duration::ZERO);
    }

    #[test]
    fn test_from_config() {
        let config = RetryConfig {
            base_delay_ms: 20,
            max_attempts: 0,
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.base_delay, Duration::from_millis(20));
        assert!(!policy.should_retry(1, ErrorClass::TransientUi).retry);
    }
}
