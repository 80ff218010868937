//! Bounded retry with exponential backoff
//!
//! The policy is pure: [`RetryPolicy::delay_for_attempt`] maps a failed
//! attempt number to the wait before the next one, so the schedule can be
//! checked without sleeping. [`RetryState`] tracks one call's progress.

use std::time::Duration;

/// Default maximum attempts per call
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff (milliseconds)
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;

/// Retry budget and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Wait after the first failed attempt; doubles after each further failure
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
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

    /// Same budget, no waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Wait after the given failed attempt (1-based): `base * 2^(attempt - 1)`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Start tracking a new call
    pub fn start<E>(&self) -> RetryState<E> {
        RetryState {
            attempt: 0,
            max_attempts: self.max_attempts,
            last_error: None,
        }
    }
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait, then try again
    Retry { attempt: u32, delay: Duration },
    /// Budget exhausted
    GiveUp { attempts: u32 },
}

/// Progress of one retried call
#[derive(Debug)]
pub struct RetryState<E> {
    attempt: u32,
    max_attempts: u32,
    last_error: Option<E>,
}

impl<E> RetryState<E> {
    /// Register the start of an attempt and return its 1-based number
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    /// Record a failure of the current attempt
    pub fn record_failure(&mut self, error: E, policy: &RetryPolicy) -> RetryDecision {
        self.last_error = Some(error);
        if self.attempt >= self.max_attempts {
            RetryDecision::GiveUp {
                attempts: self.attempt,
            }
        } else {
            RetryDecision::Retry {
                attempt: self.attempt,
                delay: policy.delay_for_attempt(self.attempt),
            }
        }
    }

    pub fn last_error(&self) -> Option<&E> {
        self.last_error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_state_gives_up_after_budget() {
        let policy = RetryPolicy::default();
        let mut state = policy.start::<&str>();

        assert_eq!(state.begin_attempt(), 1);
        assert_eq!(
            state.record_failure("first", &policy),
            RetryDecision::Retry {
                attempt: 1,
                delay: Duration::from_millis(500)
            }
        );

        assert_eq!(state.begin_attempt(), 2);
        assert_eq!(
            state.record_failure("second", &policy),
            RetryDecision::Retry {
                attempt: 2,
                delay: Duration::from_millis(1000)
            }
        );

        assert_eq!(state.begin_attempt(), 3);
        assert_eq!(
            state.record_failure("third", &policy),
            RetryDecision::GiveUp { attempts: 3 }
        );
        assert_eq!(state.last_error(), Some(&"third"));
    }

    #[test]
    fn test_immediate_policy() {
        let policy = RetryPolicy::immediate(5);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay_for_attempt(4), Duration::ZERO);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        assert_eq!(policy.max_attempts, 1);

        let mut state = policy.start::<()>();
        state.begin_attempt();
        assert_eq!(
            state.record_failure((), &policy),
            RetryDecision::GiveUp { attempts: 1 }
        );
    }

    #[test]
    fn test_delay_does_not_overflow() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1));
        assert!(policy.delay_for_attempt(90) >= policy.delay_for_attempt(17));
    }
}
