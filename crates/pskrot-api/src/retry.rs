// Retry policy for controller calls.
//
// A call is attempted up to `max_attempts` times. Between attempts the
// policy's backoff decides how long to wait; its `retryable` predicate
// decides whether a failure is worth another attempt at all.

use std::time::Duration;

use crate::error::Error;

/// Default number of attempts per call, first attempt included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Delay between consecutive attempts of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Retry immediately.
    #[default]
    None,
    /// Same delay before every retry.
    Fixed(Duration),
    /// `base * 2^(attempt - 1)`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay to wait after the given failed attempt (1-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::None => Duration::ZERO,
            Self::Fixed(delay) => delay,
            Self::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                base.saturating_mul(factor).min(max)
            }
        }
    }
}

/// How many times to try a call, how to pace the attempts, and which
/// failures qualify for another one.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub retryable: fn(&Error) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::None,
            retryable: Error::is_retryable,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            retryable: Error::is_retryable,
        }
    }

    /// Replace the retry predicate.
    #[must_use]
    pub fn with_retryable(mut self, retryable: fn(&Error) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Delay before the attempt following `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }

    /// Whether `err` should be retried under this policy.
    pub fn is_retryable(&self, err: &Error) -> bool {
        (self.retryable)(err)
    }
}
