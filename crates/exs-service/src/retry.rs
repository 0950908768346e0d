//! Retry with exponential backoff for calls to the content source.

use std::{fmt::Display, future::Future, time::Duration};

use thiserror::Error;

use crate::metrics;

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;

    /// Short label for logs and metrics.
    fn reason(&self) -> &'static str;
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never below 1.
    pub max_attempts: u32,
    /// Wait after the first failure; doubles after each further failure.
    pub base_delay: Duration,
    /// Upper bound on any single wait.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// At most `max_attempts` tries, waiting `base_delay` doubled after each
    /// failure and capped at 30 seconds.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Wait after the `failed_attempt`-th failure (1-based).
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1 << exponent)
            .min(self.max_delay)
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Attempt bookkeeping for one retried call.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempts: u32,
}

impl RetryState {
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempts: 0 }
    }

    /// Attempts started so far.
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Mark the start of an attempt and return its 1-based number.
    pub const fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Decide what follows a failure of the current attempt.
    pub fn on_failure<E: Retryable>(&self, error: &E) -> RetryDecision {
        if !error.is_retryable() || self.attempts >= self.policy.max_attempts {
            RetryDecision::GiveUp
        } else {
            RetryDecision::RetryAfter(self.policy.delay_for(self.attempts))
        }
    }
}

/// A successful value and the attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// Why a retried call gave up. Carries the last error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts: {error}")]
    Exhausted { attempts: u32, error: E },
    #[error("permanent failure on attempt {attempts}: {error}")]
    Permanent { attempts: u32, error: E },
}

impl<E> RetryError<E> {
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::Permanent { attempts, .. } => *attempts,
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { error, .. } | Self::Permanent { error, .. } => error,
        }
    }
}

/// Run `op` until it succeeds, fails permanently or runs out of attempts.
///
/// `op` receives the 1-based attempt number. `label` identifies the call in logs.
pub async fn retry<T, E, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<Attempted<T>, RetryError<E>>
where
    E: Retryable + Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut state = RetryState::new(policy);

    loop {
        let attempt = state.begin_attempt();
        let error = match op(attempt).await {
            Ok(value) => {
                return Ok(Attempted {
                    value,
                    attempts: attempt,
                });
            }
            Err(error) => error,
        };

        match state.on_failure(&error) {
            RetryDecision::RetryAfter(delay) => {
                tracing::warn!(
                    call = label,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    reason = error.reason(),
                    error = %error,
                    "Retrying after failure"
                );
                metrics::record_content_retry(error.reason());
                tokio::time::sleep(delay).await;
            }
            RetryDecision::GiveUp if error.is_retryable() => {
                tracing::error!(call = label, attempts = attempt, error = %error, "Retries exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    error,
                });
            }
            RetryDecision::GiveUp => {
                tracing::error!(call = label, attempt, error = %error, "Permanent failure");
                return Err(RetryError::Permanent {
                    attempts: attempt,
                    error,
                });
            }
        }
    }
}
