//! Bounded exponential backoff for flaky network calls.
//!
//! A call is modelled as a sequence of attempts. Each attempt reports an
//! [`AttemptOutcome`]; [`Backoff`] tracks the attempt count and the next delay,
//! and [`retry`] drives the two together. Waiting goes through a [`Sleeper`] so
//! tests can observe the delays without actually sleeping.

use crate::error::{IndexerError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How many times to try a call and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts before giving up (always at least 1).
    pub max_attempts: u32,
    /// Wait before the second attempt.
    pub initial_delay: Duration,
    /// Growth factor for the wait after every failed attempt.
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Create a policy; `max_attempts` is clamped to at least 1 and the
    /// multiplier to at least 1.0.
    pub fn new(max_attempts: u32, initial_delay: Duration, multiplier: f64) -> Self {
        let multiplier = if multiplier.is_finite() && multiplier >= 1.0 {
            multiplier
        } else {
            2.0
        };
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            multiplier,
        }
    }

    /// Start a fresh backoff sequence for one call.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            max_attempts: self.max_attempts,
            multiplier: self.multiplier,
            attempts: 0,
            delay: self.initial_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), 2.0)
    }
}

/// Result of a single attempt.
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    /// The call succeeded.
    Success(T),
    /// Throttling, timeouts and similar; worth trying again.
    Retryable(String),
    /// Anything that will not get better by waiting.
    Fatal(IndexerError),
}

/// Attempt counter and delay for one call.
#[derive(Debug, Clone)]
pub struct Backoff {
    max_attempts: u32,
    multiplier: f64,
    attempts: u32,
    delay: Duration,
}

impl Backoff {
    /// Number of failed attempts recorded so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record a retryable failure.
    ///
    /// Returns the delay to wait before the next attempt, or `None` once the
    /// attempt budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.attempts += 1;
        if self.attempts >= self.max_attempts {
            return None;
        }
        let current = self.delay;
        self.delay = self.delay.mul_f64(self.multiplier);
        Some(current)
    }
}

/// Something that can wait.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `op` until it succeeds, fails fatally, or the policy runs out.
///
/// `op` receives the 1-based attempt number. Exhaustion yields
/// [`IndexerError::RetryExhausted`] carrying the last retryable error.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    label: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AttemptOutcome<T>>,
{
    let mut backoff = policy.backoff();

    loop {
        let attempt = backoff.attempts() + 1;
        match op(attempt).await {
            AttemptOutcome::Success(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", label, attempt);
                }
                return Ok(value);
            }
            AttemptOutcome::Fatal(err) => return Err(err),
            AttemptOutcome::Retryable(reason) => match backoff.next_delay() {
                Some(delay) => {
                    warn!(
                        "{} attempt {}/{} failed: {}; retrying in {:?}",
                        label, attempt, policy.max_attempts, reason, delay
                    );
                    sleeper.sleep(delay).await;
                }
                None => {
                    warn!("{} failed after {} attempts: {}", label, attempt, reason);
                    return Err(IndexerError::RetryExhausted {
                        attempts: attempt,
                        last: reason,
                    });
                }
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Sleeper;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Sleeper that records requested delays and returns immediately.
    #[derive(Debug, Default)]
    pub struct RecordingSleeper {
        pub delays: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn recorded(&self) -> Vec<Duration> {
            self.delays.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }
}
