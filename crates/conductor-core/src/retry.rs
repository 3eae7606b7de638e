//! Exponential backoff retry helper.
//!
//! Used by the provider retry policy (turn-loop retryable stream errors) and by
//! the subagent runner's bounded retry on transient failures.

use std::future::Future;
use std::time::Duration;

/// Configuration for an exponential backoff retry loop.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
}

impl RetryConfig {
    /// Construct a new config.
    #[must_use]
    pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
        }
    }

    /// Delay before attempt `n` (0-indexed retry count, not counting the first try).
    ///
    /// `delay(n) = min(maxDelay, initialDelay * 2^n)`.
    #[must_use]
    pub fn delay_for_attempt(&self, n: u32) -> Duration {
        let factor = 1u64.checked_shl(n).unwrap_or(u64::MAX);
        let scaled = self.initial_delay.saturating_mul(factor.min(u32::MAX as u64) as u32);
        scaled.min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_attempts: 3,
        }
    }
}

/// Outcome of a retry loop.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// The operation succeeded, possibly after some retries.
    Success(T),
    /// All attempts were exhausted; carries the last error.
    Exhausted(E),
}

/// Run `op` up to `config.max_attempts` times, retrying only when `is_retryable`
/// returns true for the error, sleeping `config.delay_for_attempt(n)` between attempts.
pub async fn retry<T, E, Op, Fut, IsRetryable>(
    config: RetryConfig,
    mut op: Op,
    is_retryable: IsRetryable,
) -> RetryOutcome<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    IsRetryable: Fn(&E) -> bool,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return RetryOutcome::Success(value),
            Err(err) => {
                attempt += 1;
                if attempt >= config.max_attempts || !is_retryable(&err) {
                    return RetryOutcome::Exhausted(err);
                }
                tokio::time::sleep(config.delay_for_attempt(attempt - 1)).await;
            }
        }
    }
}
