use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Default number of attempts before an operation is declared a poison pill.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// Default fixed delay between attempts (3 seconds).
pub const DEFAULT_BACKOFF_DELAY_MS: u64 = 3_000;

/// Bounded-retry settings. The delay is fixed, not exponential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_delay_ms: DEFAULT_BACKOFF_DELAY_MS,
        }
    }
}

/// Wait abstraction so tests can inject a recording implementation instead of
/// sleeping.
pub trait Backoff {
    fn wait(&mut self, delay_ms: u64);
}

/// Production backoff: suspends the calling shard's own worker thread only.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadBackoff;

impl Backoff for ThreadBackoff {
    fn wait(&mut self, delay_ms: u64) {
        thread::sleep(Duration::from_millis(delay_ms));
    }
}

/// Terminal failure of a retried operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RetryError<E>
where
    E: std::fmt::Debug + std::fmt::Display,
{
    /// Every attempt failed; carries the last failure.
    #[error("operation failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
    /// The failure was classified as not retryable.
    #[error("operation aborted without retry: {0}")]
    Aborted(E),
}

/// Invokes fallible operations with bounded retries and a fixed backoff.
#[derive(Debug)]
pub struct RetryExecutor<B: Backoff> {
    policy: RetryPolicy,
    backoff: B,
}

impl<B: Backoff> RetryExecutor<B> {
    /// Creates an executor with the provided policy and wait implementation.
    pub fn new(policy: RetryPolicy, backoff: B) -> Self {
        Self { policy, backoff }
    }

    /// Active retry policy.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs `op` up to `max_attempts` times, waiting `backoff_delay_ms`
    /// between failures. `retryable` classifies each failure; a non-retryable
    /// failure aborts immediately so the caller can decide whether abortion is
    /// fatal or skippable.
    pub fn execute<T, E>(
        &mut self,
        mut op: impl FnMut() -> Result<T, E>,
        retryable: impl Fn(&E) -> bool,
    ) -> Result<T, RetryError<E>>
    where
        E: std::fmt::Debug + std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if !retryable(&err) => return Err(RetryError::Aborted(err)),
                Err(err) => {
                    if attempt >= self.policy.max_attempts {
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            last: err,
                        });
                    }
                    self.backoff.wait(self.policy.backoff_delay_ms);
                }
            }
        }
    }
}
