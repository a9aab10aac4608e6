//! Bounded retry with a fixed delay
//!
//! The delay doubles as a throttle: a remote that is struggling or rate
//! limiting us gets a long quiet period before the next attempt.

use std::future::Future;
use std::time::Duration;

/// Default number of attempts per operation
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Runs a fallible async operation up to a fixed number of times
///
/// The executor keeps no state between calls. It does not know whether the
/// operation is safe to repeat; only wrap side-effect free fetches.
#[derive(Debug, Clone, Copy)]
pub struct RetryExecutor {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

impl RetryExecutor {
    /// Creates an executor; `max_attempts` is clamped to at least 1
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Executes `operation` until it succeeds or the attempts run out
    ///
    /// `on_failure` is called with the 1-based attempt number and the error of
    /// every failed attempt, including the last one. After the final attempt
    /// the error is returned unchanged.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use sumi_trawl::crawler::RetryExecutor;
    ///
    /// # async fn example() {
    /// let retry = RetryExecutor::new(3, Duration::ZERO);
    /// let value: Result<u32, String> = retry
    ///     .execute(|| async { Ok(7) }, |attempt, err| eprintln!("{attempt}: {err}"))
    ///     .await;
    /// assert_eq!(value, Ok(7));
    /// # }
    /// ```
    pub async fn execute<T, E, F, Fut, H>(&self, mut operation: F, mut on_failure: H) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        H: FnMut(u32, &E),
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    on_failure(attempt, &e);
                    if attempt >= self.max_attempts {
                        return Err(e);
                    }
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}
