//! Bounded retry for remote calls.
//!
//! Each attempt starts from scratch; nothing carries over between attempts
//! except the attempt counter. With `max_attempts == 1` the operation runs
//! exactly once.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Attempt policy shared by lookup and update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run each operation exactly once.
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op` until it yields a non-retryable result or attempts run out.
    ///
    /// The last result is returned as-is, so callers see the final answer
    /// whether or not it was retryable.
    pub async fn run<T, E, F, Fut, R>(
        &self,
        operation: &str,
        mut op: F,
        retryable: R,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&Result<T, E>) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            let result = op().await;
            if attempt >= self.max_attempts || !retryable(&result) {
                return result;
            }

            match &result {
                Err(e) => warn!(operation, attempt, error = %e, "Retrying after error"),
                Ok(_) => warn!(operation, attempt, "Retrying after retryable response"),
            }
            attempt += 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }
    }
}

/// Statuses worth another attempt: throttling and server-side failures.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[tokio::test]
    async fn single_attempt_runs_once_even_when_retryable() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::single_attempt();
        let result: Result<(), String> = policy
            .run(
                "test",
                || {
                    calls.set(calls.get() + 1);
                    async { Err("boom".to_string()) }
                },
                |_| true,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let result: Result<u32, String> = policy
            .run(
                "test",
                || {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move {
                        if n < 3 {
                            Err(format!("fail {n}"))
                        } else {
                            Ok(n)
                        }
                    }
                },
                |r| r.is_err(),
            )
            .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn stops_at_max_attempts_and_returns_last_result() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let result: Result<(), String> = policy
            .run(
                "test",
                || {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move { Err(format!("fail {n}")) }
                },
                |r| r.is_err(),
            )
            .await;
        assert_eq!(result, Err("fail 3".to_string()));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn non_retryable_result_returns_immediately() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(4, Duration::ZERO);
        let result: Result<u16, String> = policy
            .run(
                "test",
                || {
                    calls.set(calls.get() + 1);
                    async { Ok(400) }
                },
                |r| matches!(r, Ok(s) if is_retryable_status(*s)),
            )
            .await;
        assert_eq!(result, Ok(400));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(200));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(404));
    }
}
