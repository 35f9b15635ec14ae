// Retry Executor - bounded retries with exponential backoff
use crate::config::RetryConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Retry policy
///
/// Runs an operation up to `max_attempts` times. After failed attempt `n`
/// (1-based) it waits `base_delay * 2^n` (2s, 4s with the default 1s base).
/// The last error is returned to the caller, never swallowed.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Arguments
    /// * `max_attempts` - Total attempts including the first (at least 1)
    /// * `base_delay` - Backoff base
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.base_delay_ms))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff after failed attempt `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Execute `op` with retries
    ///
    /// `op` receives the 1-based attempt number.
    ///
    /// # Example
    /// ```text
    /// let listings = policy
    ///     .execute("remotive", |_attempt| source.fetch("rust"))
    ///     .await?;
    /// ```
    pub async fn execute<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        operation = %label,
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        operation = %label,
                        attempts = attempt,
                        error = %e,
                        "Max retry attempts reached"
                    );
                    return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt_after_2s_then_4s() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let mut attempt_times = Vec::new();
        let start = Instant::now();

        let result: Result<&str, String> = policy
            .execute("flaky", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                attempt_times.push(start.elapsed());
                async move {
                    if attempt < 3 {
                        Err(format!("attempt {} failed", attempt))
                    } else {
                        Ok("listings")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("listings"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            attempt_times,
            vec![
                Duration::ZERO,
                Duration::from_secs(2),
                Duration::from_secs(6)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rethrows_last_error_after_exhausting_attempts() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = policy
            .execute("down", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure #{}", attempt)) }
            })
            .await;

        assert_eq!(assert_err!(result), "failure #3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        let result: Result<u8, String> = policy.execute("once", |_| async { Ok(7) }).await;
        assert_eq!(assert_ok!(result), 7);
        assert_eq!(policy.max_attempts(), 1);
    }
}
