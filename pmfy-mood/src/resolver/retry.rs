//! Transient-failure retry with exponential backoff

use crate::error::FetchError;
use pmfy_common::config::PipelineSettings;
use std::future::Future;
use std::time::{Duration, Instant};

/// Retry budget for a collaborator call
///
/// `max_retries` counts retries after the first attempt, so a call is tried at
/// most `max_retries + 1` times. Only [`FetchError::Transient`] is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Bound on a single attempt; elapsing counts as a transient failure
    pub call_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&PipelineSettings::default())
    }
}

/// Final outcome of a retried call
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, FetchError>,
    /// Attempts made, including the first
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            call_timeout: Some(Duration::from_millis(settings.call_timeout_ms)),
        }
    }

    /// Policy without backoff delay or per-call timeout
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            call_timeout: None,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Delay before retry number `retry` (1-based), doubling and capped
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }

    /// Longest one `run` can take when every attempt times out
    ///
    /// `None` without a per-call timeout, since attempts are then unbounded.
    pub fn worst_case(&self) -> Option<Duration> {
        let limit = self.call_timeout?;
        let backoff: Duration = (1..=self.max_retries).map(|r| self.backoff_for(r)).sum();
        Some(limit.saturating_mul(self.max_retries + 1) + backoff)
    }

    /// Shed retries until the worst case fits in `budget`
    pub fn within(mut self, budget: Duration) -> Self {
        while self.max_retries > 0 && self.worst_case().is_some_and(|w| w > budget) {
            self.max_retries -= 1;
        }
        self
    }

    /// Run `operation` until it succeeds, fails permanently, or the budget is spent
    pub async fn run<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Attempted<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let start_time = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let outcome = match self.call_timeout {
                Some(limit) => match tokio::time::timeout(limit, operation()).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(FetchError::Transient(format!(
                        "timed out after {}ms",
                        limit.as_millis()
                    ))),
                },
                None => operation().await,
            };

            match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(
                            operation = operation_name,
                            attempt,
                            elapsed_ms = start_time.elapsed().as_millis() as u64,
                            "Call succeeded after retry"
                        );
                    }
                    return Attempted {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(FetchError::Transient(reason)) if attempt <= self.max_retries => {
                    let delay = self.backoff_for(attempt);
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        backoff_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "Transient failure, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => {
                    if err.is_transient() {
                        tracing::warn!(
                            operation = operation_name,
                            attempts = attempt,
                            error = %err,
                            "Retry budget exhausted"
                        );
                    }
                    return Attempted {
                        result: Err(err),
                        attempts: attempt,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
            call_timeout: None,
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(350));
        assert_eq!(policy.backoff_for(30), Duration::from_millis(350));
    }

    #[test]
    fn test_worst_case_sums_timeouts_and_backoff() {
        let policy = RetryPolicy::from_settings(&PipelineSettings::default());
        // 4 attempts x 3000ms + 250 + 500 + 1000
        assert_eq!(policy.worst_case(), Some(Duration::from_millis(13_750)));
        assert_eq!(RetryPolicy::immediate(3).worst_case(), None);
    }

    #[test]
    fn test_within_sheds_retries() {
        let policy = RetryPolicy::from_settings(&PipelineSettings::default());

        let fitted = policy.within(Duration::from_millis(6_500));
        assert_eq!(fitted.max_retries, 1);
        assert!(fitted.worst_case().unwrap() <= Duration::from_millis(6_500));

        // A single attempt is always kept
        assert_eq!(policy.within(Duration::from_millis(10)).max_retries, 0);
        assert_eq!(policy.within(Duration::from_secs(60)).max_retries, 3);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let mut calls = 0;
        let attempted = RetryPolicy::immediate(3)
            .run("test_op", || {
                calls += 1;
                let n = calls;
                async move {
                    if n < 3 {
                        Err(FetchError::Transient("503".to_string()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(attempted.result, Ok(42));
        assert_eq!(attempted.attempts, 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let mut calls = 0;
        let attempted = RetryPolicy::immediate(3)
            .run("test_op", || {
                calls += 1;
                async { Err::<u32, _>(FetchError::NotFound) }
            })
            .await;

        assert_eq!(attempted.result, Err(FetchError::NotFound));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        let mut calls = 0;
        let attempted = RetryPolicy::immediate(2)
            .run("test_op", || {
                calls += 1;
                async { Err::<u32, _>(FetchError::Transient("reset".to_string())) }
            })
            .await;

        assert!(attempted.result.unwrap_err().is_transient());
        assert_eq!(calls, 3);
        assert_eq!(attempted.attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_call_counts_as_transient() {
        let policy = RetryPolicy::immediate(0).with_call_timeout(Duration::from_millis(50));
        let attempted = policy
            .run("slow_op", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<u32, FetchError>(1)
            })
            .await;

        assert!(matches!(attempted.result, Err(FetchError::Transient(_))));
    }
}
