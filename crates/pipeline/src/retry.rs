//! Retry with exponential backoff for chunk uploads.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::UploadError;

/// Backoff before retry `n` (1-based): 2^n seconds.
pub fn exponential_backoff(retry: u32) -> Duration {
    Duration::from_secs(1u64 << retry)
}

/// Retry policy applied to each chunk upload.
///
/// The policy is independent of the operation being retried: it only
/// needs a maximum retry count, a backoff schedule, and a predicate
/// telling retryable failures apart from terminal ones.
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: fn(u32) -> Duration,
    retryable: fn(&UploadError) -> bool,
}

impl RetryPolicy {
    /// Policy with the standard exponential schedule.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: exponential_backoff,
            retryable: UploadError::is_retryable,
        }
    }

    /// Policy with a custom backoff schedule.
    pub fn with_backoff(max_retries: u32, backoff: fn(u32) -> Duration) -> Self {
        Self {
            max_retries,
            backoff,
            retryable: UploadError::is_retryable,
        }
    }

    /// Runs `op`, retrying failed attempts until one succeeds, a
    /// terminal error occurs, or the retry budget is spent.
    ///
    /// A backoff wait races the cancellation token, so a cancelled
    /// pipeline never sits out a full backoff interval.
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, UploadError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UploadError>>,
    {
        let mut retry = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if retry < self.max_retries && (self.retryable)(&err) => {
                    retry += 1;
                    let delay = (self.backoff)(retry);
                    warn!(
                        retry,
                        max_retries = self.max_retries,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "upload attempt failed, backing off"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn no_backoff(_: u32) -> Duration {
        Duration::ZERO
    }

    #[test]
    fn backoff_doubles_per_retry() {
        assert_eq!(exponential_backoff(1), Duration::from_secs(2));
        assert_eq!(exponential_backoff(2), Duration::from_secs(4));
        assert_eq!(exponential_backoff(3), Duration::from_secs(8));
        assert_eq!(exponential_backoff(4), Duration::from_secs(16));
        assert_eq!(exponential_backoff(5), Duration::from_secs(32));
    }

    #[tokio::test]
    async fn returns_first_success() {
        let policy = RetryPolicy::new(5);
        let cancel = CancellationToken::new();
        let attempts = AtomicUsize::new(0);

        let result = policy
            .run(&cancel, || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, UploadError>(n) }
            })
            .await;

        assert_eq!(result.unwrap(), 0);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let policy = RetryPolicy::with_backoff(5, no_backoff);
        let cancel = CancellationToken::new();
        let attempts = AtomicUsize::new(0);

        let result = policy
            .run(&cancel, || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(UploadError::HttpStatus { status: 500 })
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_retry_budget() {
        let policy = RetryPolicy::with_backoff(3, no_backoff);
        let cancel = CancellationToken::new();
        let attempts = AtomicUsize::new(0);

        let result: Result<(), _> = policy
            .run(&cancel, || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(UploadError::HttpStatus { status: 503 }) }
            })
            .await;

        assert!(matches!(
            result,
            Err(UploadError::HttpStatus { status: 503 })
        ));
        // Initial attempt plus three retries.
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn cancellation_is_not_retried() {
        let policy = RetryPolicy::with_backoff(5, no_backoff);
        let cancel = CancellationToken::new();
        let attempts = AtomicUsize::new(0);

        let result: Result<(), _> = policy
            .run(&cancel, || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(UploadError::Cancelled) }
            })
            .await;

        assert!(matches!(result, Err(UploadError::Cancelled)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn protocol_errors_are_not_retried() {
        let policy = RetryPolicy::with_backoff(5, no_backoff);
        let cancel = CancellationToken::new();
        let attempts = AtomicUsize::new(0);

        let result: Result<(), _> = policy
            .run(&cancel, || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(UploadError::NoUrlsAvailable) }
            })
            .await;

        assert!(matches!(result, Err(UploadError::NoUrlsAvailable)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_token_skips_backoff_wait() {
        // Real exponential backoff: without the cancellation short-cut
        // this test would sleep for seconds.
        let policy = RetryPolicy::new(5);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let attempts = AtomicUsize::new(0);

        let started = std::time::Instant::now();
        let result: Result<(), _> = policy
            .run(&cancel, || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(UploadError::HttpStatus { status: 500 }) }
            })
            .await;

        assert!(matches!(result, Err(UploadError::Cancelled)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
