//! Retry, request pacing and rate limit tracking for the GitHub client.

use crate::config::{RetryConfig, ThrottleConfig};
use crate::errors::{GitHubError, GitHubResult, RateLimitInfo};
use chrono::Utc;
use reqwest::Method;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::time::sleep;

/// Retry executor applying the provider-wide status allowlist.
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Creates a new retry executor.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Returns true if `error` should be retried under this policy.
    ///
    /// A transport failure may have reached the server, so it is only
    /// retried for idempotent methods.
    pub fn is_retryable(&self, method: &Method, error: &GitHubError) -> bool {
        if error.is_rate_limited() {
            return true;
        }
        if error.is_transport() {
            return method.is_idempotent();
        }
        error
            .status_code()
            .map(|code| self.config.retryable_errors.contains(&code))
            .unwrap_or(false)
    }

    /// Executes an operation issuing a `method` request with retry logic.
    pub async fn execute<F, Fut, T>(&self, method: &Method, mut operation: F) -> GitHubResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = GitHubResult<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;

                    if !self.is_retryable(method, &e) || attempt > self.config.max_retries {
                        return Err(e);
                    }

                    let delay = match e.retry_after() {
                        Some(secs) if e.is_rate_limited() => Duration::from_secs(secs),
                        _ => self.calculate_backoff(attempt),
                    };

                    tracing::warn!(
                        attempt = attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying GitHub API request"
                    );

                    sleep(delay).await;
                }
            }
        }
    }

    /// Calculates backoff duration for an attempt.
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let base = self.config.retry_delay.as_millis() as f64
            * self.config.multiplier.powi(attempt.saturating_sub(1) as i32);
        let capped = base.min(self.config.max_backoff.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }
}

/// Paces requests: mutating calls are serialized with a trailing write delay
/// unless parallel requests are allowed; reads wait the read delay.
pub struct RequestThrottle {
    config: ThrottleConfig,
    write_lock: Mutex<()>,
}

/// Held for the duration of a mutating request.
pub struct ThrottlePermit<'a> {
    _guard: Option<MutexGuard<'a, ()>>,
    write_delay: Option<Duration>,
}

impl ThrottlePermit<'_> {
    /// Waits out the write delay, then releases the permit.
    pub async fn release(self) {
        if let Some(delay) = self.write_delay {
            sleep(delay).await;
        }
    }
}

impl RequestThrottle {
    /// Creates a new throttle.
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Returns true for methods that change remote state.
    pub fn is_write(method: &Method) -> bool {
        !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
    }

    /// Acquires a permit for a request of the given method.
    pub async fn acquire(&self, method: &Method) -> ThrottlePermit<'_> {
        if Self::is_write(method) {
            let guard = if self.config.parallel_requests {
                None
            } else {
                Some(self.write_lock.lock().await)
            };
            ThrottlePermit {
                _guard: guard,
                write_delay: Some(self.config.write_delay),
            }
        } else {
            if !self.config.read_delay.is_zero() {
                sleep(self.config.read_delay).await;
            }
            ThrottlePermit {
                _guard: None,
                write_delay: None,
            }
        }
    }
}

/// Last rate limit headers seen for each bucket (`core`, `graphql`, ...).
pub struct RateLimitTracker {
    buckets: RwLock<HashMap<String, RateLimitInfo>>,
    low_watermark: f64,
}

impl RateLimitTracker {
    /// Creates a tracker that reports a bucket as low once `remaining`
    /// falls to `low_watermark` of its limit.
    pub fn new(low_watermark: f64) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            low_watermark,
        }
    }

    /// Records the headers of a response. Returns true when the bucket is low.
    pub async fn update(&self, info: &RateLimitInfo) -> bool {
        let bucket = info.resource.clone().unwrap_or_else(|| CORE_BUCKET.to_string());
        self.buckets.write().await.insert(bucket, info.clone());
        f64::from(info.remaining) <= f64::from(info.limit) * self.low_watermark
    }

    /// Last headers recorded for `bucket`.
    pub async fn get(&self, bucket: &str) -> Option<RateLimitInfo> {
        self.buckets.read().await.get(bucket).cloned()
    }

    /// Time until `bucket` resets, when it is exhausted.
    pub async fn wait_time(&self, bucket: &str) -> Option<Duration> {
        let buckets = self.buckets.read().await;
        let info = buckets.get(bucket).filter(|i| i.remaining == 0)?;
        (info.reset_at - Utc::now()).to_std().ok()
    }

    /// Sleeps until `bucket` resets when its last response exhausted it.
    pub async fn wait_if_needed(&self, bucket: &str) {
        if let Some(wait) = self.wait_time(bucket).await {
            tracing::warn!(
                bucket,
                wait_secs = wait.as_secs(),
                "Rate limit exhausted, waiting for reset"
            );
            sleep(wait).await;
        }
    }
}

/// Bucket of REST calls.
pub const CORE_BUCKET: &str = "core";
/// Bucket of GraphQL calls.
pub const GRAPHQL_BUCKET: &str = "graphql";

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    fn policy(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            retry_delay: Duration::from_millis(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_retry_backoff_calculation() {
        let executor = RetryExecutor::new(RetryConfig {
            retry_delay: Duration::from_secs(1),
            ..Default::default()
        });

        assert_eq!(executor.calculate_backoff(1), Duration::from_secs(1));
        assert_eq!(executor.calculate_backoff(2), Duration::from_secs(2));
        assert_eq!(executor.calculate_backoff(3), Duration::from_secs(4));
        assert_eq!(executor.calculate_backoff(20), Duration::from_secs(60));
    }

    #[test]
    fn test_retryable_allowlist() {
        let executor = RetryExecutor::new(policy(3));
        let bad_gateway = GitHubError::from_status(502, "bad");
        let not_found = GitHubError::from_status(404, "nope");
        let teapot = GitHubError::from_status(418, "tea");

        assert!(executor.is_retryable(&Method::GET, &bad_gateway));
        assert!(executor.is_retryable(&Method::POST, &bad_gateway));
        assert!(!executor.is_retryable(&Method::GET, &not_found));
        assert!(!executor.is_retryable(&Method::GET, &teapot));
    }

    #[test]
    fn test_transport_errors_retry_only_idempotent_methods() {
        let executor = RetryExecutor::new(policy(3));
        let reset = GitHubError::transport("connection reset");

        assert!(executor.is_retryable(&Method::GET, &reset));
        assert!(executor.is_retryable(&Method::PUT, &reset));
        assert!(executor.is_retryable(&Method::DELETE, &reset));
        assert!(!executor.is_retryable(&Method::POST, &reset));
        assert!(!executor.is_retryable(&Method::PATCH, &reset));
    }

    #[tokio::test]
    async fn test_post_transport_error_is_not_retried() {
        let executor = RetryExecutor::new(policy(5));
        let calls = AtomicUsize::new(0);

        let result: GitHubResult<()> = executor
            .execute(&Method::POST, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GitHubError::transport("connection reset")) }
            })
            .await;

        assert_err!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_stops_after_max_retries() {
        let executor = RetryExecutor::new(policy(2));
        let calls = AtomicUsize::new(0);

        let result: GitHubResult<()> = executor
            .execute(&Method::GET, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GitHubError::from_status(503, "down")) }
            })
            .await;

        assert_err!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_fast() {
        let executor = RetryExecutor::new(policy(5));
        let calls = AtomicUsize::new(0);

        let result: GitHubResult<()> = executor
            .execute(&Method::GET, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GitHubError::not_found("missing")) }
            })
            .await;

        assert_err!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_throttle_serializes_writes() {
        let throttle = RequestThrottle::new(ThrottleConfig {
            write_delay: Duration::from_millis(1),
            ..Default::default()
        });

        let permit = throttle.acquire(&Method::POST).await;
        assert_err!(throttle.write_lock.try_lock());
        permit.release().await;
        assert_ok!(throttle.write_lock.try_lock());

        // reads never take the lock
        let _read = throttle.acquire(&Method::GET).await;
        assert_ok!(throttle.write_lock.try_lock());
    }

    #[tokio::test]
    async fn test_parallel_writes_skip_lock() {
        let throttle = RequestThrottle::new(ThrottleConfig {
            write_delay: Duration::from_millis(1),
            parallel_requests: true,
            ..Default::default()
        });

        let _permit = throttle.acquire(&Method::DELETE).await;
        assert_ok!(throttle.write_lock.try_lock());
    }

    fn headers(resource: &str, remaining: u32, reset_in: chrono::Duration) -> RateLimitInfo {
        RateLimitInfo {
            limit: 5000,
            remaining,
            reset_at: Utc::now() + reset_in,
            retry_after: None,
            resource: Some(resource.to_string()),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_buckets_are_independent() {
        let tracker = RateLimitTracker::new(0.1);

        assert!(!tracker.update(&headers(CORE_BUCKET, 4000, chrono::Duration::hours(1))).await);
        assert!(tracker.update(&headers(GRAPHQL_BUCKET, 100, chrono::Duration::hours(1))).await);

        assert_eq!(tracker.get(CORE_BUCKET).await.map(|i| i.remaining), Some(4000));
        assert_eq!(tracker.get(GRAPHQL_BUCKET).await.map(|i| i.remaining), Some(100));
        assert!(tracker.get("search").await.is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_exhausted_waits() {
        let tracker = RateLimitTracker::new(0.1);
        tracker
            .update(&headers(GRAPHQL_BUCKET, 0, chrono::Duration::minutes(10)))
            .await;

        assert!(tracker.wait_time(GRAPHQL_BUCKET).await.is_some());
        assert!(tracker.wait_time(CORE_BUCKET).await.is_none());

        tracker
            .update(&headers(CORE_BUCKET, 0, chrono::Duration::minutes(-1)))
            .await;
        assert!(tracker.wait_time(CORE_BUCKET).await.is_none());
    }
}
