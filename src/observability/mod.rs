//! Logging setup, request metrics and tracing hooks.

use crate::errors::RateLimitInfo;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variables consulted for the log filter, in order.
pub const LOG_ENV_VARS: &[&str] = &["TF_LOG_PROVIDER", "RUST_LOG"];

/// Installs a stderr `tracing` subscriber.
///
/// The filter comes from `TF_LOG_PROVIDER`, then `RUST_LOG`, then `info`.
/// Calling this twice is harmless; the second call is ignored.
pub fn init_logging() {
    let directive = LOG_ENV_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        .map(|v| normalize_level(&v))
        .unwrap_or_else(|| "info".to_string());

    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init();
}

/// Maps Terraform log level names (`TRACE`, `DEBUG`, ...) onto filter directives.
fn normalize_level(value: &str) -> String {
    match value.to_ascii_uppercase().as_str() {
        "TRACE" | "DEBUG" | "INFO" | "WARN" | "ERROR" => value.to_ascii_lowercase(),
        "JSON" => "trace".to_string(),
        "OFF" => "off".to_string(),
        _ => value.to_string(),
    }
}

/// Request counters kept per client.
#[derive(Debug, Default)]
pub struct Metrics {
    sent: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
    latency_us: AtomicU64,
}

impl Metrics {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts an attempt beyond the first.
    pub fn record_retry(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    fn record(&self, elapsed: Duration, ok: bool) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// Current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.sent.load(Ordering::Relaxed);
        let latency = self.latency_us.load(Ordering::Relaxed);
        MetricsSnapshot {
            requests,
            failures: self.failed.load(Ordering::Relaxed),
            retries: self.retried.load(Ordering::Relaxed),
            average_latency: Duration::from_micros(latency.checked_div(requests).unwrap_or(0)),
        }
    }
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// HTTP requests sent, retries included.
    pub requests: u64,
    /// Requests answered with an error or not answered at all.
    pub failures: u64,
    /// Attempts beyond the first.
    pub retries: u64,
    /// Mean time to response headers.
    pub average_latency: Duration,
}

/// Times one HTTP attempt.
pub struct RequestTimer {
    start: Instant,
    metrics: Arc<Metrics>,
}

impl RequestTimer {
    /// Starts timing.
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    /// Stops timing a successful attempt.
    pub fn success(self) -> Duration {
        self.finish(true)
    }

    /// Stops timing a failed attempt.
    pub fn failure(self) -> Duration {
        self.finish(false)
    }

    fn finish(self, ok: bool) -> Duration {
        let elapsed = self.start.elapsed();
        self.metrics.record(elapsed, ok);
        elapsed
    }
}

/// Log events emitted around API calls and state changes.
pub struct TracingHooks;

impl TracingHooks {
    /// Logs the start of an API request.
    pub fn on_request_start(method: &str, url: &str) {
        debug!(method = %method, url = %url, "GitHub API request started");
    }

    /// Logs the completion of an API request.
    pub fn on_request_complete(method: &str, url: &str, status: u16, duration: Duration) {
        debug!(
            method = %method,
            url = %url,
            status = status,
            duration_ms = duration.as_millis() as u64,
            "GitHub API request completed"
        );
    }

    /// Logs a request error.
    pub fn on_request_error(method: &str, url: &str, error: &str) {
        error!(method = %method, url = %url, error = %error, "GitHub API request failed");
    }

    /// Logs rate limit info.
    pub fn on_rate_limit_update(info: &RateLimitInfo) {
        debug!(
            limit = info.limit,
            remaining = info.remaining,
            reset_at = %info.reset_at,
            resource = info.resource.as_deref().unwrap_or("core"),
            "Rate limit updated"
        );
    }

    /// Logs rate limit exhaustion.
    pub fn on_rate_limit_low(info: &RateLimitInfo) {
        warn!(
            limit = info.limit,
            remaining = info.remaining,
            reset_at = %info.reset_at,
            "Rate limit nearly exhausted"
        );
    }

    /// Logs a resource being dropped from state after a 404.
    pub fn on_removed_from_state(type_name: &str, id: &str) {
        warn!(
            resource = %type_name,
            id = %id,
            "Removing resource from state because it no longer exists in GitHub"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_timer_counts_attempts() {
        let metrics = Arc::new(Metrics::new());
        RequestTimer::new(metrics.clone()).success();
        RequestTimer::new(metrics.clone()).failure();
        metrics.record_retry();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.retries, 1);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot.requests, 0);
        assert_eq!(snapshot.average_latency, Duration::ZERO);
    }

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level("DEBUG"), "debug");
        assert_eq!(normalize_level("JSON"), "trace");
        assert_eq!(
            normalize_level("terraform_provider_github=trace"),
            "terraform_provider_github=trace"
        );
    }
}
