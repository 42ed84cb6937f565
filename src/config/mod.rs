//! Provider configuration.

use crate::errors::GitHubError;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use url::Url;

/// Default GitHub API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com/";

/// Default GitHub API version (date-based).
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default User-Agent header.
pub const DEFAULT_USER_AGENT: &str =
    concat!("terraform-provider-github/", env!("CARGO_PKG_VERSION"));

/// Statuses retried when `retryable_errors` is not configured.
pub const DEFAULT_RETRYABLE_ERRORS: &[u16] = &[500, 502, 503, 504];

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum retries after the first attempt (0 disables retries).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub retry_delay: Duration,
    /// Upper bound on the backoff delay.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
    /// HTTP statuses that are retried.
    pub retryable_errors: BTreeSet<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
            retryable_errors: DEFAULT_RETRYABLE_ERRORS.iter().copied().collect(),
        }
    }
}

/// Client-side pacing of requests.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Delay after each mutating request.
    pub write_delay: Duration,
    /// Delay before each read request.
    pub read_delay: Duration,
    /// Allow mutating requests to run concurrently.
    pub parallel_requests: bool,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            write_delay: Duration::from_millis(1000),
            read_delay: Duration::ZERO,
            parallel_requests: false,
        }
    }
}

/// Rate limit handling.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Fraction of a bucket's limit below which a warning is logged.
    pub low_watermark: f64,
    /// Sleep until reset before calling into an exhausted bucket.
    pub wait_for_reset: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            low_watermark: 0.1,
            wait_for_reset: true,
        }
    }
}

/// Connection pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum idle connections per host.
    pub max_idle_per_host: usize,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 20,
            idle_timeout: Duration::from_secs(90),
        }
    }
}

/// Provider configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Explicit token; resolution falls back to env and `gh`.
    pub token: Option<SecretString>,
    /// Account (organization or user) that resources are managed under.
    pub owner: Option<String>,
    /// API base URL as configured.
    pub base_url: String,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// API version header.
    pub api_version: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// User-Agent header.
    pub user_agent: String,
    /// Retry configuration.
    pub retry: RetryConfig,
    /// Request pacing.
    pub throttle: ThrottleConfig,
    /// Rate limit configuration.
    pub rate_limit: RateLimitConfig,
    /// Connection pool configuration.
    pub pool: PoolConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            token: None,
            owner: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            insecure: false,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryConfig::default(),
            throttle: ThrottleConfig::default(),
            rate_limit: RateLimitConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

/// Provider block as written in configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProviderConfig {
    token: Option<String>,
    owner: Option<String>,
    organization: Option<String>,
    base_url: Option<String>,
    insecure: Option<bool>,
    max_retries: Option<u32>,
    retry_delay_ms: Option<u64>,
    retryable_errors: Option<Vec<u16>>,
    write_delay_ms: Option<u64>,
    read_delay_ms: Option<u64>,
    parallel_requests: Option<bool>,
}

impl ProviderConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ProviderConfigBuilder {
        ProviderConfigBuilder::new()
    }

    /// Builds configuration from a provider block, filling gaps from the
    /// process environment.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, GitHubError> {
        Self::from_value_with_env(value, |key| std::env::var(key).ok())
    }

    /// Builds configuration from a provider block with a custom environment.
    pub fn from_value_with_env<F>(value: &serde_json::Value, env: F) -> Result<Self, GitHubError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawProviderConfig = if value.is_null() {
            RawProviderConfig::default()
        } else {
            serde_json::from_value(value.clone()).map_err(|e| {
                GitHubError::configuration(format!("Invalid provider configuration: {}", e))
            })?
        };

        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

        if raw.organization.is_some() {
            tracing::warn!("\"organization\" is deprecated, use \"owner\" instead");
        }

        let mut builder = Self::builder();
        if let Some(token) = non_empty(raw.token) {
            builder = builder.token(token);
        }
        let owner = non_empty(raw.owner)
            .or_else(|| non_empty(raw.organization))
            .or_else(|| non_empty(env("GITHUB_OWNER")))
            .or_else(|| non_empty(env("GITHUB_ORGANIZATION")));
        if let Some(owner) = owner {
            builder = builder.owner(owner);
        }
        if let Some(url) = non_empty(raw.base_url).or_else(|| non_empty(env("GITHUB_BASE_URL"))) {
            builder = builder.base_url(url);
        }
        if let Some(insecure) = raw.insecure {
            builder = builder.insecure(insecure);
        }

        let mut retry = RetryConfig::default();
        if let Some(max) = raw.max_retries {
            retry.max_retries = max;
        }
        if let Some(delay) = raw.retry_delay_ms {
            retry.retry_delay = Duration::from_millis(delay);
        }
        if let Some(codes) = raw.retryable_errors {
            retry.retryable_errors = codes.into_iter().collect();
        }
        builder = builder.retry(retry);

        let mut throttle = ThrottleConfig::default();
        if let Some(ms) = raw.write_delay_ms {
            throttle.write_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = raw.read_delay_ms {
            throttle.read_delay = Duration::from_millis(ms);
        }
        if let Some(parallel) = raw.parallel_requests {
            throttle.parallel_requests = parallel;
        }
        builder = builder.throttle(throttle);

        builder.build()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), GitHubError> {
        if self.base_url.is_empty() {
            return Err(GitHubError::configuration("Base URL cannot be empty"));
        }

        let url = Url::parse(&self.base_url).map_err(|e| {
            GitHubError::configuration(format!("Base URL is not a valid URL: {}", e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(GitHubError::configuration("Base URL must start with http:// or https://"));
        }

        if self.user_agent.is_empty() {
            return Err(GitHubError::configuration("User-Agent is required by GitHub API"));
        }

        if self.throttle.write_delay.is_zero() {
            return Err(GitHubError::configuration(
                "write_delay_ms must be greater than 0ms",
            ));
        }

        if self.throttle.parallel_requests && self.is_public_github() {
            return Err(GitHubError::configuration(
                "parallel_requests cannot be true when connecting to public GitHub",
            ));
        }

        Ok(())
    }

    /// Host name of the configured endpoint (used for `gh auth token`).
    pub fn hostname(&self) -> String {
        Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("api.").to_string()))
            .unwrap_or_else(|| "github.com".to_string())
    }

    /// Returns true when talking to github.com.
    pub fn is_public_github(&self) -> bool {
        matches!(
            Url::parse(&self.base_url).ok().as_ref().and_then(|u| u.host_str()),
            Some("github.com") | Some("api.github.com")
        )
    }

    fn is_data_residency(&self) -> Option<String> {
        let url = Url::parse(&self.base_url).ok()?;
        let host = url.host_str()?;
        if host.ends_with(".ghe.com") {
            Some(host.trim_start_matches("api.").to_string())
        } else {
            None
        }
    }

    /// REST (v3) endpoint, always ending in `/`.
    pub fn rest_url(&self) -> String {
        if self.is_public_github() {
            return DEFAULT_BASE_URL.to_string();
        }
        if let Some(host) = self.is_data_residency() {
            return format!("https://api.{}/", host);
        }

        let mut base = self.base_url.trim_end_matches('/').to_string();
        if !base.ends_with("/api/v3") {
            base.push_str("/api/v3");
        }
        base.push('/');
        base
    }

    /// GraphQL (v4) endpoint.
    pub fn graphql_url(&self) -> String {
        if self.is_public_github() {
            return "https://api.github.com/graphql".to_string();
        }
        if let Some(host) = self.is_data_residency() {
            return format!("https://api.{}/graphql", host);
        }

        match Url::parse(&self.base_url) {
            Ok(url) => {
                let mut origin = url.origin().ascii_serialization();
                origin.push_str("/api/graphql");
                origin
            }
            Err(_) => format!("{}/api/graphql", self.base_url.trim_end_matches('/')),
        }
    }
}

/// Builder for ProviderConfig.
#[derive(Debug, Default)]
pub struct ProviderConfigBuilder {
    token: Option<SecretString>,
    owner: Option<String>,
    base_url: Option<String>,
    insecure: Option<bool>,
    api_version: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    retry: Option<RetryConfig>,
    throttle: Option<ThrottleConfig>,
    rate_limit: Option<RateLimitConfig>,
    pool: Option<PoolConfig>,
}

impl ProviderConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::new(token.into()));
        self
    }

    /// Sets the owner.
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Disables TLS verification.
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = Some(insecure);
        self
    }

    /// Sets the API version.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the retry configuration.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Sets request pacing.
    pub fn throttle(mut self, config: ThrottleConfig) -> Self {
        self.throttle = Some(config);
        self
    }

    /// Sets the rate limit configuration.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    /// Sets the connection pool configuration.
    pub fn pool(mut self, config: PoolConfig) -> Self {
        self.pool = Some(config);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<ProviderConfig, GitHubError> {
        let config = ProviderConfig {
            token: self.token,
            owner: self.owner,
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            insecure: self.insecure.unwrap_or(false),
            api_version: self.api_version.unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            user_agent: self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            retry: self.retry.unwrap_or_default(),
            throttle: self.throttle.unwrap_or_default(),
            rate_limit: self.rate_limit.unwrap_or_default(),
            pool: self.pool.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use test_case::test_case;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ProviderConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert!(config.token.is_none());
        assert_eq!(config.retry.max_retries, 3);
        assert!(config.retry.retryable_errors.contains(&502));
        assert!(!config.throttle.parallel_requests);
    }

    #[test]
    fn test_config_builder() {
        let config = ProviderConfig::builder()
            .base_url("https://github.example.com/")
            .user_agent("test-client/1.0")
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap();

        assert_eq!(config.base_url, "https://github.example.com/");
        assert_eq!(config.user_agent, "test-client/1.0");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ProviderConfig::builder().base_url("invalid-url").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_write_delay_rejected() {
        let result =
            ProviderConfig::from_value_with_env(&json!({"write_delay_ms": 0}), env_of(&[]));
        assert!(result.is_err());
    }

    #[test]
    fn test_parallel_requests_rejected_on_public_github() {
        let result = ProviderConfig::from_value_with_env(
            &json!({"parallel_requests": true}),
            env_of(&[]),
        );
        assert!(result.is_err());

        let config = ProviderConfig::from_value_with_env(
            &json!({"parallel_requests": true, "base_url": "https://ghes.example.com/"}),
            env_of(&[]),
        )
        .unwrap();
        assert!(config.throttle.parallel_requests);
    }

    #[test]
    fn test_owner_from_env() {
        let config = ProviderConfig::from_value_with_env(
            &json!({}),
            env_of(&[("GITHUB_ORGANIZATION", "legacy"), ("GITHUB_OWNER", "acme")]),
        )
        .unwrap();
        assert_eq!(config.owner.as_deref(), Some("acme"));

        let config = ProviderConfig::from_value_with_env(
            &json!({"owner": "explicit"}),
            env_of(&[("GITHUB_OWNER", "acme")]),
        )
        .unwrap();
        assert_eq!(config.owner.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = ProviderConfig::from_value_with_env(&json!({"tokn": "x"}), env_of(&[]));
        assert!(result.is_err());
    }

    #[test]
    fn test_retry_settings_from_value() {
        let config = ProviderConfig::from_value_with_env(
            &json!({"max_retries": 5, "retry_delay_ms": 250, "retryable_errors": [502]}),
            env_of(&[]),
        )
        .unwrap();
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.retry_delay, Duration::from_millis(250));
        assert_eq!(config.retry.retryable_errors.len(), 1);
    }

    #[test_case("https://api.github.com/", "https://api.github.com/", "https://api.github.com/graphql")]
    #[test_case("https://github.com", "https://api.github.com/", "https://api.github.com/graphql")]
    #[test_case("https://acme.ghe.com/", "https://api.acme.ghe.com/", "https://api.acme.ghe.com/graphql")]
    #[test_case("https://ghes.example.com/", "https://ghes.example.com/api/v3/", "https://ghes.example.com/api/graphql")]
    #[test_case("https://ghes.example.com/api/v3/", "https://ghes.example.com/api/v3/", "https://ghes.example.com/api/graphql")]
    fn test_endpoints(base: &str, rest: &str, graphql: &str) {
        let config = ProviderConfig::builder().base_url(base).build().unwrap();
        assert_eq!(config.rest_url(), rest);
        assert_eq!(config.graphql_url(), graphql);
    }

    #[test]
    fn test_hostname() {
        let config = ProviderConfig::default();
        assert_eq!(config.hostname(), "github.com");
        let config = ProviderConfig::builder()
            .base_url("https://ghes.example.com/")
            .build()
            .unwrap();
        assert_eq!(config.hostname(), "ghes.example.com");
    }
}
