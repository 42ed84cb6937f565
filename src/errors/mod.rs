//! Error types for the GitHub client and the provider layer.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Result type alias for GitHub API operations.
pub type GitHubResult<T> = Result<T, GitHubError>;

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Coarse classification of a failed GitHub call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// Client or provider settings are unusable.
    Configuration,
    /// GitHub rejected the request body or parameters (400, 422).
    InvalidRequest,
    /// Token missing or rejected (401).
    Unauthorized,
    /// Token lacks access to the object (403).
    Forbidden,
    /// The organization enforces SAML SSO for this token.
    SsoRequired,
    /// Object does not exist (404, 410).
    NotFound,
    /// Remote state conflicts with the request (409).
    Conflict,
    /// Primary or secondary rate limit.
    RateLimited,
    /// GitHub failed to serve the request (5xx).
    Server,
    /// The request never got a response.
    Transport,
    /// A response body did not have the expected shape.
    Decode,
    /// A GraphQL document returned errors.
    Query,
    /// Anything else.
    Unknown,
}

impl GitHubErrorKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::InvalidRequest => "invalid_request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::SsoRequired => "sso_required",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::RateLimited => "rate_limited",
            Self::Server => "server_error",
            Self::Transport => "transport",
            Self::Decode => "decode",
            Self::Query => "query",
            Self::Unknown => "unknown",
        }
    }

    /// Classifies a non-success status and its message.
    pub fn from_status(status: u16, message: &str) -> Self {
        let lower = message.to_lowercase();
        match status {
            400 | 422 => Self::InvalidRequest,
            401 => Self::Unauthorized,
            403 if lower.contains("rate limit") || lower.contains("abuse") => Self::RateLimited,
            403 if message.contains("SAML") => Self::SsoRequired,
            403 => Self::Forbidden,
            404 | 410 => Self::NotFound,
            409 => Self::Conflict,
            429 => Self::RateLimited,
            500..=599 => Self::Server,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for GitHubErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate limit headers of a response.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// Requests allowed per window.
    pub limit: u32,
    /// Requests left in the window.
    pub remaining: u32,
    /// When the window resets.
    pub reset_at: DateTime<Utc>,
    /// `Retry-After` in seconds.
    pub retry_after: Option<u64>,
    /// Rate limit bucket (`core`, `graphql`, ...).
    pub resource: Option<String>,
}

/// A failed GitHub API call.
#[derive(Error, Debug)]
pub struct GitHubError {
    kind: GitHubErrorKind,
    message: String,
    status_code: Option<u16>,
    request_id: Option<String>,
    rate_limit: Option<RateLimitInfo>,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for GitHubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(code) = self.status_code {
            write!(f, " (HTTP {})", code)?;
        }
        if let Some(ref id) = self.request_id {
            write!(f, " [request_id: {}]", id)?;
        }
        Ok(())
    }
}

impl GitHubError {
    /// Creates an error of the given kind.
    pub fn new(kind: GitHubErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            request_id: None,
            rate_limit: None,
            cause: None,
        }
    }

    /// Classifies an error response by status and message.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(GitHubErrorKind::from_status(status, &message), message).with_status(status)
    }

    /// Sets the HTTP status code.
    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Sets the `X-GitHub-Request-Id` of the failed response.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Attaches rate limit headers.
    pub fn with_rate_limit(mut self, info: RateLimitInfo) -> Self {
        self.rate_limit = Some(info);
        self
    }

    /// Attaches the underlying error.
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Error kind.
    pub fn kind(&self) -> &GitHubErrorKind {
        &self.kind
    }

    /// Error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status, when a response was received.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Request ID reported by GitHub.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Rate limit headers of the failed response.
    pub fn rate_limit(&self) -> Option<&RateLimitInfo> {
        self.rate_limit.as_ref()
    }

    /// Returns true when the remote object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind == GitHubErrorKind::NotFound
    }

    /// Returns true for primary and secondary rate limits.
    pub fn is_rate_limited(&self) -> bool {
        self.kind == GitHubErrorKind::RateLimited
    }

    /// Returns true for failures that never reached GitHub.
    pub fn is_transport(&self) -> bool {
        self.kind == GitHubErrorKind::Transport
    }

    /// Seconds to wait before the next attempt.
    pub fn retry_after(&self) -> Option<u64> {
        let rl = self.rate_limit.as_ref()?;
        rl.retry_after.or_else(|| {
            let wait = (rl.reset_at - Utc::now()).num_seconds();
            (wait > 0).then_some(wait as u64)
        })
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::Configuration, message)
    }

    /// Creates a 404 error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::NotFound, message).with_status(404)
    }

    /// Creates an exhausted rate limit error.
    pub fn rate_limited(info: RateLimitInfo) -> Self {
        let message = match info.resource {
            Some(ref bucket) => format!("Rate limit exceeded for {}", bucket),
            None => "Rate limit exceeded".to_string(),
        };
        Self::new(GitHubErrorKind::RateLimited, message).with_rate_limit(info)
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::Transport, message)
    }

    /// Creates a response decoding error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::Decode, message)
    }
}

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Blocks the operation.
    Error,
    /// Reported but not blocking.
    Warning,
}

/// A validation or runtime message attached to an attribute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity.
    pub severity: Severity,
    /// Short summary.
    pub summary: String,
    /// Longer detail.
    pub detail: Option<String>,
    /// Attribute path the diagnostic refers to (e.g. `configuration.url`).
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Creates an error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Creates a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Attaches a detail message.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attaches an attribute path.
    pub fn with_attribute(mut self, path: impl Into<String>) -> Self {
        self.attribute = Some(path.into());
        self
    }

    /// Returns true for error severity.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref attr) = self.attribute {
            write!(f, "{}: ", attr)?;
        }
        write!(f, "{}", self.summary)?;
        if let Some(ref detail) = self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

/// Errors surfaced by provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The GitHub API returned an error.
    #[error(transparent)]
    Api(#[from] GitHubError),

    /// Configuration failed validation.
    #[error("{}", format_diagnostics(.0))]
    Validation(Vec<Diagnostic>),

    /// The provider configuration is invalid.
    #[error("invalid provider configuration: {0}")]
    Configuration(String),

    /// An operation ran before `configure`.
    #[error("provider is not configured")]
    NotConfigured,

    /// The resource can only be managed under an organization owner.
    #[error("{0} can only be used in the context of an organization, \"{1}\" is a user")]
    RequiresOrganization(&'static str, String),

    /// An ID string could not be parsed.
    #[error("unexpected ID format ({id:?}); expected {expected}")]
    InvalidId {
        /// The raw ID.
        id: String,
        /// Description of the expected form.
        expected: &'static str,
    },

    /// State could not be converted to or from a model.
    #[error("state conversion failed: {0}")]
    State(#[from] serde_json::Error),

    /// Secret encryption failed.
    #[error("secret encryption failed: {0}")]
    Encryption(String),

    /// No resource or data source is registered under this name.
    #[error("unknown {kind} type {name:?}")]
    UnknownType {
        /// "resource" or "data source".
        kind: &'static str,
        /// Type name.
        name: String,
    },

    /// Import target does not exist.
    #[error("cannot import non-existent remote object {0:?}")]
    ImportNotFound(String),

    /// A remote precondition is not met (e.g. file exists, conflicting state).
    #[error("{0}")]
    Conflict(String),
}

impl ProviderError {
    /// Returns true when the wrapped API error is a 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_not_found())
    }
}

fn format_diagnostics(diags: &[Diagnostic]) -> String {
    diags
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_error_display() {
        let error = GitHubError::from_status(404, "Repository not found").with_request_id("abc123");

        assert_eq!(
            error.to_string(),
            "[not_found] Repository not found (HTTP 404) [request_id: abc123]"
        );
        assert!(error.is_not_found());
    }

    #[test_case(403, "You have exceeded a secondary rate limit", GitHubErrorKind::RateLimited)]
    #[test_case(403, "You have triggered an abuse detection mechanism", GitHubErrorKind::RateLimited)]
    #[test_case(403, "Resource protected by organization SAML enforcement", GitHubErrorKind::SsoRequired)]
    #[test_case(403, "Must have admin rights to Repository.", GitHubErrorKind::Forbidden)]
    #[test_case(410, "Gone", GitHubErrorKind::NotFound)]
    #[test_case(422, "Validation Failed", GitHubErrorKind::InvalidRequest)]
    #[test_case(504, "Gateway Timeout", GitHubErrorKind::Server)]
    #[test_case(418, "I'm a teapot", GitHubErrorKind::Unknown)]
    fn test_kind_from_status(status: u16, message: &str, expected: GitHubErrorKind) {
        assert_eq!(*GitHubError::from_status(status, message).kind(), expected);
    }

    #[test]
    fn test_retry_after_prefers_header() {
        let info = RateLimitInfo {
            limit: 5000,
            remaining: 0,
            reset_at: Utc::now() + chrono::Duration::seconds(600),
            retry_after: Some(30),
            resource: Some("core".into()),
        };
        let error = GitHubError::rate_limited(info.clone());
        assert_eq!(error.retry_after(), Some(30));
        assert!(error.message().contains("core"));

        let error = GitHubError::rate_limited(RateLimitInfo { retry_after: None, ..info });
        assert!(error.retry_after().is_some_and(|s| s > 590));
    }

    #[test]
    fn test_provider_error_not_found() {
        let err: ProviderError = GitHubError::not_found("gone").into();
        assert!(err.is_not_found());

        let err = ProviderError::Configuration("bad".into());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ProviderError::Validation(vec![
            Diagnostic::error("missing required attribute").with_attribute("name"),
            Diagnostic::error("value must be one of: a, b").with_attribute("privacy"),
        ]);
        let text = err.to_string();
        assert!(text.contains("name: missing required attribute"));
        assert!(text.contains("privacy: value must be one of"));
    }
}
