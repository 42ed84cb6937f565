//! Credential resolution for the GitHub API.

use crate::errors::{GitHubError, GitHubResult};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

/// Authentication method for GitHub API.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Personal access token, OAuth token or Actions `GITHUB_TOKEN`.
    Token(SecretString),
    /// Unauthenticated access (public data only, heavily rate limited).
    Anonymous,
}

impl AuthMethod {
    /// Creates a token authentication method.
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(SecretString::new(token.into()))
    }

    /// Returns true for anonymous access.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Gets the token prefix for logging.
    pub fn token_prefix(&self) -> &'static str {
        match self {
            Self::Token(t) => {
                let exposed = t.expose_secret();
                if exposed.starts_with("ghp_") {
                    "ghp_***"
                } else if exposed.starts_with("github_pat_") {
                    "github_pat_***"
                } else if exposed.starts_with("gho_") {
                    "gho_***"
                } else if exposed.starts_with("ghs_") {
                    "ghs_***"
                } else {
                    "***"
                }
            }
            Self::Anonymous => "anonymous",
        }
    }

    /// Generates the Authorization header value, if any.
    pub fn header_value(&self) -> Option<String> {
        match self {
            Self::Token(token) => Some(format!("Bearer {}", token.expose_secret())),
            Self::Anonymous => None,
        }
    }
}

/// A place a token can come from.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns a token if this source has one.
    async fn token(&self) -> GitHubResult<Option<SecretString>>;
}

/// Token given explicitly in the provider configuration.
pub struct StaticTokenSource {
    token: Option<SecretString>,
}

impl StaticTokenSource {
    /// Creates a new static source.
    pub fn new(token: Option<SecretString>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    fn name(&self) -> &'static str {
        "configuration"
    }

    async fn token(&self) -> GitHubResult<Option<SecretString>> {
        Ok(self
            .token
            .as_ref()
            .filter(|t| !t.expose_secret().is_empty())
            .cloned())
    }
}

/// Environment variable token source.
pub struct EnvTokenSource {
    token_var: String,
}

impl EnvTokenSource {
    /// Creates a source reading `GITHUB_TOKEN`.
    pub fn from_github_token() -> Self {
        Self {
            token_var: "GITHUB_TOKEN".to_string(),
        }
    }

    /// Creates a source reading a custom environment variable.
    pub fn from_env_var(var_name: impl Into<String>) -> Self {
        Self {
            token_var: var_name.into(),
        }
    }
}

#[async_trait]
impl TokenSource for EnvTokenSource {
    fn name(&self) -> &'static str {
        "environment"
    }

    async fn token(&self) -> GitHubResult<Option<SecretString>> {
        Ok(std::env::var(&self.token_var)
            .ok()
            .filter(|v| !v.is_empty())
            .map(SecretString::new))
    }
}

/// Asks the GitHub CLI for its stored token (`gh auth token`).
pub struct GhCliTokenSource {
    hostname: String,
}

impl GhCliTokenSource {
    /// Creates a source for the given host (e.g. `github.com`).
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }
}

#[async_trait]
impl TokenSource for GhCliTokenSource {
    fn name(&self) -> &'static str {
        "gh cli"
    }

    async fn token(&self) -> GitHubResult<Option<SecretString>> {
        let output = tokio::process::Command::new("gh")
            .args(["auth", "token", "--hostname", &self.hostname])
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            // gh not installed
            Err(_) => return Ok(None),
        };

        if !output.status.success() {
            return Ok(None);
        }

        let token = String::from_utf8(output.stdout).map_err(|e| {
            GitHubError::configuration(format!("gh auth token returned invalid UTF-8: {}", e))
        })?;
        let token = token.trim();
        if token.is_empty() {
            Ok(None)
        } else {
            Ok(Some(SecretString::new(token.to_string())))
        }
    }
}

/// Walks `sources` in order and returns the first token found, falling back
/// to anonymous access.
pub async fn resolve_auth(sources: &[Box<dyn TokenSource>]) -> GitHubResult<AuthMethod> {
    for source in sources {
        if let Some(token) = source.token().await? {
            tracing::debug!(source = source.name(), "Resolved GitHub token");
            return Ok(AuthMethod::Token(token));
        }
    }

    tracing::info!("No GitHub token found, using anonymous access");
    Ok(AuthMethod::Anonymous)
}

/// Default resolution chain: configuration, `GITHUB_TOKEN`, then `gh auth token`.
pub fn default_sources(
    configured: Option<SecretString>,
    hostname: &str,
) -> Vec<Box<dyn TokenSource>> {
    vec![
        Box::new(StaticTokenSource::new(configured)),
        Box::new(EnvTokenSource::from_github_token()),
        Box::new(GhCliTokenSource::new(hostname)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_prefix() {
        assert_eq!(AuthMethod::token("ghp_xxxxxxxxxxxx").token_prefix(), "ghp_***");
        assert_eq!(
            AuthMethod::token("github_pat_xxxx").token_prefix(),
            "github_pat_***"
        );
        assert_eq!(AuthMethod::Anonymous.token_prefix(), "anonymous");
    }

    #[test]
    fn test_header_value() {
        assert_eq!(
            AuthMethod::token("ghp_test").header_value().as_deref(),
            Some("Bearer ghp_test")
        );
        assert!(AuthMethod::Anonymous.header_value().is_none());
    }

    #[tokio::test]
    async fn test_static_source_wins() {
        let sources: Vec<Box<dyn TokenSource>> = vec![
            Box::new(StaticTokenSource::new(Some(SecretString::new("cfg".into())))),
            Box::new(EnvTokenSource::from_env_var("TF_GH_TEST_UNSET_TOKEN_VAR")),
        ];
        let auth = resolve_auth(&sources).await.unwrap();
        assert_eq!(auth.header_value().as_deref(), Some("Bearer cfg"));
    }

    #[tokio::test]
    async fn test_empty_sources_fall_back_to_anonymous() {
        let sources: Vec<Box<dyn TokenSource>> = vec![
            Box::new(StaticTokenSource::new(Some(SecretString::new(String::new())))),
            Box::new(EnvTokenSource::from_env_var("TF_GH_TEST_UNSET_TOKEN_VAR")),
        ];
        let auth = resolve_auth(&sources).await.unwrap();
        assert!(auth.is_anonymous());
    }
}
