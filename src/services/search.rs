//! GitHub Search API operations.

use crate::client::GitHubClient;
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use crate::types::{Meta, Repository};
use serde::Serialize;

/// Service for search and metadata lookups.
pub struct SearchService<'a> {
    client: &'a GitHubClient,
}

impl<'a> SearchService<'a> {
    /// Creates a new search service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Searches repositories, following every result page.
    pub async fn repositories(
        &self,
        params: &SearchRepositoriesParams,
    ) -> GitHubResult<Vec<Repository>> {
        let query = serde_urlencoded::to_string(params).map_err(|e| {
            GitHubError::new(
                GitHubErrorKind::InvalidRequest,
                format!("Failed to serialize search query: {}", e),
            )
        })?;
        self.client
            .get_all_wrapped(&format!("/search/repositories?{}", query), "items")
            .await
    }

    /// Gets GitHub's published metadata (IP ranges, SSH fingerprints).
    pub async fn meta(&self) -> GitHubResult<Meta> {
        self.client.get("/meta").await
    }
}

/// Parameters for repository search.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchRepositoriesParams {
    /// Search query.
    pub q: String,
    /// Sort field (stars, forks, updated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_params_encoding() {
        let params = SearchRepositoriesParams {
            q: "org:acme topic:rust".into(),
            sort: Some("updated".into()),
        };
        assert_eq!(
            serde_urlencoded::to_string(&params).unwrap(),
            "q=org%3Aacme+topic%3Arust&sort=updated"
        );
    }
}
