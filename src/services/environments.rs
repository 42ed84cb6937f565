//! Deployment environments.

use crate::client::{encode_segment, GitHubClient};
use crate::errors::GitHubResult;
use crate::types::{BranchPolicy, Environment};
use serde::Serialize;

/// Service for deployment environment operations.
pub struct EnvironmentsService<'a> {
    client: &'a GitHubClient,
}

impl<'a> EnvironmentsService<'a> {
    /// Creates a new environments service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Gets an environment, `None` when missing.
    pub async fn get(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
    ) -> GitHubResult<Option<Environment>> {
        self.client.get_optional(&env_path(owner, repo, name)).await
    }

    /// Creates or updates an environment.
    pub async fn create_or_update(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        request: &EnvironmentRequest,
    ) -> GitHubResult<Environment> {
        self.client.put(&env_path(owner, repo, name), request).await
    }

    /// Deletes an environment.
    pub async fn delete(&self, owner: &str, repo: &str, name: &str) -> GitHubResult<()> {
        self.client.delete(&env_path(owner, repo, name)).await
    }
}

fn env_path(owner: &str, repo: &str, name: &str) -> String {
    format!(
        "/repos/{}/{}/environments/{}",
        owner,
        repo,
        encode_segment(name)
    )
}

/// Request to create or update an environment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnvironmentRequest {
    /// Wait timer in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_timer: Option<u64>,
    /// Whether admins can bypass protection rules.
    pub can_admins_bypass: bool,
    /// Whether the deployer may not approve.
    pub prevent_self_review: bool,
    /// Required reviewers.
    pub reviewers: Vec<ReviewerRequest>,
    /// Deployment branch policy; `null` allows every branch.
    pub deployment_branch_policy: Option<BranchPolicy>,
}

/// Required reviewer in an environment payload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReviewerRequest {
    /// "User" or "Team".
    #[serde(rename = "type")]
    pub reviewer_type: String,
    /// Account or team ID.
    pub id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_path_escapes_name() {
        assert_eq!(
            env_path("o", "r", "prod/eu west"),
            "/repos/o/r/environments/prod%2Feu%20west"
        );
    }
}
