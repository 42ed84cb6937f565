//! Branches, references and branch protection.

use crate::client::GitHubClient;
use crate::errors::GitHubResult;
use crate::types::{Branch, BranchProtection, GitRef};
use serde::Serialize;

/// Service for branch and reference operations.
pub struct GitDataService<'a> {
    client: &'a GitHubClient,
}

impl<'a> GitDataService<'a> {
    /// Creates a new Git Data service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    // Reference operations

    /// Gets a reference (`heads/main`, `tags/v1`), `None` when missing.
    pub async fn get_ref(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> GitHubResult<Option<GitRef>> {
        let reference = reference.trim_start_matches("refs/");
        self.client
            .get_optional(&format!("/repos/{}/{}/git/ref/{}", owner, repo, reference))
            .await
    }

    /// Creates a reference.
    pub async fn create_ref(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
        sha: &str,
    ) -> GitHubResult<GitRef> {
        let request = CreateRefRequest {
            ref_name: full_ref(reference),
            sha: sha.to_string(),
        };
        self.client
            .post(&format!("/repos/{}/{}/git/refs", owner, repo), &request)
            .await
    }

    /// Deletes a reference.
    pub async fn delete_ref(&self, owner: &str, repo: &str, reference: &str) -> GitHubResult<()> {
        let reference = reference.trim_start_matches("refs/");
        self.client
            .delete(&format!("/repos/{}/{}/git/refs/{}", owner, repo, reference))
            .await
    }

    // Branch operations

    /// Renames a branch.
    pub async fn rename_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        new_name: &str,
    ) -> GitHubResult<Branch> {
        self.client
            .post(
                &format!("/repos/{}/{}/branches/{}/rename", owner, repo, branch),
                &serde_json::json!({ "new_name": new_name }),
            )
            .await
    }

    // Branch protection

    /// Gets branch protection, `None` when the branch is unprotected.
    pub async fn get_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> GitHubResult<Option<BranchProtection>> {
        self.client
            .get_optional(&format!(
                "/repos/{}/{}/branches/{}/protection",
                owner, repo, branch
            ))
            .await
    }

    /// Replaces branch protection.
    pub async fn update_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        request: &ProtectionRequest,
    ) -> GitHubResult<BranchProtection> {
        self.client
            .put(
                &format!("/repos/{}/{}/branches/{}/protection", owner, repo, branch),
                request,
            )
            .await
    }

    /// Removes branch protection.
    pub async fn delete_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> GitHubResult<()> {
        self.client
            .delete(&format!(
                "/repos/{}/{}/branches/{}/protection",
                owner, repo, branch
            ))
            .await
    }

    /// Enables or disables required commit signatures.
    pub async fn set_required_signatures(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        enabled: bool,
    ) -> GitHubResult<()> {
        let path = format!(
            "/repos/{}/{}/branches/{}/protection/required_signatures",
            owner, repo, branch
        );
        if enabled {
            self.client.post_no_response(&path, &serde_json::json!({})).await
        } else {
            match self.client.delete(&path).await {
                Err(e) if e.is_not_found() => Ok(()),
                other => other,
            }
        }
    }
}

/// Expands `heads/main` or `main` style names to `refs/heads/main`.
pub fn full_ref(reference: &str) -> String {
    if reference.starts_with("refs/") {
        reference.to_string()
    } else if reference.starts_with("heads/") || reference.starts_with("tags/") {
        format!("refs/{}", reference)
    } else {
        format!("refs/heads/{}", reference)
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateRefRequest {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: String,
}

/// Branch protection write payload. GitHub requires the four top-level keys
/// to be present even when null.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProtectionRequest {
    /// Required status checks.
    pub required_status_checks: Option<StatusChecksRequest>,
    /// Enforce for admins.
    pub enforce_admins: bool,
    /// Required pull request reviews.
    pub required_pull_request_reviews: Option<ReviewsRequest>,
    /// Push restrictions.
    pub restrictions: Option<RestrictionsRequest>,
    /// Require linear history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_linear_history: Option<bool>,
    /// Require conversation resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_conversation_resolution: Option<bool>,
    /// Allow force pushes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_force_pushes: Option<bool>,
    /// Allow deletions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_deletions: Option<bool>,
}

/// Status checks in a protection payload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusChecksRequest {
    /// Require branches to be up to date.
    pub strict: bool,
    /// Check contexts.
    pub contexts: Vec<String>,
}

/// Review requirements in a protection payload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReviewsRequest {
    /// Dismiss stale reviews on push.
    pub dismiss_stale_reviews: bool,
    /// Require code owner review.
    pub require_code_owner_reviews: bool,
    /// Required approving review count.
    pub required_approving_review_count: u64,
    /// Require approval of the most recent push.
    pub require_last_push_approval: bool,
}

/// Push restrictions in a protection payload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestrictionsRequest {
    /// User logins.
    pub users: Vec<String>,
    /// Team slugs.
    pub teams: Vec<String>,
    /// App slugs.
    pub apps: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("main", "refs/heads/main")]
    #[test_case("heads/feature/x", "refs/heads/feature/x")]
    #[test_case("tags/v1.0", "refs/tags/v1.0")]
    #[test_case("refs/heads/main", "refs/heads/main")]
    fn test_full_ref(input: &str, expected: &str) {
        assert_eq!(full_ref(input), expected);
    }

    #[test]
    fn test_protection_request_keeps_null_keys() {
        let body = serde_json::to_value(ProtectionRequest::default()).unwrap();
        let obj = body.as_object().unwrap();
        assert!(obj.contains_key("required_status_checks"));
        assert!(obj.contains_key("restrictions"));
        assert!(obj["required_pull_request_reviews"].is_null());
        assert!(!obj.contains_key("allow_deletions"));
    }
}
