//! Repository operations.

use crate::client::{encode_path, GitHubClient};
use crate::errors::GitHubResult;
use crate::types::{Autolink, Content, FileCommitResponse, Key, Repository, Topics};
use serde::Serialize;

/// Media type required by the topics endpoints on older GHES releases.
const TOPICS_ACCEPT: &str = "application/vnd.github.mercy-preview+json";

/// Service for repository operations.
pub struct RepositoriesService<'a> {
    client: &'a GitHubClient,
}

impl<'a> RepositoriesService<'a> {
    /// Creates a new repositories service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Gets a repository.
    pub async fn get(&self, owner: &str, repo: &str) -> GitHubResult<Repository> {
        self.client.get(&format!("/repos/{}/{}", owner, repo)).await
    }

    /// Gets a repository, `None` when it does not exist.
    pub async fn get_optional(&self, owner: &str, repo: &str) -> GitHubResult<Option<Repository>> {
        self.client
            .get_optional(&format!("/repos/{}/{}", owner, repo))
            .await
    }

    /// Lists repositories of an organization.
    pub async fn list_for_org(&self, org: &str) -> GitHubResult<Vec<Repository>> {
        self.client.get_all(&format!("/orgs/{}/repos", org)).await
    }

    /// Creates a repository for the authenticated user.
    pub async fn create(&self, request: &CreateRepoRequest) -> GitHubResult<Repository> {
        self.client.post("/user/repos", request).await
    }

    /// Creates a repository for an organization.
    pub async fn create_for_org(
        &self,
        org: &str,
        request: &CreateRepoRequest,
    ) -> GitHubResult<Repository> {
        self.client
            .post(&format!("/orgs/{}/repos", org), request)
            .await
    }

    /// Creates a repository from a template repository.
    pub async fn create_from_template(
        &self,
        template_owner: &str,
        template_repo: &str,
        request: &TemplateRepoRequest,
    ) -> GitHubResult<Repository> {
        self.client
            .post(
                &format!("/repos/{}/{}/generate", template_owner, template_repo),
                request,
            )
            .await
    }

    /// Updates a repository.
    pub async fn update(
        &self,
        owner: &str,
        repo: &str,
        request: &UpdateRepoRequest,
    ) -> GitHubResult<Repository> {
        self.client
            .patch(&format!("/repos/{}/{}", owner, repo), request)
            .await
    }

    /// Deletes a repository.
    pub async fn delete(&self, owner: &str, repo: &str) -> GitHubResult<()> {
        self.client
            .delete(&format!("/repos/{}/{}", owner, repo))
            .await
    }

    // Topics

    /// Gets repository topics.
    pub async fn get_topics(&self, owner: &str, repo: &str) -> GitHubResult<Vec<String>> {
        let topics: Topics = self
            .client
            .get_with_accept(&format!("/repos/{}/{}/topics", owner, repo), TOPICS_ACCEPT)
            .await?;
        Ok(topics.names)
    }

    /// Replaces all repository topics.
    pub async fn replace_topics(
        &self,
        owner: &str,
        repo: &str,
        names: &[String],
    ) -> GitHubResult<Vec<String>> {
        let topics: Topics = self
            .client
            .put(
                &format!("/repos/{}/{}/topics", owner, repo),
                &Topics {
                    names: names.to_vec(),
                },
            )
            .await?;
        Ok(topics.names)
    }

    // Vulnerability alerts

    /// Returns true when Dependabot vulnerability alerts are enabled.
    pub async fn vulnerability_alerts_enabled(
        &self,
        owner: &str,
        repo: &str,
    ) -> GitHubResult<bool> {
        let path = format!("/repos/{}/{}/vulnerability-alerts", owner, repo);
        match self.client.get::<serde_json::Value>(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Enables or disables vulnerability alerts.
    pub async fn set_vulnerability_alerts(
        &self,
        owner: &str,
        repo: &str,
        enabled: bool,
    ) -> GitHubResult<()> {
        let path = format!("/repos/{}/{}/vulnerability-alerts", owner, repo);
        if enabled {
            self.client.put_no_response(&path, &serde_json::json!({})).await
        } else {
            self.client.delete(&path).await
        }
    }

    // Contents

    /// Gets a file, `None` when it does not exist.
    pub async fn get_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> GitHubResult<Option<Content>> {
        let url = format!("/repos/{}/{}/contents/{}", owner, repo, encode_path(path));
        match git_ref {
            Some(r) => {
                self.client
                    .get_with_params::<Content, _>(&url, &[("ref", r)])
                    .await
                    .map(Some)
                    .or_else(|e| if e.is_not_found() { Ok(None) } else { Err(e) })
            }
            None => self.client.get_optional(&url).await,
        }
    }

    /// Creates or updates a file.
    pub async fn create_or_update_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        request: &CreateOrUpdateFileRequest,
    ) -> GitHubResult<FileCommitResponse> {
        self.client
            .put(
                &format!("/repos/{}/{}/contents/{}", owner, repo, encode_path(path)),
                request,
            )
            .await
    }

    /// Deletes a file.
    pub async fn delete_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        request: &DeleteFileRequest,
    ) -> GitHubResult<()> {
        // GitHub uses DELETE with a body for this operation
        self.client
            .delete_with_body(
                &format!("/repos/{}/{}/contents/{}", owner, repo, encode_path(path)),
                request,
            )
            .await
    }

    // Deploy keys

    /// Adds a deploy key.
    pub async fn create_deploy_key(
        &self,
        owner: &str,
        repo: &str,
        request: &CreateKeyRequest,
    ) -> GitHubResult<Key> {
        self.client
            .post(&format!("/repos/{}/{}/keys", owner, repo), request)
            .await
    }

    /// Gets a deploy key.
    pub async fn get_deploy_key(
        &self,
        owner: &str,
        repo: &str,
        key_id: u64,
    ) -> GitHubResult<Option<Key>> {
        self.client
            .get_optional(&format!("/repos/{}/{}/keys/{}", owner, repo, key_id))
            .await
    }

    /// Removes a deploy key.
    pub async fn delete_deploy_key(
        &self,
        owner: &str,
        repo: &str,
        key_id: u64,
    ) -> GitHubResult<()> {
        self.client
            .delete(&format!("/repos/{}/{}/keys/{}", owner, repo, key_id))
            .await
    }

    // Autolinks

    /// Creates an autolink reference.
    pub async fn create_autolink(
        &self,
        owner: &str,
        repo: &str,
        request: &CreateAutolinkRequest,
    ) -> GitHubResult<Autolink> {
        self.client
            .post(&format!("/repos/{}/{}/autolinks", owner, repo), request)
            .await
    }

    /// Gets an autolink reference.
    pub async fn get_autolink(
        &self,
        owner: &str,
        repo: &str,
        id: u64,
    ) -> GitHubResult<Option<Autolink>> {
        self.client
            .get_optional(&format!("/repos/{}/{}/autolinks/{}", owner, repo, id))
            .await
    }

    /// Lists autolink references.
    pub async fn list_autolinks(&self, owner: &str, repo: &str) -> GitHubResult<Vec<Autolink>> {
        self.client
            .get_all(&format!("/repos/{}/{}/autolinks", owner, repo))
            .await
    }

    /// Deletes an autolink reference.
    pub async fn delete_autolink(&self, owner: &str, repo: &str, id: u64) -> GitHubResult<()> {
        self.client
            .delete(&format!("/repos/{}/{}/autolinks/{}", owner, repo, id))
            .await
    }
}

/// Request to create a repository.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateRepoRequest {
    /// Repository name.
    pub name: String,
    /// Repository description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Homepage URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    /// Whether the repository is private.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    /// Visibility (public, private, internal).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    /// Whether issues are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_issues: Option<bool>,
    /// Whether discussions are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_discussions: Option<bool>,
    /// Whether projects are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_projects: Option<bool>,
    /// Whether wiki is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_wiki: Option<bool>,
    /// Whether the repository is a template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_template: Option<bool>,
    /// Whether merge commits are allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_merge_commit: Option<bool>,
    /// Whether squash merges are allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_squash_merge: Option<bool>,
    /// Whether rebase merges are allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_rebase_merge: Option<bool>,
    /// Whether auto-merge is allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_auto_merge: Option<bool>,
    /// Whether head branches are deleted after merge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_branch_on_merge: Option<bool>,
    /// Auto-initialize with README.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_init: Option<bool>,
    /// Gitignore template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gitignore_template: Option<String>,
    /// License template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_template: Option<String>,
}

/// Request to generate a repository from a template.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateRepoRequest {
    /// Account the new repository belongs to.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Repository description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the repository is private.
    pub private: bool,
    /// Copy every branch of the template.
    pub include_all_branches: bool,
}

/// Request to update a repository.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateRepoRequest {
    /// Repository name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Repository description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Homepage URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    /// Visibility (public, private, internal).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    /// Whether issues are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_issues: Option<bool>,
    /// Whether discussions are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_discussions: Option<bool>,
    /// Whether projects are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_projects: Option<bool>,
    /// Whether wiki is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_wiki: Option<bool>,
    /// Whether the repository is a template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_template: Option<bool>,
    /// Whether merge commits are allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_merge_commit: Option<bool>,
    /// Whether squash merges are allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_squash_merge: Option<bool>,
    /// Whether rebase merges are allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_rebase_merge: Option<bool>,
    /// Whether auto-merge is allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_auto_merge: Option<bool>,
    /// Whether head branches are deleted after merge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_branch_on_merge: Option<bool>,
    /// Default branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    /// Whether the repository is archived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

/// Request to create or update a file.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrUpdateFileRequest {
    /// Commit message.
    pub message: String,
    /// File content (base64 encoded).
    pub content: String,
    /// SHA of the file being replaced (for updates).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    /// Branch name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Committer information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committer: Option<crate::types::CommitAuthor>,
}

/// Request to delete a file.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteFileRequest {
    /// Commit message.
    pub message: String,
    /// SHA of the file being deleted.
    pub sha: String,
    /// Branch name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Committer information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committer: Option<crate::types::CommitAuthor>,
}

/// Request to add a deploy key or user SSH key.
#[derive(Debug, Clone, Serialize)]
pub struct CreateKeyRequest {
    /// Title.
    pub title: String,
    /// Public key.
    pub key: String,
    /// Read-only access (deploy keys only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

/// Request to create an autolink reference.
#[derive(Debug, Clone, Serialize)]
pub struct CreateAutolinkRequest {
    /// Key prefix.
    pub key_prefix: String,
    /// URL template containing `<num>`.
    pub url_template: String,
    /// Whether references are alphanumeric.
    pub is_alphanumeric: bool,
}
