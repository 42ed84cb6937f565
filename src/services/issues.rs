//! Issue, label and milestone operations.

use crate::client::{encode_segment, GitHubClient};
use crate::errors::GitHubResult;
use crate::types::{Issue, Label, Milestone};
use serde::Serialize;

/// Service for issue operations.
pub struct IssuesService<'a> {
    client: &'a GitHubClient,
}

impl<'a> IssuesService<'a> {
    /// Creates a new issues service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Gets an issue, `None` when missing.
    pub async fn get(&self, owner: &str, repo: &str, number: u64) -> GitHubResult<Option<Issue>> {
        self.client
            .get_optional(&format!("/repos/{}/{}/issues/{}", owner, repo, number))
            .await
    }

    /// Creates an issue.
    pub async fn create(
        &self,
        owner: &str,
        repo: &str,
        request: &IssueRequest,
    ) -> GitHubResult<Issue> {
        self.client
            .post(&format!("/repos/{}/{}/issues", owner, repo), request)
            .await
    }

    /// Updates an issue.
    pub async fn update(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        request: &IssueRequest,
    ) -> GitHubResult<Issue> {
        self.client
            .patch(&format!("/repos/{}/{}/issues/{}", owner, repo, number), request)
            .await
    }

    /// Closes an issue. Issues cannot be deleted through the REST API.
    pub async fn close(&self, owner: &str, repo: &str, number: u64) -> GitHubResult<Issue> {
        self.client
            .patch(
                &format!("/repos/{}/{}/issues/{}", owner, repo, number),
                &serde_json::json!({ "state": "closed" }),
            )
            .await
    }

    // Labels

    /// Lists every label of a repository.
    pub async fn list_labels(&self, owner: &str, repo: &str) -> GitHubResult<Vec<Label>> {
        self.client
            .get_all(&format!("/repos/{}/{}/labels", owner, repo))
            .await
    }

    /// Gets a label, `None` when missing.
    pub async fn get_label(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
    ) -> GitHubResult<Option<Label>> {
        self.client
            .get_optional(&format!(
                "/repos/{}/{}/labels/{}",
                owner,
                repo,
                encode_segment(name)
            ))
            .await
    }

    /// Creates a label.
    pub async fn create_label(
        &self,
        owner: &str,
        repo: &str,
        request: &LabelRequest,
    ) -> GitHubResult<Label> {
        self.client
            .post(&format!("/repos/{}/{}/labels", owner, repo), request)
            .await
    }

    /// Updates a label; `request.new_name` renames it.
    pub async fn update_label(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        request: &LabelRequest,
    ) -> GitHubResult<Label> {
        self.client
            .patch(
                &format!("/repos/{}/{}/labels/{}", owner, repo, encode_segment(name)),
                request,
            )
            .await
    }

    /// Deletes a label.
    pub async fn delete_label(&self, owner: &str, repo: &str, name: &str) -> GitHubResult<()> {
        self.client
            .delete(&format!(
                "/repos/{}/{}/labels/{}",
                owner,
                repo,
                encode_segment(name)
            ))
            .await
    }

    // Milestones

    /// Gets a milestone, `None` when missing.
    pub async fn get_milestone(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> GitHubResult<Option<Milestone>> {
        self.client
            .get_optional(&format!("/repos/{}/{}/milestones/{}", owner, repo, number))
            .await
    }

    /// Creates a milestone.
    pub async fn create_milestone(
        &self,
        owner: &str,
        repo: &str,
        request: &MilestoneRequest,
    ) -> GitHubResult<Milestone> {
        self.client
            .post(&format!("/repos/{}/{}/milestones", owner, repo), request)
            .await
    }

    /// Updates a milestone.
    pub async fn update_milestone(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        request: &MilestoneRequest,
    ) -> GitHubResult<Milestone> {
        self.client
            .patch(
                &format!("/repos/{}/{}/milestones/{}", owner, repo, number),
                request,
            )
            .await
    }

    /// Deletes a milestone.
    pub async fn delete_milestone(&self, owner: &str, repo: &str, number: u64) -> GitHubResult<()> {
        self.client
            .delete(&format!("/repos/{}/{}/milestones/{}", owner, repo, number))
            .await
    }
}

/// Request to create or update an issue.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IssueRequest {
    /// Issue title.
    pub title: String,
    /// Issue body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Assignee logins.
    pub assignees: Vec<String>,
    /// Label names.
    pub labels: Vec<String>,
    /// Milestone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<u64>,
    /// State (open, closed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Request to create or update a label.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LabelRequest {
    /// Label name (create only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New label name (update only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    /// Label color (hex without #).
    pub color: String,
    /// Label description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Request to create or update a milestone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MilestoneRequest {
    /// Milestone title.
    pub title: String,
    /// Milestone state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Milestone description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Due date (ISO 8601 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_on: Option<String>,
}
