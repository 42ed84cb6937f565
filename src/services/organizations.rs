//! Organization, membership and team operations.
//!
//! Teams are addressed by numeric ID through the
//! `/organizations/{org_id}/team/{team_id}` routes so that renames do not
//! break state.

use crate::client::GitHubClient;
use crate::errors::GitHubResult;
use crate::types::{OrgMembership, Organization, Repository, Team, TeamMembership, User};
use serde::Serialize;

/// Media type that makes the team/repo check return the repository with permissions.
const TEAM_REPO_ACCEPT: &str = "application/vnd.github.v3.repository+json";

/// Service for organization operations.
pub struct OrganizationsService<'a> {
    client: &'a GitHubClient,
}

impl<'a> OrganizationsService<'a> {
    /// Creates a new organizations service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Gets an organization, `None` when the login is not an organization.
    pub async fn get_optional(&self, org: &str) -> GitHubResult<Option<Organization>> {
        self.client.get_optional(&format!("/orgs/{}", org)).await
    }

    // Members

    /// Lists members of an organization.
    pub async fn list_members(&self, org: &str) -> GitHubResult<Vec<User>> {
        self.client.get_all(&format!("/orgs/{}/members", org)).await
    }

    /// Gets membership for a user, `None` when not a member.
    pub async fn get_membership(
        &self,
        org: &str,
        username: &str,
    ) -> GitHubResult<Option<OrgMembership>> {
        self.client
            .get_optional(&format!("/orgs/{}/memberships/{}", org, username))
            .await
    }

    /// Sets membership for a user (invites when not yet a member).
    pub async fn set_membership(
        &self,
        org: &str,
        username: &str,
        role: &str,
    ) -> GitHubResult<OrgMembership> {
        self.client
            .put(
                &format!("/orgs/{}/memberships/{}", org, username),
                &RoleRequest { role },
            )
            .await
    }

    /// Removes a user from an organization.
    pub async fn remove_membership(&self, org: &str, username: &str) -> GitHubResult<()> {
        self.client
            .delete(&format!("/orgs/{}/memberships/{}", org, username))
            .await
    }

    // Teams

    /// Lists every team in an organization.
    pub async fn list_teams(&self, org: &str) -> GitHubResult<Vec<Team>> {
        self.client.get_all(&format!("/orgs/{}/teams", org)).await
    }

    /// Gets a team by slug.
    pub async fn get_team_by_slug(&self, org: &str, slug: &str) -> GitHubResult<Option<Team>> {
        self.client
            .get_optional(&format!("/orgs/{}/teams/{}", org, slug))
            .await
    }

    /// Gets a team by ID.
    pub async fn get_team(&self, org_id: u64, team_id: u64) -> GitHubResult<Option<Team>> {
        self.client.get_optional(&team_path(org_id, team_id)).await
    }

    /// Creates a team.
    pub async fn create_team(&self, org: &str, request: &TeamRequest) -> GitHubResult<Team> {
        self.client
            .post(&format!("/orgs/{}/teams", org), request)
            .await
    }

    /// Updates a team.
    pub async fn update_team(
        &self,
        org_id: u64,
        team_id: u64,
        request: &TeamRequest,
    ) -> GitHubResult<Team> {
        self.client.patch(&team_path(org_id, team_id), request).await
    }

    /// Deletes a team.
    pub async fn delete_team(&self, org_id: u64, team_id: u64) -> GitHubResult<()> {
        self.client.delete(&team_path(org_id, team_id)).await
    }

    // Team members

    /// Lists team members, optionally filtered by role (member, maintainer).
    pub async fn list_team_members(
        &self,
        org_id: u64,
        team_id: u64,
        role: Option<&str>,
    ) -> GitHubResult<Vec<User>> {
        let path = format!("{}/members", team_path(org_id, team_id));
        match role {
            Some(role) => self.client.get_all_with_params(&path, &[("role", role)]).await,
            None => self.client.get_all(&path).await,
        }
    }

    /// Gets team membership for a user, `None` when not a member.
    pub async fn get_team_membership(
        &self,
        org_id: u64,
        team_id: u64,
        username: &str,
    ) -> GitHubResult<Option<TeamMembership>> {
        self.client
            .get_optional(&format!(
                "{}/memberships/{}",
                team_path(org_id, team_id),
                username
            ))
            .await
    }

    /// Adds or updates team membership for a user.
    pub async fn add_team_membership(
        &self,
        org_id: u64,
        team_id: u64,
        username: &str,
        role: &str,
    ) -> GitHubResult<TeamMembership> {
        self.client
            .put(
                &format!("{}/memberships/{}", team_path(org_id, team_id), username),
                &RoleRequest { role },
            )
            .await
    }

    /// Removes a user from a team.
    pub async fn remove_team_membership(
        &self,
        org_id: u64,
        team_id: u64,
        username: &str,
    ) -> GitHubResult<()> {
        self.client
            .delete(&format!(
                "{}/memberships/{}",
                team_path(org_id, team_id),
                username
            ))
            .await
    }

    // Team repos

    /// Lists repositories a team has access to.
    pub async fn list_team_repos(
        &self,
        org_id: u64,
        team_id: u64,
    ) -> GitHubResult<Vec<Repository>> {
        self.client
            .get_all(&format!("{}/repos", team_path(org_id, team_id)))
            .await
    }

    /// Gets a team's access to a repository, `None` when it has none.
    pub async fn get_team_repo(
        &self,
        org_id: u64,
        team_id: u64,
        owner: &str,
        repo: &str,
    ) -> GitHubResult<Option<Repository>> {
        let path = format!("{}/repos/{}/{}", team_path(org_id, team_id), owner, repo);
        match self.client.get_with_accept(&path, TEAM_REPO_ACCEPT).await {
            Ok(repo) => Ok(Some(repo)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Grants a team access to a repository.
    pub async fn add_team_repo(
        &self,
        org_id: u64,
        team_id: u64,
        owner: &str,
        repo: &str,
        permission: &str,
    ) -> GitHubResult<()> {
        self.client
            .put_no_response(
                &format!("{}/repos/{}/{}", team_path(org_id, team_id), owner, repo),
                &PermissionRequest { permission },
            )
            .await
    }

    /// Revokes a team's access to a repository.
    pub async fn remove_team_repo(
        &self,
        org_id: u64,
        team_id: u64,
        owner: &str,
        repo: &str,
    ) -> GitHubResult<()> {
        self.client
            .delete(&format!(
                "{}/repos/{}/{}",
                team_path(org_id, team_id),
                owner,
                repo
            ))
            .await
    }
}

fn team_path(org_id: u64, team_id: u64) -> String {
    format!("/organizations/{}/team/{}", org_id, team_id)
}

#[derive(Debug, Clone, Serialize)]
struct RoleRequest<'r> {
    role: &'r str,
}

#[derive(Debug, Clone, Serialize)]
struct PermissionRequest<'r> {
    permission: &'r str,
}

/// Request to create or update a team.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamRequest {
    /// Team name.
    pub name: String,
    /// Team description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Privacy level (secret, closed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<String>,
    /// Parent team ID; `null` detaches on update.
    pub parent_team_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_path() {
        assert_eq!(team_path(12, 34), "/organizations/12/team/34");
    }

    #[test]
    fn test_team_request_serializes_null_parent() {
        let body = serde_json::to_value(TeamRequest {
            name: "core".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(body["parent_team_id"].is_null());
        assert!(body.get("privacy").is_none());
    }
}
