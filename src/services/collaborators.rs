//! Repository collaborators, invitations and team grants.

use crate::client::GitHubClient;
use crate::errors::GitHubResult;
use crate::types::{Collaborator, RepositoryInvitation, Team};
use serde::Serialize;

/// Service for repository access management.
pub struct CollaboratorsService<'a> {
    client: &'a GitHubClient,
}

impl<'a> CollaboratorsService<'a> {
    /// Creates a new collaborators service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Lists collaborators filtered by affiliation (outside, direct, all).
    pub async fn list(
        &self,
        owner: &str,
        repo: &str,
        affiliation: &str,
    ) -> GitHubResult<Vec<Collaborator>> {
        self.client
            .get_all_with_params(
                &format!("/repos/{}/{}/collaborators", owner, repo),
                &[("affiliation", affiliation)],
            )
            .await
    }

    /// Adds a collaborator. Returns the invitation when one was sent; `None`
    /// when the user already had access and the permission was updated.
    pub async fn add(
        &self,
        owner: &str,
        repo: &str,
        username: &str,
        permission: &str,
    ) -> GitHubResult<Option<RepositoryInvitation>> {
        self.client
            .put_optional(
                &format!("/repos/{}/{}/collaborators/{}", owner, repo, username),
                &PermissionRequest { permission },
            )
            .await
    }

    /// Removes a collaborator.
    pub async fn remove(&self, owner: &str, repo: &str, username: &str) -> GitHubResult<()> {
        self.client
            .delete(&format!(
                "/repos/{}/{}/collaborators/{}",
                owner, repo, username
            ))
            .await
    }

    // Invitations

    /// Lists pending invitations.
    pub async fn list_invitations(
        &self,
        owner: &str,
        repo: &str,
    ) -> GitHubResult<Vec<RepositoryInvitation>> {
        self.client
            .get_all(&format!("/repos/{}/{}/invitations", owner, repo))
            .await
    }

    /// Changes the permission offered by an invitation.
    pub async fn update_invitation(
        &self,
        owner: &str,
        repo: &str,
        invitation_id: u64,
        permission: &str,
    ) -> GitHubResult<RepositoryInvitation> {
        self.client
            .patch(
                &format!("/repos/{}/{}/invitations/{}", owner, repo, invitation_id),
                &PermissionsRequest {
                    permissions: invitation_permission(permission),
                },
            )
            .await
    }

    /// Revokes an invitation.
    pub async fn delete_invitation(
        &self,
        owner: &str,
        repo: &str,
        invitation_id: u64,
    ) -> GitHubResult<()> {
        self.client
            .delete(&format!(
                "/repos/{}/{}/invitations/{}",
                owner, repo, invitation_id
            ))
            .await
    }

    // Teams

    /// Lists teams with access to a repository.
    pub async fn list_teams(&self, owner: &str, repo: &str) -> GitHubResult<Vec<Team>> {
        self.client
            .get_all(&format!("/repos/{}/{}/teams", owner, repo))
            .await
    }

    /// Grants a team (by slug) access to a repository.
    pub async fn add_team(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
        permission: &str,
    ) -> GitHubResult<()> {
        self.client
            .put_no_response(
                &format!("/orgs/{}/teams/{}/repos/{}/{}", org, team_slug, owner, repo),
                &PermissionRequest { permission },
            )
            .await
    }

    /// Revokes a team's (by slug) access to a repository.
    pub async fn remove_team(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
    ) -> GitHubResult<()> {
        self.client
            .delete(&format!(
                "/orgs/{}/teams/{}/repos/{}/{}",
                org, team_slug, owner, repo
            ))
            .await
    }
}

/// Invitations use role names (`read`, `write`) rather than `pull`/`push`.
fn invitation_permission(permission: &str) -> &str {
    match permission {
        "pull" => "read",
        "push" => "write",
        other => other,
    }
}

#[derive(Debug, Clone, Serialize)]
struct PermissionRequest<'r> {
    permission: &'r str,
}

#[derive(Debug, Clone, Serialize)]
struct PermissionsRequest<'r> {
    permissions: &'r str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invitation_permission() {
        assert_eq!(invitation_permission("pull"), "read");
        assert_eq!(invitation_permission("push"), "write");
        assert_eq!(invitation_permission("admin"), "admin");
    }
}
