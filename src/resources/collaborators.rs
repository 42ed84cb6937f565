//! `github_repository_collaborator` and `github_repository_collaborators`.

use super::{required, vanished};
use crate::errors::{ProviderError, ProviderResult};
use crate::ids::{build_two_part_id, parse_two_part_id};
use crate::provider::{Owner, Resource};
use crate::reconcile::{reconcile, KeyMatch};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::types::{normalize_permission, Team};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

const ID_FORMAT: &str = "repository:username";

/// State of `github_repository_collaborator`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// GitHub login.
    pub username: Option<String>,
    /// Permission level.
    pub permission: Option<String>,
    /// Ignore permission drift.
    pub permission_diff_suppression: Option<bool>,
    /// Pending invitation, if the user has not accepted yet.
    pub invitation_id: Option<String>,
}

/// `github_repository_collaborator`: one user's access to a repository,
/// either as a collaborator or through a pending invitation.
pub struct CollaboratorResource;

/// Where a user's access currently stands.
enum Access {
    Invited { invitation_id: u64, permission: String },
    Collaborator { permission: String },
}

async fn find_access(owner: &Owner, repo: &str, username: &str) -> ProviderResult<Option<Access>> {
    let owner_name = owner.name()?;
    let service = owner.client().collaborators();

    let invitations = service.list_invitations(owner_name, repo).await?;
    let invitation = invitations.into_iter().find(|inv| {
        inv.invitee
            .as_ref()
            .map_or(false, |u| u.login.eq_ignore_ascii_case(username))
    });
    if let Some(inv) = invitation {
        return Ok(Some(Access::Invited {
            invitation_id: inv.id,
            permission: normalize_permission(&inv.permissions),
        }));
    }

    let collaborators = service.list(owner_name, repo, "direct").await?;
    Ok(collaborators
        .into_iter()
        .find(|c| c.login.eq_ignore_ascii_case(username))
        .map(|c| Access::Collaborator {
            permission: c.permission(),
        }))
}

#[async_trait]
impl Resource for CollaboratorResource {
    type Model = CollaboratorModel;
    const TYPE_NAME: &'static str = "github_repository_collaborator";

    fn schema(&self) -> Schema {
        Schema::resource("A collaborator on a repository.")
            .with_attribute("repository", Attribute::required(AttributeType::String).force_new())
            .with_attribute("username", Attribute::required(AttributeType::String).force_new())
            .with_attribute(
                "permission",
                Attribute::optional(AttributeType::String)
                    .default_value(json!("push"))
                    .description("pull, triage, push, maintain, admin or a custom role name.")
                    .force_new(),
            )
            .with_attribute(
                "permission_diff_suppression",
                Attribute::optional(AttributeType::Bool).default_value(json!(false)),
            )
            .with_attribute(
                "invitation_id",
                Attribute::computed(AttributeType::String).use_state_for_unknown(),
            )
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: CollaboratorModel,
    ) -> ProviderResult<CollaboratorModel> {
        let repo = required(&plan.repository, "repository")?;
        let username = required(&plan.username, "username")?;
        let permission = plan.permission.as_deref().unwrap_or("push");

        let invitation = owner
            .client()
            .collaborators()
            .add(owner.name()?, repo, username, permission)
            .await?;
        if let Some(ref inv) = invitation {
            tracing::info!(
                repository = %repo,
                user = %username,
                invitation = inv.id,
                "Invited collaborator"
            );
        }

        let id = build_two_part_id(repo, username);
        let mut state = plan.clone();
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn read(
        &self,
        owner: &Owner,
        state: CollaboratorModel,
    ) -> ProviderResult<Option<CollaboratorModel>> {
        let id = required(&state.id, "id")?;
        let (repo, username) = parse_two_part_id(id, ID_FORMAT)?;

        let (permission, invitation_id) = match find_access(owner, repo, username).await? {
            Some(Access::Invited {
                invitation_id,
                permission,
            }) => (permission, Some(invitation_id.to_string())),
            Some(Access::Collaborator { permission }) => (permission, None),
            None => return Ok(None),
        };

        // Org base permissions can report a higher level than the one granted.
        let permission = match (&state.permission, state.permission_diff_suppression) {
            (Some(configured), Some(true)) if configured != &permission => configured.clone(),
            _ => permission,
        };

        Ok(Some(CollaboratorModel {
            id: Some(id.to_string()),
            repository: Some(repo.to_string()),
            username: Some(username.to_string()),
            permission: Some(permission),
            permission_diff_suppression: state.permission_diff_suppression.or(Some(false)),
            invitation_id,
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        _prior: CollaboratorModel,
        plan: CollaboratorModel,
    ) -> ProviderResult<CollaboratorModel> {
        let id = required(&plan.id, "id")?.to_string();
        self.read(owner, plan)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn delete(&self, owner: &Owner, state: CollaboratorModel) -> ProviderResult<()> {
        let id = required(&state.id, "id")?;
        let (repo, username) = parse_two_part_id(id, ID_FORMAT)?;
        let owner_name = owner.name()?;
        let service = owner.client().collaborators();

        match find_access(owner, repo, username).await? {
            Some(Access::Invited { invitation_id, .. }) => {
                service.delete_invitation(owner_name, repo, invitation_id).await?;
            }
            Some(Access::Collaborator { .. }) => {
                service.remove(owner_name, repo, username).await?;
            }
            None => {
                tracing::debug!(repository = %repo, user = %username, "Collaborator already gone")
            }
        }
        Ok(())
    }
}

/// A user entry in `github_repository_collaborators`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAccess {
    /// GitHub login.
    pub username: String,
    /// Permission level.
    pub permission: String,
}

/// A team entry in `github_repository_collaborators`. `team_id` is a slug or
/// a numeric id.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamAccess {
    /// Team ID or slug.
    pub team_id: String,
    /// Team permission on the repository.
    pub permission: String,
}

/// A team excluded from management.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoredTeam {
    /// Team ID or slug left untouched.
    pub team_id: String,
}

/// State of `github_repository_collaborators`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorsModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Direct user collaborators.
    pub user: Option<Vec<UserAccess>>,
    /// Team collaborators.
    pub team: Option<Vec<TeamAccess>>,
    /// Teams whose access is not managed.
    pub ignore_team: Option<Vec<IgnoredTeam>>,
    /// Pending invitation ID by login.
    pub invitation_ids: Option<BTreeMap<String, String>>,
}

/// `github_repository_collaborators`: owns the complete set of users and
/// teams with access to a repository.
pub struct CollaboratorsResource;

#[derive(Debug, Clone)]
struct ActualUser {
    login: String,
    permission: String,
    invitation_id: Option<u64>,
}

fn team_matches(team: &Team, reference: &str) -> bool {
    match reference.parse::<u64>() {
        Ok(id) => team.id == id,
        Err(_) => team.slug.eq_ignore_ascii_case(reference),
    }
}

fn team_permission(team: &Team) -> String {
    match (&team.permission, &team.permissions) {
        (Some(p), _) => normalize_permission(p),
        (None, Some(perms)) => perms.highest().to_string(),
        (None, None) => "pull".to_string(),
    }
}

impl CollaboratorsResource {
    async fn actual_users(&self, owner: &Owner, repo: &str) -> ProviderResult<Vec<ActualUser>> {
        let owner_name = owner.name()?;
        let service = owner.client().collaborators();

        let mut users: Vec<ActualUser> = service
            .list(owner_name, repo, "direct")
            .await?
            .into_iter()
            // The owner of a personal repository is listed as an admin.
            .filter(|c| owner.is_organization() || !c.login.eq_ignore_ascii_case(owner_name))
            .map(|c| ActualUser {
                permission: c.permission(),
                login: c.login,
                invitation_id: None,
            })
            .collect();

        users.extend(
            service
                .list_invitations(owner_name, repo)
                .await?
                .into_iter()
                .filter_map(|inv| {
                    inv.invitee.map(|u| ActualUser {
                        login: u.login,
                        permission: normalize_permission(&inv.permissions),
                        invitation_id: Some(inv.id),
                    })
                }),
        );
        Ok(users)
    }

    async fn actual_teams(
        &self,
        owner: &Owner,
        repo: &str,
        ignored: &[IgnoredTeam],
    ) -> ProviderResult<Vec<Team>> {
        if !owner.is_organization() {
            return Ok(Vec::new());
        }
        let teams = owner
            .client()
            .collaborators()
            .list_teams(owner.name()?, repo)
            .await?;
        Ok(teams
            .into_iter()
            .filter(|t| !ignored.iter().any(|i| team_matches(t, &i.team_id)))
            .collect())
    }

    /// Resolves a configured team reference to its slug.
    async fn team_slug(
        &self,
        owner: &Owner,
        actual: &[Team],
        reference: &str,
    ) -> ProviderResult<String> {
        if let Some(team) = actual.iter().find(|t| team_matches(t, reference)) {
            return Ok(team.slug.clone());
        }
        match reference.parse::<u64>() {
            Ok(team_id) => {
                let org_id = owner.org_id(Self::TYPE_NAME)?;
                let team = owner
                    .client()
                    .organizations()
                    .get_team(org_id, team_id)
                    .await?
                    .ok_or_else(|| {
                        ProviderError::Conflict(format!("team {} does not exist", team_id))
                    })?;
                Ok(team.slug)
            }
            Err(_) => Ok(reference.to_string()),
        }
    }

    async fn apply(&self, owner: &Owner, plan: &CollaboratorsModel) -> ProviderResult<()> {
        let repo = required(&plan.repository, "repository")?;
        let owner_name = owner.name()?;
        let ignored = plan.ignore_team.clone().unwrap_or_default();
        let desired_teams = plan.team.clone().unwrap_or_default();
        if !desired_teams.is_empty() {
            owner.require_organization(Self::TYPE_NAME)?;
        }

        let service = owner.client().collaborators();

        let users = reconcile(
            plan.user.clone().unwrap_or_default(),
            self.actual_users(owner, repo).await?,
            KeyMatch::CaseInsensitive,
            |d| d.username.clone(),
            |a| a.login.clone(),
            |a, d| a.permission == normalize_permission(&d.permission),
        );

        for user in users.remove {
            match user.invitation_id {
                Some(id) => service.delete_invitation(owner_name, repo, id).await?,
                None => service.remove(owner_name, repo, &user.login).await?,
            }
        }
        for (current, target) in users.update {
            match current.invitation_id {
                Some(id) => {
                    service
                        .update_invitation(owner_name, repo, id, &target.permission)
                        .await?;
                }
                None => {
                    service
                        .add(owner_name, repo, &current.login, &target.permission)
                        .await?;
                }
            }
        }
        for target in users.add {
            service
                .add(owner_name, repo, &target.username, &target.permission)
                .await?;
        }

        let actual_teams = self.actual_teams(owner, repo, &ignored).await?;
        let mut resolved = Vec::with_capacity(desired_teams.len());
        for team in desired_teams {
            let slug = self.team_slug(owner, &actual_teams, &team.team_id).await?;
            resolved.push(TeamAccess {
                team_id: slug,
                permission: team.permission,
            });
        }

        let teams = reconcile(
            resolved,
            actual_teams,
            KeyMatch::CaseInsensitive,
            |d| d.team_id.clone(),
            |a| a.slug.clone(),
            |a, d| team_permission(a) == normalize_permission(&d.permission),
        );

        for team in teams.remove {
            service.remove_team(owner_name, &team.slug, owner_name, repo).await?;
        }
        for target in teams
            .update
            .into_iter()
            .map(|(_, target)| target)
            .chain(teams.add)
        {
            service
                .add_team(owner_name, &target.team_id, owner_name, repo, &target.permission)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Resource for CollaboratorsResource {
    type Model = CollaboratorsModel;
    const TYPE_NAME: &'static str = "github_repository_collaborators";

    fn schema(&self) -> Schema {
        let permission = || Attribute::optional(AttributeType::String).default_value(json!("push"));

        Schema::resource("The complete set of collaborators on a repository.")
            .with_attribute("repository", Attribute::required(AttributeType::String).force_new())
            .with_attribute(
                "user",
                Attribute::optional(AttributeType::Set(Box::new(AttributeType::object([
                    ("username", Attribute::required(AttributeType::String)),
                    ("permission", permission()),
                ])))),
            )
            .with_attribute(
                "team",
                Attribute::optional(AttributeType::Set(Box::new(AttributeType::object([
                    (
                        "team_id",
                        Attribute::required(AttributeType::String)
                            .description("Team slug or numeric id."),
                    ),
                    ("permission", permission()),
                ])))),
            )
            .with_attribute(
                "ignore_team",
                Attribute::optional(AttributeType::Set(Box::new(AttributeType::object([(
                    "team_id",
                    Attribute::required(AttributeType::String),
                )])))),
            )
            .with_attribute("invitation_ids", Attribute::computed(AttributeType::string_map()))
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: CollaboratorsModel,
    ) -> ProviderResult<CollaboratorsModel> {
        self.apply(owner, &plan).await?;
        let repo = required(&plan.repository, "repository")?.to_string();
        let mut state = plan;
        state.id = Some(repo.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &repo))
    }

    async fn read(
        &self,
        owner: &Owner,
        state: CollaboratorsModel,
    ) -> ProviderResult<Option<CollaboratorsModel>> {
        let repo = required(&state.id, "id")?;
        if owner
            .client()
            .repositories()
            .get_optional(owner.name()?, repo)
            .await?
            .is_none()
        {
            return Ok(None);
        }

        let ignored = state.ignore_team.clone().unwrap_or_default();
        let actual_users = self.actual_users(owner, repo).await?;
        let actual_teams = self.actual_teams(owner, repo, &ignored).await?;

        let invitation_ids: BTreeMap<String, String> = actual_users
            .iter()
            .filter_map(|u| u.invitation_id.map(|id| (u.login.clone(), id.to_string())))
            .collect();

        // Logins are case-insensitive; keep the configured spelling.
        let configured_users = state.user.clone().unwrap_or_default();
        let mut users: Vec<UserAccess> = actual_users
            .into_iter()
            .map(|u| UserAccess {
                username: configured_users
                    .iter()
                    .find(|c| c.username.eq_ignore_ascii_case(&u.login))
                    .map(|c| c.username.clone())
                    .unwrap_or(u.login),
                permission: u.permission,
            })
            .collect();
        users.sort();

        // Keep team references in the form they were configured.
        let configured = state.team.clone().unwrap_or_default();
        let mut teams: Vec<TeamAccess> = actual_teams
            .iter()
            .map(|t| TeamAccess {
                team_id: configured
                    .iter()
                    .find(|c| team_matches(t, &c.team_id))
                    .map(|c| c.team_id.clone())
                    .unwrap_or_else(|| t.slug.clone()),
                permission: team_permission(t),
            })
            .collect();
        teams.sort();

        Ok(Some(CollaboratorsModel {
            id: Some(repo.to_string()),
            repository: Some(repo.to_string()),
            user: Some(users),
            team: Some(teams),
            ignore_team: state.ignore_team,
            invitation_ids: Some(invitation_ids),
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        _prior: CollaboratorsModel,
        plan: CollaboratorsModel,
    ) -> ProviderResult<CollaboratorsModel> {
        self.create(owner, plan).await
    }

    async fn delete(&self, owner: &Owner, state: CollaboratorsModel) -> ProviderResult<()> {
        let cleared = CollaboratorsModel {
            repository: state.repository.clone().or(state.id.clone()),
            ignore_team: state.ignore_team.clone(),
            ..Default::default()
        };
        self.apply(owner, &cleared).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_matches_by_id_or_slug() {
        let team = Team {
            id: 42,
            slug: "core-devs".into(),
            ..Default::default()
        };
        assert!(team_matches(&team, "42"));
        assert!(team_matches(&team, "Core-Devs"));
        assert!(!team_matches(&team, "43"));
    }

    #[test]
    fn test_team_permission() {
        let team = Team {
            permission: Some("write".into()),
            ..Default::default()
        };
        assert_eq!(team_permission(&team), "push");
    }
}
