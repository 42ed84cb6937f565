//! Team resources. Teams exist only in organizations and are addressed by
//! numeric id.

use super::{required, vanished};
use crate::errors::{ProviderError, ProviderResult};
use crate::ids::{build_two_part_id, parse_two_part_id, parse_u64};
use crate::provider::{Owner, Resource};
use crate::reconcile::{reconcile, KeyMatch};
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use crate::services::TeamRequest;
use crate::types::Team;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const ROLES: [&str; 2] = ["member", "maintainer"];

/// Resolves a team reference (numeric id or slug) to the team id.
pub(crate) async fn resolve_team_id(
    owner: &Owner,
    type_name: &'static str,
    reference: &str,
) -> ProviderResult<u64> {
    if let Ok(id) = reference.parse::<u64>() {
        return Ok(id);
    }
    let org = owner.require_organization(type_name)?;
    owner
        .client()
        .organizations()
        .get_team_by_slug(org, reference)
        .await?
        .map(|t| t.id)
        .ok_or_else(|| {
            ProviderError::Conflict(format!("team {:?} does not exist in {}", reference, org))
        })
}

/// State of `github_team`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamModel {
    /// Team ID.
    pub id: Option<String>,
    /// Name.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Privacy (secret, closed).
    pub privacy: Option<String>,
    /// Parent team ID or slug.
    pub parent_team_id: Option<String>,
    /// Keep the creating user as maintainer.
    pub create_default_maintainer: Option<bool>,
    /// Team slug.
    pub slug: Option<String>,
    /// GraphQL node ID.
    pub node_id: Option<String>,
}

impl TeamModel {
    fn request(&self, parent_team_id: Option<u64>) -> ProviderResult<TeamRequest> {
        Ok(TeamRequest {
            name: required(&self.name, "name")?.to_string(),
            description: self.description.clone(),
            privacy: self.privacy.clone(),
            parent_team_id,
        })
    }

    fn refresh(mut self, team: Team) -> Self {
        self.id = Some(team.id.to_string());
        self.name = Some(team.name);
        self.description = team.description.filter(|d| !d.is_empty());
        self.privacy = team.privacy;
        self.parent_team_id = team.parent.map(|p| match self.parent_team_id.take() {
            // Keep a configured slug when it still names the parent.
            Some(configured) if configured.eq_ignore_ascii_case(&p.slug) => configured,
            _ => p.id.to_string(),
        });
        self.slug = Some(team.slug);
        self.node_id = Some(team.node_id);
        self.create_default_maintainer = self.create_default_maintainer.or(Some(false));
        self
    }
}

/// `github_team`.
pub struct TeamResource;

impl TeamResource {
    async fn parent_id(&self, owner: &Owner, model: &TeamModel) -> ProviderResult<Option<u64>> {
        match model.parent_team_id.as_deref().filter(|p| !p.is_empty()) {
            Some(reference) => Ok(Some(resolve_team_id(owner, Self::TYPE_NAME, reference).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Resource for TeamResource {
    type Model = TeamModel;
    const TYPE_NAME: &'static str = "github_team";

    fn schema(&self) -> Schema {
        Schema::resource("A team in the owner organization.")
            .with_attribute("name", Attribute::required(AttributeType::String))
            .with_attribute("description", Attribute::optional(AttributeType::String))
            .with_attribute(
                "privacy",
                Attribute::optional(AttributeType::String)
                    .default_value(json!("secret"))
                    .validator(Validator::OneOf(vec!["secret", "closed"])),
            )
            .with_attribute(
                "parent_team_id",
                Attribute::optional(AttributeType::String).description("Parent team id or slug."),
            )
            .with_attribute(
                "create_default_maintainer",
                Attribute::optional(AttributeType::Bool)
                    .default_value(json!(false))
                    .description("Keep the token's user as maintainer after creation."),
            )
            .with_attribute("slug", Attribute::computed(AttributeType::String))
            .with_attribute(
                "node_id",
                Attribute::computed(AttributeType::String).use_state_for_unknown(),
            )
    }

    async fn create(&self, owner: &Owner, plan: TeamModel) -> ProviderResult<TeamModel> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        let org_id = owner.org_id(Self::TYPE_NAME)?;
        let parent = self.parent_id(owner, &plan).await?;
        let client = owner.client();

        let team = client
            .organizations()
            .create_team(org, &plan.request(parent)?)
            .await?;
        tracing::info!(team = %team.slug, id = team.id, "Created team");

        if plan.create_default_maintainer != Some(true) {
            // GitHub makes the creating user a maintainer.
            let me = client.users().get_authenticated().await?;
            match client
                .organizations()
                .remove_team_membership(org_id, team.id, &me.login)
                .await
            {
                Err(e) if e.is_not_found() => {}
                other => other?,
            }
        }

        Ok(plan.refresh(team))
    }

    async fn read(&self, owner: &Owner, state: TeamModel) -> ProviderResult<Option<TeamModel>> {
        let org_id = owner.org_id(Self::TYPE_NAME)?;
        let id = required(&state.id, "id")?;
        let team_id = parse_u64(id, id, "numeric team id")?;

        Ok(owner
            .client()
            .organizations()
            .get_team(org_id, team_id)
            .await?
            .map(|team| state.refresh(team)))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: TeamModel,
        plan: TeamModel,
    ) -> ProviderResult<TeamModel> {
        let org_id = owner.org_id(Self::TYPE_NAME)?;
        let id = required(&prior.id, "id")?;
        let team_id = parse_u64(id, id, "numeric team id")?;
        let parent = self.parent_id(owner, &plan).await?;

        let team = owner
            .client()
            .organizations()
            .update_team(org_id, team_id, &plan.request(parent)?)
            .await?;
        Ok(plan.refresh(team))
    }

    async fn delete(&self, owner: &Owner, state: TeamModel) -> ProviderResult<()> {
        let org_id = owner.org_id(Self::TYPE_NAME)?;
        let id = required(&state.id, "id")?;
        let team_id = parse_u64(id, id, "numeric team id")?;
        owner.client().organizations().delete_team(org_id, team_id).await?;
        Ok(())
    }

    async fn import(&self, owner: &Owner, id: &str) -> ProviderResult<TeamModel> {
        let team_id = resolve_team_id(owner, Self::TYPE_NAME, id).await?;
        Ok(TeamModel {
            id: Some(team_id.to_string()),
            create_default_maintainer: Some(false),
            ..Default::default()
        })
    }
}

/// State of `github_team_membership`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamMembershipModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Team ID or slug.
    pub team_id: Option<String>,
    /// GitHub login.
    pub username: Option<String>,
    /// Role (member, maintainer).
    pub role: Option<String>,
}

/// `github_team_membership`.
pub struct TeamMembershipResource;

const MEMBERSHIP_ID: &str = "teamId:username";

#[async_trait]
impl Resource for TeamMembershipResource {
    type Model = TeamMembershipModel;
    const TYPE_NAME: &'static str = "github_team_membership";

    fn schema(&self) -> Schema {
        Schema::resource("A user's membership in a team.")
            .with_attribute("team_id", Attribute::required(AttributeType::String).force_new())
            .with_attribute("username", Attribute::required(AttributeType::String).force_new())
            .with_attribute(
                "role",
                Attribute::optional(AttributeType::String)
                    .default_value(json!("member"))
                    .validator(Validator::OneOf(ROLES.to_vec())),
            )
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: TeamMembershipModel,
    ) -> ProviderResult<TeamMembershipModel> {
        let org_id = owner.org_id(Self::TYPE_NAME)?;
        let reference = required(&plan.team_id, "team_id")?;
        let team_id = resolve_team_id(owner, Self::TYPE_NAME, reference).await?;
        let username = required(&plan.username, "username")?;
        let role = plan.role.as_deref().unwrap_or("member");

        let membership = owner
            .client()
            .organizations()
            .add_team_membership(org_id, team_id, username, role)
            .await?;

        Ok(TeamMembershipModel {
            id: Some(build_two_part_id(&team_id.to_string(), username)),
            team_id: plan.team_id.clone(),
            username: Some(username.to_string()),
            role: Some(membership.role),
        })
    }

    async fn read(
        &self,
        owner: &Owner,
        state: TeamMembershipModel,
    ) -> ProviderResult<Option<TeamMembershipModel>> {
        let org_id = owner.org_id(Self::TYPE_NAME)?;
        let id = required(&state.id, "id")?;
        let (team, username) = parse_two_part_id(id, MEMBERSHIP_ID)?;
        let team_id = parse_u64(team, id, MEMBERSHIP_ID)?;

        let membership = owner
            .client()
            .organizations()
            .get_team_membership(org_id, team_id, username)
            .await?;

        Ok(membership.map(|m| TeamMembershipModel {
            id: Some(id.to_string()),
            team_id: state.team_id.clone().or_else(|| Some(team.to_string())),
            username: Some(username.to_string()),
            role: Some(m.role),
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: TeamMembershipModel,
        plan: TeamMembershipModel,
    ) -> ProviderResult<TeamMembershipModel> {
        let mut plan = plan;
        plan.id = prior.id;
        let id = required(&plan.id, "id")?.to_string();
        let (team, username) = parse_two_part_id(&id, MEMBERSHIP_ID)?;
        let team_id = parse_u64(team, &id, MEMBERSHIP_ID)?;
        let role = plan.role.clone().unwrap_or_else(|| "member".to_string());

        owner
            .client()
            .organizations()
            .add_team_membership(owner.org_id(Self::TYPE_NAME)?, team_id, username, &role)
            .await?;
        self.read(owner, plan)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn delete(&self, owner: &Owner, state: TeamMembershipModel) -> ProviderResult<()> {
        let id = required(&state.id, "id")?;
        let (team, username) = parse_two_part_id(id, MEMBERSHIP_ID)?;
        let team_id = parse_u64(team, id, MEMBERSHIP_ID)?;
        owner
            .client()
            .organizations()
            .remove_team_membership(owner.org_id(Self::TYPE_NAME)?, team_id, username)
            .await?;
        Ok(())
    }
}

/// A member entry of `github_team_members`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamMemberModel {
    /// GitHub login.
    pub username: String,
    /// Role (member, maintainer).
    pub role: String,
}

/// State of `github_team_members`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamMembersModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Team ID or slug.
    pub team_id: Option<String>,
    /// Every member of the team.
    pub members: Option<Vec<TeamMemberModel>>,
}

/// `github_team_members`: owns the complete member list of a team.
pub struct TeamMembersResource;

impl TeamMembersResource {
    async fn current_members(
        &self,
        owner: &Owner,
        team_id: u64,
    ) -> ProviderResult<Vec<TeamMemberModel>> {
        let org_id = owner.org_id(Self::TYPE_NAME)?;
        let orgs = owner.client().organizations();
        let mut members = Vec::new();
        for role in ROLES {
            let users = orgs.list_team_members(org_id, team_id, Some(role)).await?;
            members.extend(users.into_iter().map(|u| TeamMemberModel {
                username: u.login,
                role: role.to_string(),
            }));
        }
        members.sort();
        Ok(members)
    }

    async fn apply(
        &self,
        owner: &Owner,
        team_id: u64,
        desired: Vec<TeamMemberModel>,
    ) -> ProviderResult<()> {
        let org_id = owner.org_id(Self::TYPE_NAME)?;
        let orgs = owner.client().organizations();
        let desired = desired
            .into_iter()
            .map(|mut m| {
                if m.role.is_empty() {
                    m.role = "member".to_string();
                }
                m
            })
            .collect();

        let result = reconcile(
            desired,
            self.current_members(owner, team_id).await?,
            KeyMatch::CaseInsensitive,
            |d| d.username.clone(),
            |a| a.username.clone(),
            |a, d| a.role == d.role,
        );

        for member in result.remove {
            orgs.remove_team_membership(org_id, team_id, &member.username).await?;
        }
        for member in result
            .update
            .into_iter()
            .map(|(_, target)| target)
            .chain(result.add)
        {
            orgs.add_team_membership(org_id, team_id, &member.username, &member.role)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Resource for TeamMembersResource {
    type Model = TeamMembersModel;
    const TYPE_NAME: &'static str = "github_team_members";

    fn schema(&self) -> Schema {
        Schema::resource("The complete member list of a team.")
            .with_attribute("team_id", Attribute::required(AttributeType::String).force_new())
            .with_attribute(
                "members",
                Attribute::required(AttributeType::Set(Box::new(AttributeType::object([
                    ("username", Attribute::required(AttributeType::String)),
                    (
                        "role",
                        Attribute::optional(AttributeType::String)
                            .default_value(json!("member"))
                            .validator(Validator::OneOf(ROLES.to_vec())),
                    ),
                ])))),
            )
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: TeamMembersModel,
    ) -> ProviderResult<TeamMembersModel> {
        let reference = required(&plan.team_id, "team_id")?;
        let team_id = resolve_team_id(owner, Self::TYPE_NAME, reference).await?;
        self.apply(owner, team_id, plan.members.clone().unwrap_or_default())
            .await?;

        let mut state = plan;
        state.id = Some(team_id.to_string());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &team_id.to_string()))
    }

    async fn read(
        &self,
        owner: &Owner,
        state: TeamMembersModel,
    ) -> ProviderResult<Option<TeamMembersModel>> {
        let id = required(&state.id, "id")?;
        let team_id = parse_u64(id, id, "numeric team id")?;
        let org_id = owner.org_id(Self::TYPE_NAME)?;
        if owner
            .client()
            .organizations()
            .get_team(org_id, team_id)
            .await?
            .is_none()
        {
            return Ok(None);
        }

        let configured = state.members.clone().unwrap_or_default();
        let mut members = self.current_members(owner, team_id).await?;
        for member in &mut members {
            if let Some(c) = configured
                .iter()
                .find(|c| c.username.eq_ignore_ascii_case(&member.username))
            {
                member.username = c.username.clone();
            }
        }
        members.sort();

        Ok(Some(TeamMembersModel {
            id: Some(id.to_string()),
            team_id: state.team_id.clone().or_else(|| Some(id.to_string())),
            members: Some(members),
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: TeamMembersModel,
        plan: TeamMembersModel,
    ) -> ProviderResult<TeamMembersModel> {
        let mut plan = plan;
        plan.id = prior.id;
        let id = required(&plan.id, "id")?.to_string();
        let team_id = parse_u64(&id, &id, "numeric team id")?;
        self.apply(owner, team_id, plan.members.clone().unwrap_or_default())
            .await?;
        self.read(owner, plan)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn delete(&self, owner: &Owner, state: TeamMembersModel) -> ProviderResult<()> {
        let id = required(&state.id, "id")?;
        let team_id = parse_u64(id, id, "numeric team id")?;
        let org_id = owner.org_id(Self::TYPE_NAME)?;
        let orgs = owner.client().organizations();

        for member in state.members.unwrap_or_default() {
            match orgs.remove_team_membership(org_id, team_id, &member.username).await {
                Err(e) if e.is_not_found() => {}
                other => other?,
            }
        }
        Ok(())
    }
}

/// State of `github_team_repository`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamRepositoryModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Team ID or slug.
    pub team_id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Permission or custom role name.
    pub permission: Option<String>,
}

/// `github_team_repository`.
pub struct TeamRepositoryResource;

const TEAM_REPO_ID: &str = "teamId:repository";

#[async_trait]
impl Resource for TeamRepositoryResource {
    type Model = TeamRepositoryModel;
    const TYPE_NAME: &'static str = "github_team_repository";

    fn schema(&self) -> Schema {
        Schema::resource("A team's access to a repository.")
            .with_attribute("team_id", Attribute::required(AttributeType::String).force_new())
            .with_attribute("repository", Attribute::required(AttributeType::String).force_new())
            .with_attribute(
                "permission",
                Attribute::optional(AttributeType::String)
                    .default_value(json!("pull"))
                    .description("pull, triage, push, maintain, admin or a custom role name."),
            )
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: TeamRepositoryModel,
    ) -> ProviderResult<TeamRepositoryModel> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        let org_id = owner.org_id(Self::TYPE_NAME)?;
        let reference = required(&plan.team_id, "team_id")?;
        let team_id = resolve_team_id(owner, Self::TYPE_NAME, reference).await?;
        let repo = required(&plan.repository, "repository")?;
        let permission = plan.permission.as_deref().unwrap_or("pull");

        owner
            .client()
            .organizations()
            .add_team_repo(org_id, team_id, org, repo, permission)
            .await?;

        let id = build_two_part_id(&team_id.to_string(), repo);
        let mut state = plan.clone();
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn read(
        &self,
        owner: &Owner,
        state: TeamRepositoryModel,
    ) -> ProviderResult<Option<TeamRepositoryModel>> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        let org_id = owner.org_id(Self::TYPE_NAME)?;
        let id = required(&state.id, "id")?;
        let (team, repo) = parse_two_part_id(id, TEAM_REPO_ID)?;
        let team_id = parse_u64(team, id, TEAM_REPO_ID)?;

        let repository = owner
            .client()
            .organizations()
            .get_team_repo(org_id, team_id, org, repo)
            .await?;

        Ok(repository.map(|r| TeamRepositoryModel {
            id: Some(id.to_string()),
            team_id: state.team_id.clone().or_else(|| Some(team.to_string())),
            repository: Some(r.name),
            permission: Some(r.permissions.unwrap_or_default().highest().to_string()),
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: TeamRepositoryModel,
        plan: TeamRepositoryModel,
    ) -> ProviderResult<TeamRepositoryModel> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        let org_id = owner.org_id(Self::TYPE_NAME)?;
        let mut plan = plan;
        plan.id = prior.id;
        let id = required(&plan.id, "id")?.to_string();
        let (team, repo) = parse_two_part_id(&id, TEAM_REPO_ID)?;
        let team_id = parse_u64(team, &id, TEAM_REPO_ID)?;
        let permission = plan.permission.clone().unwrap_or_else(|| "pull".to_string());

        owner
            .client()
            .organizations()
            .add_team_repo(org_id, team_id, org, repo, &permission)
            .await?;
        self.read(owner, plan)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn delete(&self, owner: &Owner, state: TeamRepositoryModel) -> ProviderResult<()> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        let org_id = owner.org_id(Self::TYPE_NAME)?;
        let id = required(&state.id, "id")?;
        let (team, repo) = parse_two_part_id(id, TEAM_REPO_ID)?;
        let team_id = parse_u64(team, id, TEAM_REPO_ID)?;
        owner
            .client()
            .organizations()
            .remove_team_repo(org_id, team_id, org, repo)
            .await?;
        Ok(())
    }
}
