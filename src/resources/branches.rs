//! Branch resources: `github_branch`, `github_branch_default` and
//! `github_branch_protection_v3`.

use super::{required, vanished};
use crate::errors::{ProviderError, ProviderResult};
use crate::ids::{build_two_part_id, parse_two_part_id, ID_SEPARATOR};
use crate::provider::{Owner, Resource};
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use crate::services::{
    ProtectionRequest, RestrictionsRequest, ReviewsRequest, StatusChecksRequest, UpdateRepoRequest,
};
use crate::types::{BranchProtection, EnabledSetting};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const BRANCH_ID: &str = "repository:branch";

/// State of `github_branch`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Branch name.
    pub branch: Option<String>,
    /// Branch to fork from.
    pub source_branch: Option<String>,
    /// Commit to fork from; overrides `source_branch`.
    pub source_sha: Option<String>,
    /// Fully qualified ref.
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    /// Head commit SHA.
    pub sha: Option<String>,
}

/// `github_branch`.
pub struct BranchResource;

#[async_trait]
impl Resource for BranchResource {
    type Model = BranchModel;
    const TYPE_NAME: &'static str = "github_branch";

    fn schema(&self) -> Schema {
        Schema::resource("A branch in a repository.")
            .with_attribute("repository", Attribute::required(AttributeType::String).force_new())
            .with_attribute(
                "branch",
                Attribute::required(AttributeType::String)
                    .description("Renaming renames the branch in place."),
            )
            .with_attribute(
                "source_branch",
                Attribute::optional(AttributeType::String)
                    .default_value(json!("main"))
                    .force_new(),
            )
            .with_attribute(
                "source_sha",
                Attribute::optional_computed(AttributeType::String).force_new(),
            )
            .with_attribute("ref", Attribute::computed(AttributeType::String))
            .with_attribute("sha", Attribute::computed(AttributeType::String))
    }

    async fn create(&self, owner: &Owner, plan: BranchModel) -> ProviderResult<BranchModel> {
        let owner_name = owner.name()?;
        let repo = required(&plan.repository, "repository")?;
        let branch = required(&plan.branch, "branch")?;
        let git = owner.client().git();

        let sha = match plan.source_sha.as_deref().filter(|s| !s.is_empty()) {
            Some(sha) => sha.to_string(),
            None => {
                let source = plan.source_branch.as_deref().unwrap_or("main");
                git.get_ref(owner_name, repo, &format!("heads/{}", source))
                    .await?
                    .ok_or_else(|| {
                        ProviderError::Conflict(format!(
                            "source branch {:?} not found in {}",
                            source, repo
                        ))
                    })?
                    .object
                    .sha
            }
        };

        git.create_ref(owner_name, repo, &format!("refs/heads/{}", branch), &sha)
            .await?;

        let id = build_two_part_id(repo, branch);
        let mut state = plan.clone();
        state.id = Some(id.clone());
        state.source_sha = Some(sha);
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn read(&self, owner: &Owner, state: BranchModel) -> ProviderResult<Option<BranchModel>> {
        let id = required(&state.id, "id")?;
        let (repo, branch) = parse_two_part_id(id, BRANCH_ID)?;

        let git_ref = owner
            .client()
            .git()
            .get_ref(owner.name()?, repo, &format!("heads/{}", branch))
            .await?;

        Ok(git_ref.map(|r| BranchModel {
            id: Some(id.to_string()),
            repository: Some(repo.to_string()),
            branch: Some(branch.to_string()),
            source_branch: state.source_branch.clone().or_else(|| Some("main".to_string())),
            source_sha: state.source_sha.clone(),
            git_ref: Some(r.ref_name),
            sha: Some(r.object.sha),
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: BranchModel,
        plan: BranchModel,
    ) -> ProviderResult<BranchModel> {
        let repo = required(&plan.repository, "repository")?;
        let old = required(&prior.branch, "branch")?;
        let new = required(&plan.branch, "branch")?;

        if old != new {
            owner
                .client()
                .git()
                .rename_branch(owner.name()?, repo, old, new)
                .await?;
            tracing::info!(repository = %repo, from = %old, to = %new, "Renamed branch");
        }

        let id = build_two_part_id(repo, new);
        let mut state = plan.clone();
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn delete(&self, owner: &Owner, state: BranchModel) -> ProviderResult<()> {
        let id = required(&state.id, "id")?;
        let (repo, branch) = parse_two_part_id(id, BRANCH_ID)?;
        owner
            .client()
            .git()
            .delete_ref(owner.name()?, repo, &format!("heads/{}", branch))
            .await?;
        Ok(())
    }

    /// Accepts `repository:branch` or `repository:branch:source_branch`.
    async fn import(&self, _owner: &Owner, id: &str) -> ProviderResult<BranchModel> {
        let (id, source_branch) = match id.rsplit_once(ID_SEPARATOR) {
            Some((head, source)) if head.contains(ID_SEPARATOR) => (head, source.to_string()),
            _ => (id, "main".to_string()),
        };
        parse_two_part_id(id, BRANCH_ID)?;
        Ok(BranchModel {
            id: Some(id.to_string()),
            source_branch: Some(source_branch),
            ..Default::default()
        })
    }
}

/// State of `github_branch_default`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchDefaultModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Branch name.
    pub branch: Option<String>,
    /// Rename the current default branch instead of switching.
    pub rename: Option<bool>,
}

/// `github_branch_default`. Destroying it only forgets it: a repository
/// always has a default branch.
pub struct BranchDefaultResource;

impl BranchDefaultResource {
    async fn apply(
        &self,
        owner: &Owner,
        plan: BranchDefaultModel,
    ) -> ProviderResult<BranchDefaultModel> {
        let owner_name = owner.name()?;
        let repo = required(&plan.repository, "repository")?;
        let branch = required(&plan.branch, "branch")?;
        let client = owner.client();

        if plan.rename == Some(true) {
            let current = client.repositories().get(owner_name, repo).await?.default_branch;
            if current != branch {
                client.git().rename_branch(owner_name, repo, &current, branch).await?;
            }
        } else {
            let request = UpdateRepoRequest {
                default_branch: Some(branch.to_string()),
                ..Default::default()
            };
            client.repositories().update(owner_name, repo, &request).await?;
        }

        let repo = repo.to_string();
        let mut state = plan;
        state.id = Some(repo.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &repo))
    }
}

#[async_trait]
impl Resource for BranchDefaultResource {
    type Model = BranchDefaultModel;
    const TYPE_NAME: &'static str = "github_branch_default";

    fn schema(&self) -> Schema {
        Schema::resource("The default branch of a repository.")
            .with_attribute("repository", Attribute::required(AttributeType::String).force_new())
            .with_attribute("branch", Attribute::required(AttributeType::String))
            .with_attribute(
                "rename",
                Attribute::optional(AttributeType::Bool)
                    .default_value(json!(false))
                    .description("Rename the current default branch instead of switching to an existing one."),
            )
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: BranchDefaultModel,
    ) -> ProviderResult<BranchDefaultModel> {
        self.apply(owner, plan).await
    }

    async fn read(
        &self,
        owner: &Owner,
        state: BranchDefaultModel,
    ) -> ProviderResult<Option<BranchDefaultModel>> {
        let id = required(&state.id, "id")?;
        let repo = owner
            .client()
            .repositories()
            .get_optional(owner.name()?, id)
            .await?;

        Ok(repo.map(|r| BranchDefaultModel {
            id: Some(id.to_string()),
            repository: Some(r.name),
            branch: Some(r.default_branch),
            rename: state.rename.or(Some(false)),
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        _prior: BranchDefaultModel,
        plan: BranchDefaultModel,
    ) -> ProviderResult<BranchDefaultModel> {
        self.apply(owner, plan).await
    }

    async fn delete(&self, _owner: &Owner, state: BranchDefaultModel) -> ProviderResult<()> {
        tracing::info!(
            repository = state.repository.as_deref().unwrap_or_default(),
            "Default branch left unchanged, removing from state only"
        );
        Ok(())
    }
}

/// Required status checks block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredStatusChecksModel {
    /// Require branches to be up to date before merging.
    pub strict: bool,
    /// Required status check contexts.
    pub contexts: Vec<String>,
}

/// Required pull request reviews block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredReviewsModel {
    /// Dismiss approvals when new commits are pushed.
    pub dismiss_stale_reviews: bool,
    /// Require a code owner review.
    pub require_code_owner_reviews: bool,
    /// Approvals required, 0 to 6.
    pub required_approving_review_count: u64,
    /// The last push must be approved by someone else.
    pub require_last_push_approval: bool,
}

/// Push restrictions block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestrictionsModel {
    /// User logins allowed to push.
    pub users: Vec<String>,
    /// Team slugs allowed to push.
    pub teams: Vec<String>,
    /// App slugs allowed to push.
    pub apps: Vec<String>,
}

/// State of `github_branch_protection_v3`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchProtectionModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Branch name.
    pub branch: Option<String>,
    /// Apply the rules to administrators too.
    pub enforce_admins: Option<bool>,
    /// Require signed commits.
    pub require_signed_commits: Option<bool>,
    /// Require resolved conversations before merging.
    pub require_conversation_resolution: Option<bool>,
    /// Disallow merge commits.
    pub required_linear_history: Option<bool>,
    /// Status check requirements.
    pub required_status_checks: Option<RequiredStatusChecksModel>,
    /// Review requirements.
    pub required_pull_request_reviews: Option<RequiredReviewsModel>,
    /// Push restrictions.
    pub restrictions: Option<RestrictionsModel>,
}

impl BranchProtectionModel {
    fn request(&self) -> ProtectionRequest {
        ProtectionRequest {
            required_status_checks: self.required_status_checks.as_ref().map(|c| {
                StatusChecksRequest {
                    strict: c.strict,
                    contexts: c.contexts.clone(),
                }
            }),
            enforce_admins: self.enforce_admins.unwrap_or(false),
            required_pull_request_reviews: self.required_pull_request_reviews.as_ref().map(|r| {
                ReviewsRequest {
                    dismiss_stale_reviews: r.dismiss_stale_reviews,
                    require_code_owner_reviews: r.require_code_owner_reviews,
                    required_approving_review_count: r.required_approving_review_count,
                    require_last_push_approval: r.require_last_push_approval,
                }
            }),
            restrictions: self.restrictions.as_ref().map(|r| RestrictionsRequest {
                users: r.users.clone(),
                teams: r.teams.clone(),
                apps: r.apps.clone(),
            }),
            required_linear_history: self.required_linear_history,
            required_conversation_resolution: self.require_conversation_resolution,
            ..Default::default()
        }
    }

    fn refresh(mut self, protection: BranchProtection) -> Self {
        let enabled =
            |s: &Option<EnabledSetting>| Some(s.as_ref().map_or(false, |s| s.enabled));

        self.enforce_admins = enabled(&protection.enforce_admins);
        self.require_signed_commits = enabled(&protection.required_signatures);
        self.require_conversation_resolution =
            enabled(&protection.required_conversation_resolution);
        self.required_linear_history = enabled(&protection.required_linear_history);
        self.required_status_checks = protection
            .required_status_checks
            .map(|c| RequiredStatusChecksModel {
                strict: c.strict,
                contexts: c.contexts,
            });
        self.required_pull_request_reviews = protection
            .required_pull_request_reviews
            .map(|r| RequiredReviewsModel {
                dismiss_stale_reviews: r.dismiss_stale_reviews,
                require_code_owner_reviews: r.require_code_owner_reviews,
                required_approving_review_count: r.required_approving_review_count,
                require_last_push_approval: r.require_last_push_approval,
            });
        self.restrictions = protection.restrictions.map(|r| RestrictionsModel {
            users: r.users.into_iter().map(|u| u.login).collect(),
            teams: r.teams.into_iter().map(|t| t.slug).collect(),
            apps: r.apps.into_iter().map(|a| a.slug).collect(),
        });
        self
    }
}

/// `github_branch_protection_v3`: REST branch protection.
pub struct BranchProtectionResource;

impl BranchProtectionResource {
    async fn apply(
        &self,
        owner: &Owner,
        plan: BranchProtectionModel,
    ) -> ProviderResult<BranchProtectionModel> {
        let owner_name = owner.name()?;
        let repo = required(&plan.repository, "repository")?;
        let branch = required(&plan.branch, "branch")?;
        let git = owner.client().git();

        git.update_protection(owner_name, repo, branch, &plan.request())
            .await?;
        git.set_required_signatures(
            owner_name,
            repo,
            branch,
            plan.require_signed_commits.unwrap_or(false),
        )
        .await?;

        let id = build_two_part_id(repo, branch);
        let mut state = plan.clone();
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }
}

#[async_trait]
impl Resource for BranchProtectionResource {
    type Model = BranchProtectionModel;
    const TYPE_NAME: &'static str = "github_branch_protection_v3";

    fn schema(&self) -> Schema {
        let flag = || Attribute::optional(AttributeType::Bool).default_value(json!(false));

        Schema::resource("Branch protection configured through the REST API.")
            .with_attribute("repository", Attribute::required(AttributeType::String).force_new())
            .with_attribute("branch", Attribute::required(AttributeType::String).force_new())
            .with_attribute("enforce_admins", flag())
            .with_attribute("require_signed_commits", flag())
            .with_attribute("require_conversation_resolution", flag())
            .with_attribute("required_linear_history", flag())
            .with_attribute(
                "required_status_checks",
                Attribute::optional(AttributeType::object([
                    (
                        "strict",
                        Attribute::optional(AttributeType::Bool).default_value(json!(false)),
                    ),
                    ("contexts", Attribute::optional(AttributeType::string_set())),
                ])),
            )
            .with_attribute(
                "required_pull_request_reviews",
                Attribute::optional(AttributeType::object([
                    (
                        "dismiss_stale_reviews",
                        Attribute::optional(AttributeType::Bool).default_value(json!(false)),
                    ),
                    (
                        "require_code_owner_reviews",
                        Attribute::optional(AttributeType::Bool).default_value(json!(false)),
                    ),
                    (
                        "required_approving_review_count",
                        Attribute::optional(AttributeType::Int)
                            .default_value(json!(1))
                            .validator(Validator::IntBetween(0, 6)),
                    ),
                    (
                        "require_last_push_approval",
                        Attribute::optional(AttributeType::Bool).default_value(json!(false)),
                    ),
                ])),
            )
            .with_attribute(
                "restrictions",
                Attribute::optional(AttributeType::object([
                    ("users", Attribute::optional(AttributeType::string_set())),
                    ("teams", Attribute::optional(AttributeType::string_set())),
                    ("apps", Attribute::optional(AttributeType::string_set())),
                ])),
            )
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: BranchProtectionModel,
    ) -> ProviderResult<BranchProtectionModel> {
        self.apply(owner, plan).await
    }

    async fn read(
        &self,
        owner: &Owner,
        state: BranchProtectionModel,
    ) -> ProviderResult<Option<BranchProtectionModel>> {
        let id = required(&state.id, "id")?.to_string();
        let (repo, branch) = parse_two_part_id(&id, BRANCH_ID)?;

        let protection = owner
            .client()
            .git()
            .get_protection(owner.name()?, repo, branch)
            .await?;

        Ok(protection.map(|p| {
            let mut model = state.refresh(p);
            model.repository = Some(repo.to_string());
            model.branch = Some(branch.to_string());
            model
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        _prior: BranchProtectionModel,
        plan: BranchProtectionModel,
    ) -> ProviderResult<BranchProtectionModel> {
        self.apply(owner, plan).await
    }

    async fn delete(&self, owner: &Owner, state: BranchProtectionModel) -> ProviderResult<()> {
        let id = required(&state.id, "id")?;
        let (repo, branch) = parse_two_part_id(id, BRANCH_ID)?;
        owner
            .client()
            .git()
            .delete_protection(owner.name()?, repo, branch)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequiredStatusChecks;

    #[test]
    fn test_protection_request_keeps_null_blocks() {
        let model = BranchProtectionModel {
            enforce_admins: Some(true),
            ..Default::default()
        };
        let body = serde_json::to_value(model.request()).unwrap();
        assert_eq!(body["enforce_admins"], json!(true));
        assert!(body["required_status_checks"].is_null());
        assert!(body.as_object().unwrap().contains_key("restrictions"));
    }

    #[test]
    fn test_refresh_from_api() {
        let protection = BranchProtection {
            required_status_checks: Some(RequiredStatusChecks {
                strict: true,
                contexts: vec!["ci".into()],
            }),
            required_signatures: Some(EnabledSetting { enabled: true }),
            ..Default::default()
        };
        let model = BranchProtectionModel::default().refresh(protection);
        assert_eq!(model.require_signed_commits, Some(true));
        assert_eq!(model.enforce_admins, Some(false));
        assert_eq!(model.required_status_checks.unwrap().contexts, vec!["ci".to_string()]);
        assert!(model.restrictions.is_none());
    }

    #[tokio::test]
    async fn test_import_with_source_branch() {
        let owner = crate::resources::offline_owner();

        let model = BranchResource.import(&owner, "repo:feature:develop").await.unwrap();
        assert_eq!(model.id.as_deref(), Some("repo:feature"));
        assert_eq!(model.source_branch.as_deref(), Some("develop"));

        let model = BranchResource.import(&owner, "repo:feature").await.unwrap();
        assert_eq!(model.source_branch.as_deref(), Some("main"));
    }
}
