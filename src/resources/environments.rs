//! `github_repository_environment`: deployment environments and their
//! protection rules.

use super::{required, vanished};
use crate::errors::{ProviderError, ProviderResult};
use crate::ids::{build_two_part_id, parse_two_part_id};
use crate::provider::{Owner, Resource};
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use crate::services::{EnvironmentRequest, ReviewerRequest};
use crate::types::{BranchPolicy, Environment};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const ENVIRONMENT_ID: &str = "repository:environment";
const MAX_REVIEWERS: usize = 6;
const MAX_WAIT_MINUTES: i64 = 43_200;

/// Required reviewers block: user and team ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentReviewersModel {
    /// User IDs.
    pub users: Vec<u64>,
    /// Team IDs.
    pub teams: Vec<u64>,
}

/// Deployment branch policy block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentBranchPolicyModel {
    /// Only protected branches may deploy.
    pub protected_branches: bool,
    /// Only branches matching custom policies may deploy.
    pub custom_branch_policies: bool,
}

/// State of `github_repository_environment`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Environment name.
    pub environment: Option<String>,
    /// Minutes to wait before deploying.
    pub wait_timer: Option<u64>,
    /// Administrators may bypass the protection rules.
    pub can_admins_bypass: Option<bool>,
    /// The deployer may not approve their own deployment.
    pub prevent_self_review: Option<bool>,
    /// Required reviewers.
    pub reviewers: Option<EnvironmentReviewersModel>,
    /// Branches allowed to deploy.
    pub deployment_branch_policy: Option<DeploymentBranchPolicyModel>,
}

impl EnvironmentModel {
    fn request(&self) -> ProviderResult<EnvironmentRequest> {
        let reviewers = self.reviewers.clone().unwrap_or_default();
        if reviewers.users.len() + reviewers.teams.len() > MAX_REVIEWERS {
            return Err(ProviderError::Configuration(format!(
                "an environment accepts at most {} reviewers",
                MAX_REVIEWERS
            )));
        }

        let deployment_branch_policy = match &self.deployment_branch_policy {
            Some(p) if p.protected_branches == p.custom_branch_policies => {
                return Err(ProviderError::Configuration(
                    "exactly one of protected_branches and custom_branch_policies must be true"
                        .to_string(),
                ));
            }
            Some(p) => Some(BranchPolicy {
                protected_branches: p.protected_branches,
                custom_branch_policies: p.custom_branch_policies,
            }),
            None => None,
        };

        let reviewers = reviewers
            .users
            .iter()
            .map(|id| ReviewerRequest {
                reviewer_type: "User".to_string(),
                id: *id,
            })
            .chain(reviewers.teams.iter().map(|id| ReviewerRequest {
                reviewer_type: "Team".to_string(),
                id: *id,
            }))
            .collect();

        Ok(EnvironmentRequest {
            wait_timer: self.wait_timer,
            can_admins_bypass: self.can_admins_bypass.unwrap_or(true),
            prevent_self_review: self.prevent_self_review.unwrap_or(false),
            reviewers,
            deployment_branch_policy,
        })
    }

    fn refresh(id: &str, repo: &str, env: Environment) -> Self {
        let mut model = EnvironmentModel {
            id: Some(id.to_string()),
            repository: Some(repo.to_string()),
            environment: Some(env.name),
            can_admins_bypass: Some(env.can_admins_bypass),
            prevent_self_review: Some(false),
            deployment_branch_policy: env.deployment_branch_policy.map(|p| {
                DeploymentBranchPolicyModel {
                    protected_branches: p.protected_branches,
                    custom_branch_policies: p.custom_branch_policies,
                }
            }),
            ..Default::default()
        };

        for rule in env.protection_rules {
            match rule.rule_type.as_str() {
                "wait_timer" => model.wait_timer = rule.wait_timer.filter(|t| *t > 0),
                "required_reviewers" => {
                    let mut reviewers = EnvironmentReviewersModel::default();
                    for r in rule.reviewers {
                        let Some(reviewer) = r.reviewer else { continue };
                        match r.reviewer_type.as_str() {
                            "User" => reviewers.users.push(reviewer.id),
                            "Team" => reviewers.teams.push(reviewer.id),
                            other => tracing::debug!(reviewer_type = %other, "Skipping reviewer"),
                        }
                    }
                    model.prevent_self_review = Some(rule.prevent_self_review.unwrap_or(false));
                    model.reviewers = Some(reviewers);
                }
                _ => {}
            }
        }
        model
    }
}

/// `github_repository_environment`.
pub struct EnvironmentResource;

impl EnvironmentResource {
    async fn apply(
        &self,
        owner: &Owner,
        plan: EnvironmentModel,
    ) -> ProviderResult<EnvironmentModel> {
        let repo = required(&plan.repository, "repository")?;
        let name = required(&plan.environment, "environment")?;

        owner
            .client()
            .environments()
            .create_or_update(owner.name()?, repo, name, &plan.request()?)
            .await?;

        let id = build_two_part_id(repo, name);
        let mut state = plan.clone();
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }
}

#[async_trait]
impl Resource for EnvironmentResource {
    type Model = EnvironmentModel;
    const TYPE_NAME: &'static str = "github_repository_environment";

    fn schema(&self) -> Schema {
        Schema::resource("A deployment environment.")
            .with_attribute("repository", Attribute::required(AttributeType::String).force_new())
            .with_attribute("environment", Attribute::required(AttributeType::String).force_new())
            .with_attribute(
                "wait_timer",
                Attribute::optional(AttributeType::Int)
                    .validator(Validator::IntBetween(0, MAX_WAIT_MINUTES))
                    .description("Minutes to wait before a deployment proceeds."),
            )
            .with_attribute(
                "can_admins_bypass",
                Attribute::optional(AttributeType::Bool).default_value(json!(true)),
            )
            .with_attribute(
                "prevent_self_review",
                Attribute::optional(AttributeType::Bool).default_value(json!(false)),
            )
            .with_attribute(
                "reviewers",
                Attribute::optional(AttributeType::object([
                    ("users", Attribute::optional(AttributeType::int_set())),
                    ("teams", Attribute::optional(AttributeType::int_set())),
                ])),
            )
            .with_attribute(
                "deployment_branch_policy",
                Attribute::optional(AttributeType::object([
                    ("protected_branches", Attribute::required(AttributeType::Bool)),
                    ("custom_branch_policies", Attribute::required(AttributeType::Bool)),
                ])),
            )
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: EnvironmentModel,
    ) -> ProviderResult<EnvironmentModel> {
        self.apply(owner, plan).await
    }

    async fn read(
        &self,
        owner: &Owner,
        state: EnvironmentModel,
    ) -> ProviderResult<Option<EnvironmentModel>> {
        let id = required(&state.id, "id")?;
        let (repo, name) = parse_two_part_id(id, ENVIRONMENT_ID)?;

        let env = owner
            .client()
            .environments()
            .get(owner.name()?, repo, name)
            .await?;

        Ok(env.map(|e| {
            let mut model = EnvironmentModel::refresh(id, repo, e);
            // An unset block reads back as an empty reviewer list.
            if state.reviewers.is_none()
                && model
                    .reviewers
                    .as_ref()
                    .map_or(false, |r| r.users.is_empty() && r.teams.is_empty())
            {
                model.reviewers = None;
            }
            model
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        _prior: EnvironmentModel,
        plan: EnvironmentModel,
    ) -> ProviderResult<EnvironmentModel> {
        self.apply(owner, plan).await
    }

    async fn delete(&self, owner: &Owner, state: EnvironmentModel) -> ProviderResult<()> {
        let id = required(&state.id, "id")?;
        let (repo, name) = parse_two_part_id(id, ENVIRONMENT_ID)?;
        owner
            .client()
            .environments()
            .delete(owner.name()?, repo, name)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnvironmentReviewer, ProtectionRule, ReviewerRef};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_splits_reviewers() {
        let model = EnvironmentModel {
            reviewers: Some(EnvironmentReviewersModel {
                users: vec![1],
                teams: vec![2],
            }),
            ..Default::default()
        };
        let request = model.request().unwrap();
        assert_eq!(request.reviewers[0].reviewer_type, "User");
        assert_eq!(request.reviewers[1].reviewer_type, "Team");
        assert!(request.can_admins_bypass);
        assert!(request.deployment_branch_policy.is_none());
    }

    #[test]
    fn test_request_rejects_ambiguous_branch_policy() {
        let model = EnvironmentModel {
            deployment_branch_policy: Some(DeploymentBranchPolicyModel {
                protected_branches: true,
                custom_branch_policies: true,
            }),
            ..Default::default()
        };
        assert!(model.request().is_err());
    }

    #[test]
    fn test_request_rejects_too_many_reviewers() {
        let model = EnvironmentModel {
            reviewers: Some(EnvironmentReviewersModel {
                users: (1..=7).collect(),
                teams: vec![],
            }),
            ..Default::default()
        };
        assert!(model.request().is_err());
    }

    #[test]
    fn test_refresh_reads_protection_rules() {
        let env = Environment {
            id: 1,
            name: "production".into(),
            can_admins_bypass: false,
            protection_rules: vec![
                ProtectionRule {
                    rule_type: "wait_timer".into(),
                    wait_timer: Some(30),
                    ..Default::default()
                },
                ProtectionRule {
                    rule_type: "required_reviewers".into(),
                    prevent_self_review: Some(true),
                    reviewers: vec![EnvironmentReviewer {
                        reviewer_type: "Team".into(),
                        reviewer: Some(ReviewerRef { id: 9 }),
                    }],
                    ..Default::default()
                },
            ],
            deployment_branch_policy: None,
        };
        let model = EnvironmentModel::refresh("api:production", "api", env);
        assert_eq!(model.wait_timer, Some(30));
        assert_eq!(model.prevent_self_review, Some(true));
        assert_eq!(model.reviewers.unwrap().teams, vec![9]);
        assert_eq!(model.can_admins_bypass, Some(false));
    }
}
