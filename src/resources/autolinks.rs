//! `github_repository_autolink_reference`.

use super::{required, vanished};
use crate::errors::{ProviderError, ProviderResult};
use crate::ids::{build_two_part_id, parse_import_id, parse_two_part_id, parse_u64};
use crate::provider::{Owner, Resource};
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use crate::services::CreateAutolinkRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const AUTOLINK_ID: &str = "repository:autolinkId";

/// State of `github_repository_autolink_reference`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutolinkReferenceModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Prefix that triggers the link.
    pub key_prefix: Option<String>,
    /// Target URL containing `<num>`.
    pub target_url_template: Option<String>,
    /// Match alphanumeric references, not only digits.
    pub is_alphanumeric: Option<bool>,
}

/// `github_repository_autolink_reference`. Autolinks cannot be edited, so
/// every attribute forces replacement.
pub struct AutolinkReferenceResource;

#[async_trait]
impl Resource for AutolinkReferenceResource {
    type Model = AutolinkReferenceModel;
    const TYPE_NAME: &'static str = "github_repository_autolink_reference";

    fn schema(&self) -> Schema {
        Schema::resource("An autolink reference of a repository.")
            .with_attribute("repository", Attribute::required(AttributeType::String).force_new())
            .with_attribute("key_prefix", Attribute::required(AttributeType::String).force_new())
            .with_attribute(
                "target_url_template",
                Attribute::required(AttributeType::String)
                    .force_new()
                    .validator(Validator::Regex {
                        pattern: r"^https?://.*<num>",
                        message: "must be an http(s) URL containing <num>",
                    }),
            )
            .with_attribute(
                "is_alphanumeric",
                Attribute::optional(AttributeType::Bool)
                    .default_value(json!(true))
                    .force_new(),
            )
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: AutolinkReferenceModel,
    ) -> ProviderResult<AutolinkReferenceModel> {
        let repo = required(&plan.repository, "repository")?;
        let request = CreateAutolinkRequest {
            key_prefix: required(&plan.key_prefix, "key_prefix")?.to_string(),
            url_template: required(&plan.target_url_template, "target_url_template")?.to_string(),
            is_alphanumeric: plan.is_alphanumeric.unwrap_or(true),
        };
        let autolink = owner
            .client()
            .repositories()
            .create_autolink(owner.name()?, repo, &request)
            .await?;

        let id = build_two_part_id(repo, &autolink.id.to_string());
        let mut state = plan.clone();
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn read(
        &self,
        owner: &Owner,
        state: AutolinkReferenceModel,
    ) -> ProviderResult<Option<AutolinkReferenceModel>> {
        let id = required(&state.id, "id")?;
        let (repo, autolink_id) = parse_two_part_id(id, AUTOLINK_ID)?;
        let autolink_id = parse_u64(autolink_id, id, AUTOLINK_ID)?;

        let autolink = owner
            .client()
            .repositories()
            .get_autolink(owner.name()?, repo, autolink_id)
            .await?;

        Ok(autolink.map(|a| AutolinkReferenceModel {
            id: Some(id.to_string()),
            repository: Some(repo.to_string()),
            key_prefix: Some(a.key_prefix),
            target_url_template: Some(a.url_template),
            is_alphanumeric: Some(a.is_alphanumeric),
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: AutolinkReferenceModel,
        plan: AutolinkReferenceModel,
    ) -> ProviderResult<AutolinkReferenceModel> {
        let mut plan = plan;
        plan.id = prior.id;
        let id = plan.id.clone().unwrap_or_default();
        self.read(owner, plan)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn delete(&self, owner: &Owner, state: AutolinkReferenceModel) -> ProviderResult<()> {
        let id = required(&state.id, "id")?;
        let (repo, autolink_id) = parse_two_part_id(id, AUTOLINK_ID)?;
        let autolink_id = parse_u64(autolink_id, id, AUTOLINK_ID)?;
        owner
            .client()
            .repositories()
            .delete_autolink(owner.name()?, repo, autolink_id)
            .await?;
        Ok(())
    }

    /// Accepts `repository/autolinkId` or `repository/keyPrefix`.
    async fn import(&self, owner: &Owner, id: &str) -> ProviderResult<AutolinkReferenceModel> {
        let (repo, reference) = parse_import_id(id, "repository/autolinkId")?;

        let autolink_id = match reference.parse::<u64>() {
            Ok(autolink_id) => autolink_id,
            Err(_) => owner
                .client()
                .repositories()
                .list_autolinks(owner.name()?, repo)
                .await?
                .into_iter()
                .find(|a| a.key_prefix == reference)
                .map(|a| a.id)
                .ok_or_else(|| ProviderError::ImportNotFound(id.to_string()))?,
        };

        Ok(AutolinkReferenceModel {
            id: Some(build_two_part_id(repo, &autolink_id.to_string())),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_must_contain_num() {
        let schema = AutolinkReferenceResource.schema();
        let base = |target: &str| {
            json!({
                "repository": "api",
                "key_prefix": "TICKET-",
                "target_url_template": target
            })
        };
        assert!(schema
            .validate(&base("https://jira.example.com/browse/TICKET-<num>"))
            .iter()
            .all(|d| !d.is_error()));
        assert!(schema
            .validate(&base("https://jira.example.com/browse/TICKET-"))
            .iter()
            .any(|d| d.is_error()));
    }

    #[tokio::test]
    async fn test_import_numeric_id() {
        let owner = crate::resources::offline_owner();
        let model = AutolinkReferenceResource.import(&owner, "api/42").await.unwrap();
        assert_eq!(model.id.as_deref(), Some("api:42"));
    }
}
