//! GitHub Actions configuration variables.

use super::secrets::selected_repositories;
use super::{required, vanished};
use crate::errors::ProviderResult;
use crate::ids::{build_two_part_id, parse_two_part_id};
use crate::provider::{Owner, Resource};
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use crate::services::{ActionsScope, VariableRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const VARIABLE_ID: &str = "repository:variable_name";

fn variable_name_attribute() -> Attribute {
    Attribute::required(AttributeType::String)
        .force_new()
        .validator(Validator::Regex {
            pattern: r"^[a-zA-Z_][a-zA-Z0-9_]*$",
            message: "may only contain alphanumeric characters or underscores and must not start with a number",
        })
        .validator(Validator::NotPrefix("GITHUB_"))
}

/// State of `github_actions_variable`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Variable name.
    pub variable_name: Option<String>,
    /// Variable value.
    pub value: Option<String>,
    /// Creation timestamp.
    pub created_at: Option<String>,
    /// Last update timestamp.
    pub updated_at: Option<String>,
}

/// `github_actions_variable`.
pub struct ActionsVariableResource;

#[async_trait]
impl Resource for ActionsVariableResource {
    type Model = VariableModel;
    const TYPE_NAME: &'static str = "github_actions_variable";

    fn schema(&self) -> Schema {
        Schema::resource("A GitHub Actions variable of a repository.")
            .with_attribute("repository", Attribute::required(AttributeType::String).force_new())
            .with_attribute("variable_name", variable_name_attribute())
            .with_attribute("value", Attribute::required(AttributeType::String))
            .with_attribute(
                "created_at",
                Attribute::computed(AttributeType::String).use_state_for_unknown(),
            )
            .with_attribute("updated_at", Attribute::computed(AttributeType::String))
    }

    async fn create(&self, owner: &Owner, plan: VariableModel) -> ProviderResult<VariableModel> {
        let repo = required(&plan.repository, "repository")?;
        let name = required(&plan.variable_name, "variable_name")?;
        let request = VariableRequest {
            name: name.to_string(),
            value: plan.value.clone().unwrap_or_default(),
            visibility: None,
            selected_repository_ids: None,
        };
        owner
            .client()
            .actions()
            .create_variable(ActionsScope::Repository(owner.name()?, repo), &request)
            .await?;

        let id = build_two_part_id(repo, name);
        let mut state = plan.clone();
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn read(
        &self,
        owner: &Owner,
        state: VariableModel,
    ) -> ProviderResult<Option<VariableModel>> {
        let id = required(&state.id, "id")?;
        let (repo, name) = parse_two_part_id(id, VARIABLE_ID)?;

        let variable = owner
            .client()
            .actions()
            .get_variable(ActionsScope::Repository(owner.name()?, repo), name)
            .await?;

        Ok(variable.map(|v| VariableModel {
            id: Some(id.to_string()),
            repository: Some(repo.to_string()),
            variable_name: Some(v.name),
            value: Some(v.value),
            created_at: Some(v.created_at),
            updated_at: Some(v.updated_at),
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: VariableModel,
        plan: VariableModel,
    ) -> ProviderResult<VariableModel> {
        let mut plan = plan;
        plan.id = prior.id;
        let id = required(&plan.id, "id")?.to_string();
        let (repo, name) = parse_two_part_id(&id, VARIABLE_ID)?;

        let request = VariableRequest {
            name: name.to_string(),
            value: plan.value.clone().unwrap_or_default(),
            visibility: None,
            selected_repository_ids: None,
        };
        owner
            .client()
            .actions()
            .update_variable(ActionsScope::Repository(owner.name()?, repo), name, &request)
            .await?;
        self.read(owner, plan)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn delete(&self, owner: &Owner, state: VariableModel) -> ProviderResult<()> {
        let id = required(&state.id, "id")?;
        let (repo, name) = parse_two_part_id(id, VARIABLE_ID)?;
        owner
            .client()
            .actions()
            .delete_variable(ActionsScope::Repository(owner.name()?, repo), name)
            .await?;
        Ok(())
    }
}

/// State of `github_actions_organization_variable`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationVariableModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Variable name.
    pub variable_name: Option<String>,
    /// Variable value.
    pub value: Option<String>,
    /// Visibility.
    pub visibility: Option<String>,
    /// Repository IDs when visibility is `selected`.
    pub selected_repository_ids: Option<Vec<u64>>,
    /// Creation timestamp.
    pub created_at: Option<String>,
    /// Last update timestamp.
    pub updated_at: Option<String>,
}

impl OrganizationVariableModel {
    fn request(&self, name: &str) -> ProviderResult<VariableRequest> {
        Ok(VariableRequest {
            name: name.to_string(),
            value: self.value.clone().unwrap_or_default(),
            visibility: self.visibility.clone(),
            selected_repository_ids: selected_repositories(
                self.visibility.as_deref(),
                &self.selected_repository_ids,
            )?,
        })
    }
}

/// `github_actions_organization_variable`.
pub struct ActionsOrganizationVariableResource;

#[async_trait]
impl Resource for ActionsOrganizationVariableResource {
    type Model = OrganizationVariableModel;
    const TYPE_NAME: &'static str = "github_actions_organization_variable";

    fn schema(&self) -> Schema {
        Schema::resource("A GitHub Actions variable shared across an organization.")
            .with_attribute("variable_name", variable_name_attribute())
            .with_attribute("value", Attribute::required(AttributeType::String))
            .with_attribute(
                "visibility",
                Attribute::required(AttributeType::String)
                    .validator(Validator::OneOf(vec!["all", "private", "selected"])),
            )
            .with_attribute(
                "selected_repository_ids",
                Attribute::optional(AttributeType::int_set()),
            )
            .with_attribute(
                "created_at",
                Attribute::computed(AttributeType::String).use_state_for_unknown(),
            )
            .with_attribute("updated_at", Attribute::computed(AttributeType::String))
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: OrganizationVariableModel,
    ) -> ProviderResult<OrganizationVariableModel> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        let name = required(&plan.variable_name, "variable_name")?;
        owner
            .client()
            .actions()
            .create_variable(ActionsScope::Organization(org), &plan.request(name)?)
            .await?;

        let id = name.to_string();
        let mut state = plan.clone();
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn read(
        &self,
        owner: &Owner,
        state: OrganizationVariableModel,
    ) -> ProviderResult<Option<OrganizationVariableModel>> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        let id = required(&state.id, "id")?;
        let actions = owner.client().actions();

        let variable = match actions.get_variable(ActionsScope::Organization(org), id).await? {
            Some(v) => v,
            None => return Ok(None),
        };
        let selected_repository_ids = match variable.visibility.as_deref() {
            Some("selected") => Some(actions.list_variable_repositories(org, id).await?),
            _ => None,
        };

        Ok(Some(OrganizationVariableModel {
            id: Some(id.to_string()),
            variable_name: Some(variable.name),
            value: Some(variable.value),
            visibility: variable.visibility,
            selected_repository_ids,
            created_at: Some(variable.created_at),
            updated_at: Some(variable.updated_at),
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: OrganizationVariableModel,
        plan: OrganizationVariableModel,
    ) -> ProviderResult<OrganizationVariableModel> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        let mut plan = plan;
        plan.id = prior.id;
        let id = required(&plan.id, "id")?.to_string();

        owner
            .client()
            .actions()
            .update_variable(ActionsScope::Organization(org), &id, &plan.request(&id)?)
            .await?;
        self.read(owner, plan)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn delete(&self, owner: &Owner, state: OrganizationVariableModel) -> ProviderResult<()> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        let id = required(&state.id, "id")?;
        owner
            .client()
            .actions()
            .delete_variable(ActionsScope::Organization(org), id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_org_variable_request() {
        let model = OrganizationVariableModel {
            value: Some("eu-west-1".into()),
            visibility: Some("selected".into()),
            selected_repository_ids: Some(vec![10, 20]),
            ..Default::default()
        };
        let body = serde_json::to_value(model.request("REGION").unwrap()).unwrap();
        assert_eq!(body["name"], json!("REGION"));
        assert_eq!(body["selected_repository_ids"], json!([10, 20]));
    }

    #[test]
    fn test_variable_name_validation() {
        let schema = ActionsVariableResource.schema();
        let ok =
            schema.validate(&json!({"repository": "api", "variable_name": "REGION", "value": "x"}));
        assert!(ok.iter().all(|d| !d.is_error()));

        let bad = schema.validate(&json!({
            "repository": "api",
            "variable_name": "1REGION",
            "value": "x"
        }));
        assert!(bad.iter().any(|d| d.is_error()));
    }
}
