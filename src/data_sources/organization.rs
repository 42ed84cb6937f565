//! `github_organization`.

use super::not_found;
use crate::errors::ProviderResult;
use crate::provider::{DataSource, Owner};
use crate::schema::{Attribute, AttributeType, Schema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Output of `github_organization`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationModel {
    /// Organization ID.
    pub id: Option<String>,
    /// Name.
    pub name: Option<String>,
    /// Login.
    pub login: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// GraphQL node ID.
    pub node_id: Option<String>,
    /// Billing plan name.
    pub plan: Option<String>,
    /// Base permission of members.
    pub default_repository_permission: Option<String>,
    /// Two-factor authentication required.
    pub two_factor_requirement_enabled: Option<bool>,
    /// Member logins.
    pub members: Option<Vec<String>>,
    /// Repository names.
    pub repositories: Option<Vec<String>>,
}

/// `github_organization`: an organization with its members and
/// repositories.
pub struct OrganizationDataSource;

#[async_trait]
impl DataSource for OrganizationDataSource {
    type Model = OrganizationModel;
    const TYPE_NAME: &'static str = "github_organization";

    fn schema(&self) -> Schema {
        Schema::data_source("An organization.")
            .with_attribute("name", Attribute::required(AttributeType::String))
            .with_attribute("login", Attribute::computed(AttributeType::String))
            .with_attribute("description", Attribute::computed(AttributeType::String))
            .with_attribute("node_id", Attribute::computed(AttributeType::String))
            .with_attribute("plan", Attribute::computed(AttributeType::String))
            .with_attribute(
                "default_repository_permission",
                Attribute::computed(AttributeType::String),
            )
            .with_attribute(
                "two_factor_requirement_enabled",
                Attribute::computed(AttributeType::Bool),
            )
            .with_attribute("members", Attribute::computed(AttributeType::string_list()))
            .with_attribute("repositories", Attribute::computed(AttributeType::string_list()))
    }

    async fn read(
        &self,
        owner: &Owner,
        config: OrganizationModel,
    ) -> ProviderResult<OrganizationModel> {
        let name = config.name.clone().unwrap_or_default();
        let client = owner.client();

        let org = client
            .organizations()
            .get_optional(&name)
            .await?
            .ok_or_else(|| not_found(Self::TYPE_NAME, &name))?;
        let organizations = client.organizations();
        let repos = client.repositories();
        let (members, repositories) = futures::try_join!(
            organizations.list_members(&org.login),
            repos.list_for_org(&org.login),
        )?;
        let members = members.into_iter().map(|u| u.login).collect();
        let repositories = repositories.into_iter().map(|r| r.full_name).collect();

        Ok(OrganizationModel {
            id: Some(org.id.to_string()),
            name: Some(name),
            login: Some(org.login),
            description: org.description,
            node_id: Some(org.node_id),
            plan: org.plan.map(|p| p.name),
            default_repository_permission: org.default_repository_permission,
            two_factor_requirement_enabled: org.two_factor_requirement_enabled,
            members: Some(members),
            repositories: Some(repositories),
        })
    }
}
