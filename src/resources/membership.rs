//! `github_membership`: a user's membership in the owner organization.

use super::{required, vanished};
use crate::errors::ProviderResult;
use crate::ids::{build_two_part_id, parse_two_part_id};
use crate::provider::{Owner, Resource};
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const ID_FORMAT: &str = "organization:username";

/// State of `github_membership`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MembershipModel {
    /// Resource ID.
    pub id: Option<String>,
    /// GitHub login.
    pub username: Option<String>,
    /// Role (member, admin).
    pub role: Option<String>,
    /// Downgrade to member on destroy instead of removing.
    pub downgrade_on_destroy: Option<bool>,
    /// State (active, pending).
    pub state: Option<String>,
}

/// `github_membership`.
pub struct MembershipResource;

#[async_trait]
impl Resource for MembershipResource {
    type Model = MembershipModel;
    const TYPE_NAME: &'static str = "github_membership";

    fn schema(&self) -> Schema {
        Schema::resource("A user's membership in the organization.")
            .with_attribute("username", Attribute::required(AttributeType::String).force_new())
            .with_attribute(
                "role",
                Attribute::optional(AttributeType::String)
                    .default_value(json!("member"))
                    .validator(Validator::OneOf(vec!["member", "admin"])),
            )
            .with_attribute(
                "downgrade_on_destroy",
                Attribute::optional(AttributeType::Bool)
                    .default_value(json!(false))
                    .description("Downgrade admins to members on destroy instead of removing them."),
            )
            .with_attribute("state", Attribute::computed(AttributeType::String))
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: MembershipModel,
    ) -> ProviderResult<MembershipModel> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        let username = required(&plan.username, "username")?;
        let role = plan.role.as_deref().unwrap_or("member");

        owner
            .client()
            .organizations()
            .set_membership(org, username, role)
            .await?;

        let id = build_two_part_id(org, username);
        let mut state = plan.clone();
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn read(
        &self,
        owner: &Owner,
        state: MembershipModel,
    ) -> ProviderResult<Option<MembershipModel>> {
        let id = required(&state.id, "id")?;
        let (org, username) = parse_two_part_id(id, ID_FORMAT)?;

        let membership = owner
            .client()
            .organizations()
            .get_membership(org, username)
            .await?;

        Ok(membership.map(|m| MembershipModel {
            id: Some(id.to_string()),
            username: Some(username.to_string()),
            role: Some(m.role),
            downgrade_on_destroy: state.downgrade_on_destroy.or(Some(false)),
            state: Some(m.state),
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: MembershipModel,
        plan: MembershipModel,
    ) -> ProviderResult<MembershipModel> {
        let mut plan = plan;
        plan.id = prior.id;
        let id = required(&plan.id, "id")?.to_string();
        let (org, username) = parse_two_part_id(&id, ID_FORMAT)?;
        let role = plan.role.clone().unwrap_or_else(|| "member".to_string());

        owner
            .client()
            .organizations()
            .set_membership(org, username, &role)
            .await?;
        self.read(owner, plan)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn delete(&self, owner: &Owner, state: MembershipModel) -> ProviderResult<()> {
        let id = required(&state.id, "id")?;
        let (org, username) = parse_two_part_id(id, ID_FORMAT)?;
        let orgs = owner.client().organizations();

        if state.downgrade_on_destroy == Some(true) {
            if state.role.as_deref() == Some("admin") {
                tracing::info!(org = %org, user = %username, "Downgrading admin to member");
                orgs.set_membership(org, username, "member").await?;
            }
            return Ok(());
        }

        orgs.remove_membership(org, username).await?;
        Ok(())
    }
}
