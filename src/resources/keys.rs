//! Repository deploy keys and user SSH keys.

use super::{required, vanished};
use crate::errors::ProviderResult;
use crate::ids::{build_two_part_id, parse_two_part_id, parse_u64};
use crate::provider::{Owner, Resource};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::services::CreateKeyRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const DEPLOY_KEY_ID: &str = "repository:keyId";

/// Key type and material, without the trailing comment GitHub strips.
fn key_material(key: &str) -> String {
    key.split_whitespace().take(2).collect::<Vec<_>>().join(" ")
}

/// Keeps the configured key when GitHub only dropped its comment.
fn reconcile_key(configured: Option<&str>, actual: String) -> String {
    match configured {
        Some(c) if key_material(c) == key_material(&actual) => c.to_string(),
        _ => actual,
    }
}

/// State of `github_repository_deploy_key`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployKeyModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Title.
    pub title: Option<String>,
    /// Public key.
    pub key: Option<String>,
    /// Deny write access.
    pub read_only: Option<bool>,
}

/// `github_repository_deploy_key`. Keys are immutable, every change
/// replaces them.
pub struct DeployKeyResource;

#[async_trait]
impl Resource for DeployKeyResource {
    type Model = DeployKeyModel;
    const TYPE_NAME: &'static str = "github_repository_deploy_key";

    fn schema(&self) -> Schema {
        Schema::resource("A repository deploy key.")
            .with_attribute("repository", Attribute::required(AttributeType::String).force_new())
            .with_attribute("title", Attribute::required(AttributeType::String).force_new())
            .with_attribute("key", Attribute::required(AttributeType::String).force_new())
            .with_attribute(
                "read_only",
                Attribute::optional(AttributeType::Bool)
                    .default_value(json!(true))
                    .force_new(),
            )
    }

    async fn create(&self, owner: &Owner, plan: DeployKeyModel) -> ProviderResult<DeployKeyModel> {
        let repo = required(&plan.repository, "repository")?;
        let request = CreateKeyRequest {
            title: required(&plan.title, "title")?.to_string(),
            key: required(&plan.key, "key")?.to_string(),
            read_only: Some(plan.read_only.unwrap_or(true)),
        };
        let key = owner
            .client()
            .repositories()
            .create_deploy_key(owner.name()?, repo, &request)
            .await?;

        let id = build_two_part_id(repo, &key.id.to_string());
        let mut state = plan.clone();
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn read(
        &self,
        owner: &Owner,
        state: DeployKeyModel,
    ) -> ProviderResult<Option<DeployKeyModel>> {
        let id = required(&state.id, "id")?;
        let (repo, key_id) = parse_two_part_id(id, DEPLOY_KEY_ID)?;
        let key_id = parse_u64(key_id, id, DEPLOY_KEY_ID)?;

        let key = owner
            .client()
            .repositories()
            .get_deploy_key(owner.name()?, repo, key_id)
            .await?;

        Ok(key.map(|k| DeployKeyModel {
            id: Some(id.to_string()),
            repository: Some(repo.to_string()),
            title: Some(k.title),
            key: Some(reconcile_key(state.key.as_deref(), k.key)),
            read_only: Some(k.read_only),
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: DeployKeyModel,
        plan: DeployKeyModel,
    ) -> ProviderResult<DeployKeyModel> {
        let mut plan = plan;
        plan.id = prior.id;
        let id = plan.id.clone().unwrap_or_default();
        self.read(owner, plan)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn delete(&self, owner: &Owner, state: DeployKeyModel) -> ProviderResult<()> {
        let id = required(&state.id, "id")?;
        let (repo, key_id) = parse_two_part_id(id, DEPLOY_KEY_ID)?;
        let key_id = parse_u64(key_id, id, DEPLOY_KEY_ID)?;
        owner
            .client()
            .repositories()
            .delete_deploy_key(owner.name()?, repo, key_id)
            .await?;
        Ok(())
    }
}

/// State of `github_user_ssh_key`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSshKeyModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Title.
    pub title: Option<String>,
    /// Public SSH key.
    pub key: Option<String>,
    /// API URL.
    pub url: Option<String>,
}

/// `github_user_ssh_key`: a key of the authenticated user.
pub struct UserSshKeyResource;

#[async_trait]
impl Resource for UserSshKeyResource {
    type Model = UserSshKeyModel;
    const TYPE_NAME: &'static str = "github_user_ssh_key";

    fn schema(&self) -> Schema {
        Schema::resource("An SSH key of the authenticated user.")
            .with_attribute("title", Attribute::required(AttributeType::String).force_new())
            .with_attribute("key", Attribute::required(AttributeType::String).force_new())
            .with_attribute("url", Attribute::computed(AttributeType::String))
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: UserSshKeyModel,
    ) -> ProviderResult<UserSshKeyModel> {
        let request = CreateKeyRequest {
            title: required(&plan.title, "title")?.to_string(),
            key: required(&plan.key, "key")?.to_string(),
            read_only: None,
        };
        let key = owner.client().users().create_ssh_key(&request).await?;

        let id = key.id.to_string();
        let mut state = plan;
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn read(
        &self,
        owner: &Owner,
        state: UserSshKeyModel,
    ) -> ProviderResult<Option<UserSshKeyModel>> {
        let id = required(&state.id, "id")?;
        let key_id = parse_u64(id, id, "numeric key id")?;

        let key = owner.client().users().get_ssh_key(key_id).await?;

        Ok(key.map(|k| UserSshKeyModel {
            id: Some(id.to_string()),
            title: Some(k.title),
            key: Some(reconcile_key(state.key.as_deref(), k.key)),
            url: Some(k.url),
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: UserSshKeyModel,
        plan: UserSshKeyModel,
    ) -> ProviderResult<UserSshKeyModel> {
        let mut plan = plan;
        plan.id = prior.id;
        let id = plan.id.clone().unwrap_or_default();
        self.read(owner, plan)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn delete(&self, owner: &Owner, state: UserSshKeyModel) -> ProviderResult<()> {
        let id = required(&state.id, "id")?;
        let key_id = parse_u64(id, id, "numeric key id")?;
        owner.client().users().delete_ssh_key(key_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("ssh-ed25519 AAAAC3Nza alice@laptop", "ssh-ed25519 AAAAC3Nza")]
    #[test_case("ssh-rsa AAAAB3Nza", "ssh-rsa AAAAB3Nza")]
    #[test_case("  ssh-rsa   AAAAB3Nza  \n", "ssh-rsa AAAAB3Nza")]
    fn test_key_material(input: &str, expected: &str) {
        assert_eq!(key_material(input), expected);
    }

    #[test]
    fn test_reconcile_key_ignores_comment() {
        let configured = "ssh-ed25519 AAAAC3Nza alice@laptop";
        assert_eq!(
            reconcile_key(Some(configured), "ssh-ed25519 AAAAC3Nza".into()),
            configured
        );
        assert_eq!(
            reconcile_key(Some(configured), "ssh-ed25519 BBBB".into()),
            "ssh-ed25519 BBBB"
        );
        assert_eq!(reconcile_key(None, "ssh-rsa X".into()), "ssh-rsa X");
    }
}
