//! `github_actions_public_key`.

use crate::errors::ProviderResult;
use crate::provider::{DataSource, Owner};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::services::{ActionsScope, SecretStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Output of `github_actions_public_key`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionsPublicKeyModel {
    /// Data source ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Key ID sent along with sealed secrets.
    pub key_id: Option<String>,
    /// Base64 encoded Curve25519 public key.
    pub key: Option<String>,
}

/// `github_actions_public_key`: the key secrets of a repository are sealed
/// to.
pub struct ActionsPublicKeyDataSource;

#[async_trait]
impl DataSource for ActionsPublicKeyDataSource {
    type Model = ActionsPublicKeyModel;
    const TYPE_NAME: &'static str = "github_actions_public_key";

    fn schema(&self) -> Schema {
        Schema::data_source("The Actions secrets public key of a repository.")
            .with_attribute("repository", Attribute::required(AttributeType::String))
            .with_attribute("key_id", Attribute::computed(AttributeType::String))
            .with_attribute("key", Attribute::computed(AttributeType::String))
    }

    async fn read(
        &self,
        owner: &Owner,
        config: ActionsPublicKeyModel,
    ) -> ProviderResult<ActionsPublicKeyModel> {
        let repo = config.repository.clone().unwrap_or_default();
        let key = owner
            .client()
            .actions()
            .get_public_key(ActionsScope::Repository(owner.name()?, &repo), SecretStore::Actions)
            .await?;

        Ok(ActionsPublicKeyModel {
            id: Some(key.key_id.clone()),
            repository: Some(repo),
            key_id: Some(key.key_id),
            key: Some(key.key),
        })
    }
}
