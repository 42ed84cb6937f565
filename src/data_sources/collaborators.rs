//! `github_collaborators`.

use crate::errors::{ProviderError, ProviderResult};
use crate::provider::{DataSource, Owner};
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// A collaborator entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorEntry {
    /// User ID.
    pub id: u64,
    /// Login.
    pub login: String,
    /// Permission level.
    pub permission: String,
}

/// Output of `github_collaborators`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorsListModel {
    /// Data source ID.
    pub id: Option<String>,
    /// Repository owner.
    pub owner: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Affiliation filter (all, direct, outside).
    pub affiliation: Option<String>,
    /// Collaborators found.
    pub collaborator: Option<Vec<CollaboratorEntry>>,
}

/// `github_collaborators`.
pub struct CollaboratorsDataSource;

#[async_trait]
impl DataSource for CollaboratorsDataSource {
    type Model = CollaboratorsListModel;
    const TYPE_NAME: &'static str = "github_collaborators";

    fn schema(&self) -> Schema {
        Schema::data_source("Collaborators of a repository.")
            .with_attribute("owner", Attribute::required(AttributeType::String))
            .with_attribute("repository", Attribute::required(AttributeType::String))
            .with_attribute(
                "affiliation",
                Attribute::optional(AttributeType::String)
                    .default_value(json!("all"))
                    .validator(Validator::OneOf(vec!["all", "direct", "outside"])),
            )
            .with_attribute(
                "collaborator",
                Attribute::computed(AttributeType::List(Box::new(AttributeType::object([
                    ("id", Attribute::computed(AttributeType::Int)),
                    ("login", Attribute::computed(AttributeType::String)),
                    ("permission", Attribute::computed(AttributeType::String)),
                ])))),
            )
    }

    async fn read(
        &self,
        owner: &Owner,
        config: CollaboratorsListModel,
    ) -> ProviderResult<CollaboratorsListModel> {
        let (repo_owner, repo) = match (config.owner.as_deref(), config.repository.as_deref()) {
            (Some(o), Some(r)) if !o.is_empty() && !r.is_empty() => (o, r),
            _ => {
                return Err(ProviderError::Configuration(
                    "owner and repository must be set".to_string(),
                ))
            }
        };
        let affiliation = config.affiliation.as_deref().unwrap_or("all");

        let collaborators = owner
            .client()
            .collaborators()
            .list(repo_owner, repo, affiliation)
            .await?;

        Ok(CollaboratorsListModel {
            id: Some(format!("{}/{}", repo_owner, repo)),
            owner: Some(repo_owner.to_string()),
            repository: Some(repo.to_string()),
            affiliation: Some(affiliation.to_string()),
            collaborator: Some(
                collaborators
                    .into_iter()
                    .map(|c| CollaboratorEntry {
                        id: c.id,
                        permission: c.permission(),
                        login: c.login,
                    })
                    .collect(),
            ),
        })
    }
}
