//! `github_repository` and `github_repositories`.

use super::not_found;
use crate::errors::{ProviderError, ProviderResult};
use crate::provider::{DataSource, Owner};
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use crate::services::SearchRepositoriesParams;
use crate::types::Repository;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Output of `github_repository`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryLookupModel {
    /// Data source ID.
    pub id: Option<String>,
    /// Name.
    pub name: Option<String>,
    /// `owner/name`.
    pub full_name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Homepage URL.
    pub homepage_url: Option<String>,
    /// Visibility.
    pub visibility: Option<String>,
    /// Default branch.
    pub default_branch: Option<String>,
    /// Archived flag.
    pub archived: Option<bool>,
    /// Template repository flag.
    pub is_template: Option<bool>,
    /// Issues enabled.
    pub has_issues: Option<bool>,
    /// Wiki enabled.
    pub has_wiki: Option<bool>,
    /// Projects enabled.
    pub has_projects: Option<bool>,
    /// Topics.
    pub topics: Option<Vec<String>>,
    /// Web URL.
    pub html_url: Option<String>,
    /// SSH clone URL.
    pub ssh_clone_url: Option<String>,
    /// HTTPS clone URL.
    pub http_clone_url: Option<String>,
    /// Git protocol clone URL.
    pub git_clone_url: Option<String>,
    /// Subversion URL.
    pub svn_url: Option<String>,
    /// GraphQL node ID.
    pub node_id: Option<String>,
    /// Numeric repository ID.
    pub repo_id: Option<u64>,
}

impl From<Repository> for RepositoryLookupModel {
    fn from(repo: Repository) -> Self {
        let visibility = repo.visibility.clone().unwrap_or_else(|| {
            if repo.private { "private" } else { "public" }.to_string()
        });
        Self {
            id: Some(repo.name.clone()),
            name: Some(repo.name),
            full_name: Some(repo.full_name),
            description: repo.description,
            homepage_url: repo.homepage,
            visibility: Some(visibility),
            default_branch: Some(repo.default_branch),
            archived: Some(repo.archived),
            is_template: Some(repo.is_template),
            has_issues: Some(repo.has_issues),
            has_wiki: Some(repo.has_wiki),
            has_projects: Some(repo.has_projects),
            topics: Some(repo.topics),
            html_url: Some(repo.html_url),
            ssh_clone_url: Some(repo.ssh_url),
            http_clone_url: Some(repo.clone_url),
            git_clone_url: Some(repo.git_url),
            svn_url: Some(repo.svn_url),
            node_id: Some(repo.node_id),
            repo_id: Some(repo.id),
        }
    }
}

/// `github_repository`: looks up one repository by `name` (under the
/// configured owner) or `full_name`.
pub struct RepositoryDataSource;

#[async_trait]
impl DataSource for RepositoryDataSource {
    type Model = RepositoryLookupModel;
    const TYPE_NAME: &'static str = "github_repository";

    fn schema(&self) -> Schema {
        let out = |t| Attribute::computed(t);
        Schema::data_source("A single repository.")
            .with_attribute(
                "name",
                Attribute::optional_computed(AttributeType::String).conflicts_with(&["full_name"]),
            )
            .with_attribute(
                "full_name",
                Attribute::optional_computed(AttributeType::String)
                    .conflicts_with(&["name"])
                    .validator(Validator::Regex {
                        pattern: r"^[^/]+/[^/]+$",
                        message: "must be owner/name",
                    }),
            )
            .with_attribute("description", out(AttributeType::String))
            .with_attribute("homepage_url", out(AttributeType::String))
            .with_attribute("visibility", out(AttributeType::String))
            .with_attribute("default_branch", out(AttributeType::String))
            .with_attribute("archived", out(AttributeType::Bool))
            .with_attribute("is_template", out(AttributeType::Bool))
            .with_attribute("has_issues", out(AttributeType::Bool))
            .with_attribute("has_wiki", out(AttributeType::Bool))
            .with_attribute("has_projects", out(AttributeType::Bool))
            .with_attribute("topics", out(AttributeType::string_list()))
            .with_attribute("html_url", out(AttributeType::String))
            .with_attribute("ssh_clone_url", out(AttributeType::String))
            .with_attribute("http_clone_url", out(AttributeType::String))
            .with_attribute("git_clone_url", out(AttributeType::String))
            .with_attribute("svn_url", out(AttributeType::String))
            .with_attribute("node_id", out(AttributeType::String))
            .with_attribute("repo_id", out(AttributeType::Int))
    }

    async fn read(
        &self,
        owner: &Owner,
        config: RepositoryLookupModel,
    ) -> ProviderResult<RepositoryLookupModel> {
        let (repo_owner, name) = match (config.full_name.as_deref(), config.name.as_deref()) {
            (Some(full), _) => full.split_once('/').ok_or_else(|| {
                ProviderError::Configuration(format!("full_name {:?} must be owner/name", full))
            })?,
            (None, Some(name)) => (owner.name()?, name),
            (None, None) => {
                return Err(ProviderError::Configuration(
                    "one of name or full_name must be set".to_string(),
                ))
            }
        };

        let repo = owner
            .client()
            .repositories()
            .get_optional(repo_owner, name)
            .await?
            .ok_or_else(|| not_found(Self::TYPE_NAME, &format!("{}/{}", repo_owner, name)))?;
        Ok(repo.into())
    }
}

/// Output of `github_repositories`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoriesModel {
    /// Data source ID.
    pub id: Option<String>,
    /// Search query.
    pub query: Option<String>,
    /// Sort order (stars, fork, updated).
    pub sort: Option<String>,
    /// `owner/name` of each match.
    pub full_names: Option<Vec<String>>,
    /// Name of each match.
    pub names: Option<Vec<String>>,
    /// Numeric ID of each match.
    pub repo_ids: Option<Vec<u64>>,
}

/// `github_repositories`: repository search.
pub struct RepositoriesDataSource;

#[async_trait]
impl DataSource for RepositoriesDataSource {
    type Model = RepositoriesModel;
    const TYPE_NAME: &'static str = "github_repositories";

    fn schema(&self) -> Schema {
        Schema::data_source("Repositories matching a search query.")
            .with_attribute("query", Attribute::required(AttributeType::String))
            .with_attribute(
                "sort",
                Attribute::optional(AttributeType::String)
                    .default_value(json!("updated"))
                    .validator(Validator::OneOf(vec![
                        "stars",
                        "forks",
                        "help-wanted-issues",
                        "updated",
                    ])),
            )
            .with_attribute("full_names", Attribute::computed(AttributeType::string_list()))
            .with_attribute("names", Attribute::computed(AttributeType::string_list()))
            .with_attribute(
                "repo_ids",
                Attribute::computed(AttributeType::List(Box::new(AttributeType::Int))),
            )
    }

    async fn read(
        &self,
        owner: &Owner,
        config: RepositoriesModel,
    ) -> ProviderResult<RepositoriesModel> {
        let query = config
            .query
            .clone()
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ProviderError::Configuration("\"query\" must be set".to_string()))?;
        let params = SearchRepositoriesParams {
            q: query.clone(),
            sort: Some(config.sort.clone().unwrap_or_else(|| "updated".to_string())),
        };

        let repos = owner.client().search().repositories(&params).await?;
        tracing::debug!(query = %query, count = repos.len(), "Repository search finished");

        Ok(RepositoriesModel {
            id: Some(query.clone()),
            query: Some(query),
            sort: params.sort,
            full_names: Some(repos.iter().map(|r| r.full_name.clone()).collect()),
            names: Some(repos.iter().map(|r| r.name.clone()).collect()),
            repo_ids: Some(repos.iter().map(|r| r.id).collect()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_falls_back_to_private_flag() {
        let repo = Repository {
            name: "api".into(),
            private: true,
            visibility: None,
            ..Default::default()
        };
        let model = RepositoryLookupModel::from(repo);
        assert_eq!(model.visibility.as_deref(), Some("private"));
        assert_eq!(model.id.as_deref(), Some("api"));
    }

    #[test]
    fn test_name_conflicts_with_full_name() {
        let diags = RepositoryDataSource
            .schema()
            .validate(&json!({"name": "api", "full_name": "acme/api"}));
        assert!(diags.iter().any(|d| d.is_error()));
    }
}
