//! `github_repository_file`: a file committed through the contents API.

use super::{required, vanished};
use crate::errors::{ProviderError, ProviderResult};
use crate::ids::{parse_import_id, ID_SEPARATOR};
use crate::provider::{Owner, Resource};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::services::{CreateOrUpdateFileRequest, DeleteFileRequest};
use crate::types::CommitAuthor;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::json;

const FILE_ID: &str = "repository/path";

/// State of `github_repository_file`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryFileModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Path of the file.
    pub file: Option<String>,
    /// File content.
    pub content: Option<String>,
    /// Branch to commit to; the default branch when unset.
    pub branch: Option<String>,
    /// Commit message.
    pub commit_message: Option<String>,
    /// Commit author name.
    pub commit_author: Option<String>,
    /// Commit author email.
    pub commit_email: Option<String>,
    /// Overwrite a file that already exists on create.
    pub overwrite_on_create: Option<bool>,
    /// Blob SHA.
    pub sha: Option<String>,
    /// SHA of the last commit touching the file.
    pub commit_sha: Option<String>,
}

impl RepositoryFileModel {
    fn message(&self, verb: &str, file: &str) -> String {
        self.commit_message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("{} {}", verb, file))
    }

    fn committer(&self) -> Option<CommitAuthor> {
        match (self.commit_author.as_deref(), self.commit_email.as_deref()) {
            (Some(name), Some(email)) => Some(CommitAuthor {
                name: name.to_string(),
                email: email.to_string(),
            }),
            _ => None,
        }
    }

    fn branch(&self) -> Option<&str> {
        self.branch.as_deref().filter(|b| !b.is_empty())
    }
}

/// Decodes contents API output, which wraps base64 at 60 columns.
fn decode_content(encoded: &str) -> ProviderResult<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| ProviderError::Conflict(format!("file content is not valid base64: {}", e)))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// `github_repository_file`.
pub struct RepositoryFileResource;

impl RepositoryFileResource {
    async fn write(
        &self,
        owner: &Owner,
        plan: RepositoryFileModel,
        sha: Option<String>,
        verb: &str,
    ) -> ProviderResult<RepositoryFileModel> {
        let repo = required(&plan.repository, "repository")?;
        let file = required(&plan.file, "file")?;

        let request = CreateOrUpdateFileRequest {
            message: plan.message(verb, file),
            content: STANDARD.encode(plan.content.as_deref().unwrap_or_default()),
            sha,
            branch: plan.branch().map(str::to_string),
            committer: plan.committer(),
        };
        let response = owner
            .client()
            .repositories()
            .create_or_update_file(owner.name()?, repo, file, &request)
            .await?;
        tracing::info!(
            repository = %repo,
            file = %file,
            commit = %response.commit.sha,
            "Committed file"
        );

        let id = format!("{}/{}", repo, file);
        let mut state = plan.clone();
        state.id = Some(id.clone());
        state.commit_sha = Some(response.commit.sha);
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }
}

#[async_trait]
impl Resource for RepositoryFileResource {
    type Model = RepositoryFileModel;
    const TYPE_NAME: &'static str = "github_repository_file";

    fn schema(&self) -> Schema {
        Schema::resource("A file in a repository.")
            .with_attribute("repository", Attribute::required(AttributeType::String).force_new())
            .with_attribute("file", Attribute::required(AttributeType::String).force_new())
            .with_attribute("content", Attribute::required(AttributeType::String))
            .with_attribute(
                "branch",
                Attribute::optional(AttributeType::String)
                    .force_new()
                    .description("Defaults to the repository's default branch."),
            )
            .with_attribute("commit_message", Attribute::optional_computed(AttributeType::String))
            .with_attribute("commit_author", Attribute::optional(AttributeType::String))
            .with_attribute("commit_email", Attribute::optional(AttributeType::String))
            .with_attribute(
                "overwrite_on_create",
                Attribute::optional(AttributeType::Bool).default_value(json!(false)),
            )
            .with_attribute("sha", Attribute::computed(AttributeType::String))
            .with_attribute("commit_sha", Attribute::computed(AttributeType::String))
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: RepositoryFileModel,
    ) -> ProviderResult<RepositoryFileModel> {
        let repo = required(&plan.repository, "repository")?;
        let file = required(&plan.file, "file")?;

        let existing = owner
            .client()
            .repositories()
            .get_contents(owner.name()?, repo, file, plan.branch())
            .await?;
        let sha = match existing {
            Some(_) if plan.overwrite_on_create != Some(true) => {
                return Err(ProviderError::Conflict(format!(
                    "{} already exists in {}; set overwrite_on_create to manage it",
                    file, repo
                )));
            }
            Some(content) => Some(content.sha),
            None => None,
        };

        self.write(owner, plan, sha, "Add").await
    }

    async fn read(
        &self,
        owner: &Owner,
        state: RepositoryFileModel,
    ) -> ProviderResult<Option<RepositoryFileModel>> {
        let id = required(&state.id, "id")?;
        let (repo, file) = parse_import_id(id, FILE_ID)?;

        let content = owner
            .client()
            .repositories()
            .get_contents(owner.name()?, repo, file, state.branch())
            .await?;
        let content = match content {
            Some(c) if c.content_type.is_empty() || c.content_type == "file" => c,
            Some(_) => {
                tracing::warn!(repository = %repo, file = %file, "Path is no longer a file");
                return Ok(None);
            }
            None => return Ok(None),
        };

        let text = match content.content.as_deref() {
            Some(encoded) => Some(decode_content(encoded)?),
            None => state.content.clone(),
        };

        Ok(Some(RepositoryFileModel {
            id: Some(id.to_string()),
            repository: Some(repo.to_string()),
            file: Some(file.to_string()),
            content: text,
            sha: Some(content.sha),
            ..state.clone()
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: RepositoryFileModel,
        plan: RepositoryFileModel,
    ) -> ProviderResult<RepositoryFileModel> {
        let mut plan = plan;
        plan.id = prior.id;
        self.write(owner, plan, prior.sha, "Update").await
    }

    async fn delete(&self, owner: &Owner, state: RepositoryFileModel) -> ProviderResult<()> {
        let id = required(&state.id, "id")?;
        let (repo, file) = parse_import_id(id, FILE_ID)?;
        let sha = required(&state.sha, "sha")?;

        let request = DeleteFileRequest {
            message: state.message("Delete", file),
            sha: sha.to_string(),
            branch: state.branch().map(str::to_string),
            committer: state.committer(),
        };
        owner
            .client()
            .repositories()
            .delete_file(owner.name()?, repo, file, &request)
            .await?;
        Ok(())
    }

    /// Accepts `repository/path` or `repository/path:branch`.
    async fn import(&self, _owner: &Owner, id: &str) -> ProviderResult<RepositoryFileModel> {
        let (id, branch) = match id.rsplit_once(ID_SEPARATOR) {
            Some((path, branch)) => (path, Some(branch.to_string())),
            None => (id, None),
        };
        parse_import_id(id, FILE_ID)?;
        Ok(RepositoryFileModel {
            id: Some(id.to_string()),
            branch,
            overwrite_on_create: Some(false),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_wrapped_content() {
        let encoded = "aGVsbG8g\nd29ybGQK\n";
        assert_eq!(decode_content(encoded).unwrap(), "hello world\n");
    }

    #[test]
    fn test_default_commit_message() {
        let model = RepositoryFileModel::default();
        assert_eq!(model.message("Add", "README.md"), "Add README.md");

        let model = RepositoryFileModel {
            commit_message: Some("docs".into()),
            ..Default::default()
        };
        assert_eq!(model.message("Add", "README.md"), "docs");
    }

    #[test]
    fn test_committer_needs_both_fields() {
        let model = RepositoryFileModel {
            commit_author: Some("bot".into()),
            ..Default::default()
        };
        assert!(model.committer().is_none());
    }

    #[tokio::test]
    async fn test_import_with_branch() {
        let owner = crate::resources::offline_owner();
        let model = RepositoryFileResource
            .import(&owner, "api/docs/README.md:develop")
            .await
            .unwrap();
        assert_eq!(model.id.as_deref(), Some("api/docs/README.md"));
        assert_eq!(model.branch.as_deref(), Some("develop"));

        assert!(RepositoryFileResource.import(&owner, "README.md").await.is_err());
    }
}
