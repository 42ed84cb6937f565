//! `github_branch` and `github_ref`.

use super::not_found;
use crate::errors::ProviderResult;
use crate::ids::build_two_part_id;
use crate::provider::{DataSource, Owner};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::services::full_ref;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Output of the `github_branch` data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchLookupModel {
    /// Data source ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Branch name.
    pub branch: Option<String>,
    /// Fully qualified ref.
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    /// Commit SHA.
    pub sha: Option<String>,
}

/// `github_branch` data source.
pub struct BranchDataSource;

#[async_trait]
impl DataSource for BranchDataSource {
    type Model = BranchLookupModel;
    const TYPE_NAME: &'static str = "github_branch";

    fn schema(&self) -> Schema {
        Schema::data_source("A branch of a repository.")
            .with_attribute("repository", Attribute::required(AttributeType::String))
            .with_attribute("branch", Attribute::required(AttributeType::String))
            .with_attribute("ref", Attribute::computed(AttributeType::String))
            .with_attribute("sha", Attribute::computed(AttributeType::String))
    }

    async fn read(
        &self,
        owner: &Owner,
        config: BranchLookupModel,
    ) -> ProviderResult<BranchLookupModel> {
        let repo = config.repository.clone().unwrap_or_default();
        let branch = config.branch.clone().unwrap_or_default();

        let git_ref = owner
            .client()
            .git()
            .get_ref(owner.name()?, &repo, &format!("heads/{}", branch))
            .await?
            .ok_or_else(|| not_found(Self::TYPE_NAME, &build_two_part_id(&repo, &branch)))?;

        Ok(BranchLookupModel {
            id: Some(build_two_part_id(&repo, &branch)),
            repository: Some(repo),
            branch: Some(branch),
            git_ref: Some(git_ref.ref_name),
            sha: Some(git_ref.object.sha),
        })
    }
}

/// Output of `github_ref`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefModel {
    /// Data source ID.
    pub id: Option<String>,
    /// Repository owner.
    pub owner: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Fully qualified ref.
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    /// Commit SHA.
    pub sha: Option<String>,
}

/// `github_ref`: any reference (`heads/main`, `tags/v1.0`).
pub struct RefDataSource;

#[async_trait]
impl DataSource for RefDataSource {
    type Model = RefModel;
    const TYPE_NAME: &'static str = "github_ref";

    fn schema(&self) -> Schema {
        Schema::data_source("A git reference of a repository.")
            .with_attribute(
                "owner",
                Attribute::optional_computed(AttributeType::String)
                    .description("Defaults to the provider owner."),
            )
            .with_attribute("repository", Attribute::required(AttributeType::String))
            .with_attribute("ref", Attribute::required(AttributeType::String))
            .with_attribute("sha", Attribute::computed(AttributeType::String))
    }

    async fn read(&self, owner: &Owner, config: RefModel) -> ProviderResult<RefModel> {
        let repo_owner = match config.owner.as_deref().filter(|o| !o.is_empty()) {
            Some(o) => o.to_string(),
            None => owner.name()?.to_string(),
        };
        let repo = config.repository.clone().unwrap_or_default();
        let reference = full_ref(config.git_ref.as_deref().unwrap_or_default());

        let found = owner
            .client()
            .git()
            .get_ref(&repo_owner, &repo, &reference)
            .await?
            .ok_or_else(|| not_found(Self::TYPE_NAME, &reference))?;

        Ok(RefModel {
            id: Some(build_two_part_id(&repo, &reference)),
            owner: Some(repo_owner),
            repository: Some(repo),
            git_ref: config.git_ref,
            sha: Some(found.object.sha),
        })
    }
}
