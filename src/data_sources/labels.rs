//! `github_issue_labels`.

use crate::errors::ProviderResult;
use crate::provider::{DataSource, Owner};
use crate::schema::{Attribute, AttributeType, Schema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A label entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelEntry {
    /// Name.
    pub name: String,
    /// Hex color, with or without a leading `#`.
    pub color: String,
    /// Description.
    pub description: Option<String>,
    /// API URL.
    pub url: String,
}

/// Output of `github_issue_labels`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueLabelsListModel {
    /// Data source ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Labels of the repository.
    pub labels: Option<Vec<LabelEntry>>,
}

/// `github_issue_labels` data source.
pub struct IssueLabelsDataSource;

#[async_trait]
impl DataSource for IssueLabelsDataSource {
    type Model = IssueLabelsListModel;
    const TYPE_NAME: &'static str = "github_issue_labels";

    fn schema(&self) -> Schema {
        Schema::data_source("Every label of a repository.")
            .with_attribute("repository", Attribute::required(AttributeType::String))
            .with_attribute(
                "labels",
                Attribute::computed(AttributeType::List(Box::new(AttributeType::object([
                    ("name", Attribute::computed(AttributeType::String)),
                    ("color", Attribute::computed(AttributeType::String)),
                    ("description", Attribute::computed(AttributeType::String)),
                    ("url", Attribute::computed(AttributeType::String)),
                ])))),
            )
    }

    async fn read(
        &self,
        owner: &Owner,
        config: IssueLabelsListModel,
    ) -> ProviderResult<IssueLabelsListModel> {
        let repo = config.repository.clone().unwrap_or_default();
        let labels = owner
            .client()
            .issues()
            .list_labels(owner.name()?, &repo)
            .await?;

        Ok(IssueLabelsListModel {
            id: Some(repo.clone()),
            repository: Some(repo),
            labels: Some(
                labels
                    .into_iter()
                    .map(|l| LabelEntry {
                        name: l.name,
                        color: l.color,
                        description: l.description,
                        url: l.url,
                    })
                    .collect(),
            ),
        })
    }
}
