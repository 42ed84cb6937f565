//! Issue tracker resources: labels, issues and milestones.

use super::{required, same_set, vanished};
use crate::errors::{ProviderError, ProviderResult};
use crate::ids::{build_two_part_id, parse_two_part_id, parse_u64};
use crate::provider::{Owner, Resource};
use crate::reconcile::{reconcile, KeyMatch};
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use crate::services::{IssueRequest, LabelRequest, MilestoneRequest};
use crate::types::{Label, Milestone};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;

const LABEL_ID: &str = "repository:name";
const ISSUE_ID: &str = "repository:number";
const MILESTONE_ID: &str = "owner/repository/number";

const COLOR_PATTERN: &str = r"^#?[0-9a-fA-F]{6}$";

fn color_attribute() -> Attribute {
    Attribute::required(AttributeType::String).validator(Validator::Regex {
        pattern: COLOR_PATTERN,
        message: "must be a 6 digit hex color",
    })
}

fn normalize_color(color: &str) -> String {
    color.trim_start_matches('#').to_ascii_lowercase()
}

/// The API reports colors as lowercase hex without `#`; an equivalent
/// configured spelling is kept so reads do not produce a diff.
fn keep_color(configured: Option<&str>, remote: String) -> String {
    match configured {
        Some(color) if normalize_color(color) == normalize_color(&remote) => color.to_string(),
        _ => remote,
    }
}

fn label_request(
    name: Option<String>,
    new_name: Option<String>,
    color: &str,
    description: Option<String>,
) -> LabelRequest {
    LabelRequest {
        name,
        new_name,
        color: normalize_color(color),
        description,
    }
}

/// State of `github_issue_label`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueLabelModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Name.
    pub name: Option<String>,
    /// Hex color, with or without a leading `#`.
    pub color: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// API URL.
    pub url: Option<String>,
}

/// `github_issue_label`.
///
/// Creating a label that already exists adopts and updates it, since every
/// new repository ships with a default label set.
pub struct IssueLabelResource;

#[async_trait]
impl Resource for IssueLabelResource {
    type Model = IssueLabelModel;
    const TYPE_NAME: &'static str = "github_issue_label";

    fn schema(&self) -> Schema {
        Schema::resource("A single issue label.")
            .with_attribute("repository", Attribute::required(AttributeType::String).force_new())
            .with_attribute("name", Attribute::required(AttributeType::String))
            .with_attribute("color", color_attribute())
            .with_attribute("description", Attribute::optional(AttributeType::String))
            .with_attribute("url", Attribute::computed(AttributeType::String))
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: IssueLabelModel,
    ) -> ProviderResult<IssueLabelModel> {
        let owner_name = owner.name()?;
        let repo = required(&plan.repository, "repository")?;
        let name = required(&plan.name, "name")?;
        let color = required(&plan.color, "color")?;
        let issues = owner.client().issues();

        if issues.get_label(owner_name, repo, name).await?.is_some() {
            tracing::info!(repository = %repo, label = %name, "Label exists, updating in place");
            let request = label_request(None, None, color, plan.description.clone());
            issues.update_label(owner_name, repo, name, &request).await?;
        } else {
            let request =
                label_request(Some(name.to_string()), None, color, plan.description.clone());
            issues.create_label(owner_name, repo, &request).await?;
        }

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
        state: IssueLabelModel,
    ) -> ProviderResult<Option<IssueLabelModel>> {
        let id = required(&state.id, "id")?;
        let (repo, name) = parse_two_part_id(id, LABEL_ID)?;

        let label = owner
            .client()
            .issues()
            .get_label(owner.name()?, repo, name)
            .await?;

        Ok(label.map(|l| IssueLabelModel {
            id: Some(id.to_string()),
            repository: Some(repo.to_string()),
            name: Some(l.name),
            color: Some(keep_color(state.color.as_deref(), l.color)),
            description: l.description.filter(|d| !d.is_empty()),
            url: Some(l.url),
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: IssueLabelModel,
        plan: IssueLabelModel,
    ) -> ProviderResult<IssueLabelModel> {
        let repo = required(&plan.repository, "repository")?;
        let old = required(&prior.name, "name")?;
        let new = required(&plan.name, "name")?;
        let color = required(&plan.color, "color")?;

        let new_name = (old != new).then(|| new.to_string());
        let request = label_request(None, new_name, color, plan.description.clone());
        owner
            .client()
            .issues()
            .update_label(owner.name()?, repo, old, &request)
            .await?;

        let id = build_two_part_id(repo, new);
        let mut state = plan.clone();
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn delete(&self, owner: &Owner, state: IssueLabelModel) -> ProviderResult<()> {
        let id = required(&state.id, "id")?;
        let (repo, name) = parse_two_part_id(id, LABEL_ID)?;
        owner
            .client()
            .issues()
            .delete_label(owner.name()?, repo, name)
            .await?;
        Ok(())
    }
}

/// A label entry of `github_issue_labels`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelModel {
    /// Name.
    pub name: String,
    /// Hex color, with or without a leading `#`.
    pub color: String,
    /// Description.
    pub description: Option<String>,
    /// API URL.
    pub url: Option<String>,
}

impl From<Label> for LabelModel {
    fn from(label: Label) -> Self {
        Self {
            name: label.name,
            color: label.color,
            description: label.description.filter(|d| !d.is_empty()),
            url: Some(label.url),
        }
    }
}

/// State of `github_issue_labels`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueLabelsModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Every label of the repository.
    pub label: Option<Vec<LabelModel>>,
}

/// `github_issue_labels`: owns the complete label set of a repository.
pub struct IssueLabelsResource;

impl IssueLabelsResource {
    async fn apply(
        &self,
        owner: &Owner,
        repo: &str,
        desired: Vec<LabelModel>,
    ) -> ProviderResult<()> {
        let owner_name = owner.name()?;
        let issues = owner.client().issues();
        let actual: Vec<LabelModel> = issues
            .list_labels(owner_name, repo)
            .await?
            .into_iter()
            .map(LabelModel::from)
            .collect();

        let result = reconcile(
            desired,
            actual,
            KeyMatch::CaseInsensitive,
            |d| d.name.clone(),
            |a| a.name.clone(),
            |a, d| {
                a.name == d.name
                    && normalize_color(&a.color) == normalize_color(&d.color)
                    && a.description.as_deref().unwrap_or_default()
                        == d.description.as_deref().unwrap_or_default()
            },
        );
        tracing::debug!(
            repository = %repo,
            add = result.add.len(),
            update = result.update.len(),
            remove = result.remove.len(),
            "Reconciling labels"
        );

        for label in result.remove {
            issues.delete_label(owner_name, repo, &label.name).await?;
        }
        for (current, target) in result.update {
            let new_name = (current.name != target.name).then(|| target.name.clone());
            let request = label_request(None, new_name, &target.color, target.description.clone());
            issues.update_label(owner_name, repo, &current.name, &request).await?;
        }
        for label in result.add {
            let request = label_request(
                Some(label.name.clone()),
                None,
                &label.color,
                label.description.clone(),
            );
            issues.create_label(owner_name, repo, &request).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Resource for IssueLabelsResource {
    type Model = IssueLabelsModel;
    const TYPE_NAME: &'static str = "github_issue_labels";

    fn schema(&self) -> Schema {
        Schema::resource("The complete label set of a repository.")
            .with_attribute("repository", Attribute::required(AttributeType::String).force_new())
            .with_attribute(
                "label",
                Attribute::optional(AttributeType::Set(Box::new(AttributeType::object([
                    ("name", Attribute::required(AttributeType::String)),
                    ("color", color_attribute()),
                    ("description", Attribute::optional(AttributeType::String)),
                    ("url", Attribute::computed(AttributeType::String)),
                ])))),
            )
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: IssueLabelsModel,
    ) -> ProviderResult<IssueLabelsModel> {
        let repo = required(&plan.repository, "repository")?.to_string();
        self.apply(owner, &repo, plan.label.clone().unwrap_or_default())
            .await?;

        let mut state = plan;
        state.id = Some(repo.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &repo))
    }

    async fn read(
        &self,
        owner: &Owner,
        state: IssueLabelsModel,
    ) -> ProviderResult<Option<IssueLabelsModel>> {
        let id = required(&state.id, "id")?;
        let owner_name = owner.name()?;
        let client = owner.client();

        if client.repositories().get_optional(owner_name, id).await?.is_none() {
            return Ok(None);
        }
        let labels = client.issues().list_labels(owner_name, id).await?;
        let prior = state.label.as_deref().unwrap_or_default();

        let label = labels
            .into_iter()
            .map(|l| {
                let mut model = LabelModel::from(l);
                let configured = prior.iter().find(|p| p.name.eq_ignore_ascii_case(&model.name));
                model.color = keep_color(configured.map(|p| p.color.as_str()), model.color);
                model
            })
            .collect();

        Ok(Some(IssueLabelsModel {
            id: Some(id.to_string()),
            repository: Some(id.to_string()),
            label: Some(label),
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: IssueLabelsModel,
        plan: IssueLabelsModel,
    ) -> ProviderResult<IssueLabelsModel> {
        let mut plan = plan;
        plan.id = prior.id;
        self.create(owner, plan).await
    }

    async fn delete(&self, owner: &Owner, state: IssueLabelsModel) -> ProviderResult<()> {
        let repo = required(&state.repository, "repository")?;
        self.apply(owner, repo, Vec::new()).await
    }
}

/// State of `github_issue`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Title.
    pub title: Option<String>,
    /// Issue body.
    pub body: Option<String>,
    /// Label names.
    pub labels: Option<Vec<String>>,
    /// Assignee logins.
    pub assignees: Option<Vec<String>>,
    /// Milestone number.
    pub milestone_number: Option<u64>,
    /// Issue number.
    pub number: Option<u64>,
    /// Numeric issue ID.
    pub issue_id: Option<u64>,
}

impl IssueModel {
    fn request(&self, title: &str) -> IssueRequest {
        IssueRequest {
            title: title.to_string(),
            body: self.body.clone(),
            assignees: self.assignees.clone().unwrap_or_default(),
            labels: self.labels.clone().unwrap_or_default(),
            milestone: self.milestone_number,
            state: None,
        }
    }
}

/// `github_issue`. Issues cannot be deleted, so destroy closes them.
pub struct IssueResource;

#[async_trait]
impl Resource for IssueResource {
    type Model = IssueModel;
    const TYPE_NAME: &'static str = "github_issue";

    fn schema(&self) -> Schema {
        Schema::resource("An issue.")
            .with_attribute("repository", Attribute::required(AttributeType::String).force_new())
            .with_attribute("title", Attribute::required(AttributeType::String))
            .with_attribute("body", Attribute::optional(AttributeType::String))
            .with_attribute("labels", Attribute::optional(AttributeType::string_set()))
            .with_attribute("assignees", Attribute::optional(AttributeType::string_set()))
            .with_attribute("milestone_number", Attribute::optional(AttributeType::Int))
            .with_attribute(
                "number",
                Attribute::computed(AttributeType::Int).use_state_for_unknown(),
            )
            .with_attribute(
                "issue_id",
                Attribute::computed(AttributeType::Int).use_state_for_unknown(),
            )
    }

    async fn create(&self, owner: &Owner, plan: IssueModel) -> ProviderResult<IssueModel> {
        let repo = required(&plan.repository, "repository")?;
        let title = required(&plan.title, "title")?;

        let issue = owner
            .client()
            .issues()
            .create(owner.name()?, repo, &plan.request(title))
            .await?;
        tracing::info!(repository = %repo, number = issue.number, "Created issue");

        let id = build_two_part_id(repo, &issue.number.to_string());
        let mut state = plan.clone();
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn read(&self, owner: &Owner, state: IssueModel) -> ProviderResult<Option<IssueModel>> {
        let id = required(&state.id, "id")?;
        let (repo, number) = parse_two_part_id(id, ISSUE_ID)?;
        let number = parse_u64(number, id, ISSUE_ID)?;

        let issue = owner
            .client()
            .issues()
            .get(owner.name()?, repo, number)
            .await?;

        Ok(issue.map(|i| {
            let labels: Vec<String> = i.labels.into_iter().map(|l| l.name).collect();
            let assignees: Vec<String> = i.assignees.into_iter().map(|u| u.login).collect();
            IssueModel {
                id: Some(id.to_string()),
                repository: Some(repo.to_string()),
                title: Some(i.title),
                body: i.body.filter(|b| !b.is_empty()),
                labels: (!labels.is_empty() || state.labels.is_some()).then_some(labels),
                assignees: (!assignees.is_empty() || state.assignees.is_some())
                    .then_some(assignees),
                milestone_number: i.milestone.map(|m| m.number),
                number: Some(i.number),
                issue_id: Some(i.id),
            }
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: IssueModel,
        plan: IssueModel,
    ) -> ProviderResult<IssueModel> {
        let mut plan = plan;
        plan.id = prior.id.clone();
        let id = required(&plan.id, "id")?.to_string();
        let (repo, number) = parse_two_part_id(&id, ISSUE_ID)?;
        let number = parse_u64(number, &id, ISSUE_ID)?;
        let title = required(&plan.title, "title")?;

        let mut request = plan.request(title);
        if same_set(&prior.labels, &plan.labels) {
            request.labels = prior.labels.clone().unwrap_or_default();
        }
        owner
            .client()
            .issues()
            .update(owner.name()?, repo, number, &request)
            .await?;

        self.read(owner, plan)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn delete(&self, owner: &Owner, state: IssueModel) -> ProviderResult<()> {
        let id = required(&state.id, "id")?;
        let (repo, number) = parse_two_part_id(id, ISSUE_ID)?;
        let number = parse_u64(number, id, ISSUE_ID)?;
        owner
            .client()
            .issues()
            .close(owner.name()?, repo, number)
            .await?;
        tracing::info!(repository = %repo, number, "Closed issue");
        Ok(())
    }
}

/// State of `github_repository_milestone`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MilestoneModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Repository owner.
    pub owner: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Title.
    pub title: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Due date, `YYYY-MM-DD`.
    pub due_date: Option<String>,
    /// State (open, closed).
    pub state: Option<String>,
    /// Milestone number.
    pub number: Option<u64>,
}

impl MilestoneModel {
    fn request(&self, title: &str) -> ProviderResult<MilestoneRequest> {
        let due_on = match self.due_date.as_deref().filter(|d| !d.is_empty()) {
            Some(date) => {
                let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
                    ProviderError::Configuration(format!(
                        "due_date {:?} is not YYYY-MM-DD: {}",
                        date, e
                    ))
                })?;
                Some(format!("{}T12:00:00Z", date.format("%Y-%m-%d")))
            }
            None => None,
        };
        Ok(MilestoneRequest {
            title: title.to_string(),
            state: self.state.clone(),
            description: self.description.clone(),
            due_on,
        })
    }

    fn refresh(id: &str, owner: &str, repo: &str, milestone: Milestone) -> Self {
        let due_date = milestone.due_on.as_deref().and_then(|due| {
            DateTime::parse_from_rfc3339(due)
                .ok()
                .map(|d| d.date_naive().format("%Y-%m-%d").to_string())
        });
        Self {
            id: Some(id.to_string()),
            owner: Some(owner.to_string()),
            repository: Some(repo.to_string()),
            title: Some(milestone.title),
            description: milestone.description.filter(|d| !d.is_empty()),
            due_date,
            state: Some(milestone.state),
            number: Some(milestone.number),
        }
    }
}

fn parse_milestone_id(id: &str) -> ProviderResult<(&str, &str, u64)> {
    let parts: Vec<&str> = id.split('/').collect();
    match parts.as_slice() {
        [owner, repo, number] if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner, repo, parse_u64(number, id, MILESTONE_ID)?))
        }
        _ => Err(ProviderError::InvalidId {
            id: id.to_string(),
            expected: MILESTONE_ID,
        }),
    }
}

/// `github_repository_milestone`. Unlike other repository children it names
/// the repository owner explicitly.
pub struct MilestoneResource;

#[async_trait]
impl Resource for MilestoneResource {
    type Model = MilestoneModel;
    const TYPE_NAME: &'static str = "github_repository_milestone";

    fn schema(&self) -> Schema {
        Schema::resource("A repository milestone.")
            .with_attribute("owner", Attribute::required(AttributeType::String).force_new())
            .with_attribute("repository", Attribute::required(AttributeType::String).force_new())
            .with_attribute("title", Attribute::required(AttributeType::String))
            .with_attribute("description", Attribute::optional(AttributeType::String))
            .with_attribute(
                "due_date",
                Attribute::optional(AttributeType::String).validator(Validator::Regex {
                    pattern: r"^\d{4}-\d{2}-\d{2}$",
                    message: "must be YYYY-MM-DD",
                }),
            )
            .with_attribute(
                "state",
                Attribute::optional(AttributeType::String)
                    .default_value(json!("open"))
                    .validator(Validator::OneOf(vec!["open", "closed"])),
            )
            .with_attribute(
                "number",
                Attribute::computed(AttributeType::Int).use_state_for_unknown(),
            )
    }

    async fn create(&self, owner: &Owner, plan: MilestoneModel) -> ProviderResult<MilestoneModel> {
        let repo_owner = required(&plan.owner, "owner")?;
        let repo = required(&plan.repository, "repository")?;
        let title = required(&plan.title, "title")?;

        let milestone = owner
            .client()
            .issues()
            .create_milestone(repo_owner, repo, &plan.request(title)?)
            .await?;

        let id = format!("{}/{}/{}", repo_owner, repo, milestone.number);
        let mut state = plan.clone();
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn read(
        &self,
        owner: &Owner,
        state: MilestoneModel,
    ) -> ProviderResult<Option<MilestoneModel>> {
        let id = required(&state.id, "id")?;
        let (repo_owner, repo, number) = parse_milestone_id(id)?;

        let milestone = owner
            .client()
            .issues()
            .get_milestone(repo_owner, repo, number)
            .await?;

        Ok(milestone.map(|m| MilestoneModel::refresh(id, repo_owner, repo, m)))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: MilestoneModel,
        plan: MilestoneModel,
    ) -> ProviderResult<MilestoneModel> {
        let mut plan = plan;
        plan.id = prior.id;
        let id = required(&plan.id, "id")?.to_string();
        let (repo_owner, repo, number) = parse_milestone_id(&id)?;
        let title = required(&plan.title, "title")?;

        owner
            .client()
            .issues()
            .update_milestone(repo_owner, repo, number, &plan.request(title)?)
            .await?;
        self.read(owner, plan)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn delete(&self, owner: &Owner, state: MilestoneModel) -> ProviderResult<()> {
        let id = required(&state.id, "id")?;
        let (repo_owner, repo, number) = parse_milestone_id(id)?;
        owner
            .client()
            .issues()
            .delete_milestone(repo_owner, repo, number)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("#FF00aa", "ff00aa")]
    #[test_case("c0ffee", "c0ffee")]
    fn test_normalize_color(input: &str, expected: &str) {
        assert_eq!(normalize_color(input), expected);
    }

    #[test_case(Some("#D73A4A"), "d73a4a", "#D73A4A" ; "equivalent spelling kept")]
    #[test_case(Some("ff0000"), "d73a4a", "d73a4a" ; "remote change wins")]
    #[test_case(None, "d73a4a", "d73a4a" ; "import")]
    fn test_keep_color(configured: Option<&str>, remote: &str, expected: &str) {
        assert_eq!(keep_color(configured, remote.to_string()), expected);
    }

    #[test]
    fn test_parse_milestone_id() {
        assert_eq!(parse_milestone_id("acme/api/7").unwrap(), ("acme", "api", 7));
        assert!(parse_milestone_id("acme/api").is_err());
        assert!(parse_milestone_id("acme/api/x").is_err());
        assert!(parse_milestone_id("acme:api:7").is_err());
    }

    #[test]
    fn test_milestone_due_date_round_trip() {
        let model = MilestoneModel {
            due_date: Some("2024-03-01".into()),
            ..Default::default()
        };
        let request = model.request("v1").unwrap();
        let due_on = request.due_on.unwrap();
        assert!(due_on.starts_with("2024-03-01T"));

        let milestone = Milestone {
            number: 3,
            title: "v1".into(),
            state: "open".into(),
            due_on: Some(due_on),
            ..Default::default()
        };
        let refreshed = MilestoneModel::refresh("acme/api/3", "acme", "api", milestone);
        assert_eq!(refreshed.due_date.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn test_milestone_rejects_bad_date() {
        let model = MilestoneModel {
            due_date: Some("03/01/2024".into()),
            ..Default::default()
        };
        assert!(model.request("v1").is_err());
    }

    #[test]
    fn test_label_model_drops_empty_description() {
        let label = Label {
            name: "bug".into(),
            color: "d73a4a".into(),
            description: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(LabelModel::from(label).description, None);
    }
}
