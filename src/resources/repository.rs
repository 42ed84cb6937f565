//! `github_repository` and `github_repository_topics`.

use super::{required, same_set, vanished};
use crate::errors::ProviderResult;
use crate::provider::{Owner, Resource};
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use crate::services::{CreateRepoRequest, TemplateRepoRequest, UpdateRepoRequest};
use crate::types::Repository;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const TOPIC_PATTERN: &str = "^[a-z0-9][a-z0-9-]{0,49}$";

fn topic_validator() -> Validator {
    Validator::Regex {
        pattern: TOPIC_PATTERN,
        message: "must include only lowercase alphanumeric characters or hyphens \
                  and cannot start with a hyphen",
    }
}

/// Template a repository is generated from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateModel {
    /// Template owner.
    pub owner: Option<String>,
    /// Template repository name.
    pub repository: Option<String>,
    /// Copy every branch, not only the default one.
    pub include_all_branches: Option<bool>,
}

/// State of `github_repository`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Name.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Homepage URL.
    pub homepage_url: Option<String>,
    /// Visibility.
    pub visibility: Option<String>,
    /// Issues enabled.
    pub has_issues: Option<bool>,
    /// Discussions enabled.
    pub has_discussions: Option<bool>,
    /// Projects enabled.
    pub has_projects: Option<bool>,
    /// Wiki enabled.
    pub has_wiki: Option<bool>,
    /// Template repository flag.
    pub is_template: Option<bool>,
    /// Allow merge commits.
    pub allow_merge_commit: Option<bool>,
    /// Allow squash merging.
    pub allow_squash_merge: Option<bool>,
    /// Allow rebase merging.
    pub allow_rebase_merge: Option<bool>,
    /// Allow auto-merge.
    pub allow_auto_merge: Option<bool>,
    /// Delete head branches after merge.
    pub delete_branch_on_merge: Option<bool>,
    /// Create an initial commit.
    pub auto_init: Option<bool>,
    /// `.gitignore` template applied on create.
    pub gitignore_template: Option<String>,
    /// License template applied on create.
    pub license_template: Option<String>,
    /// Archived flag.
    pub archived: Option<bool>,
    /// Archive instead of deleting on destroy.
    pub archive_on_destroy: Option<bool>,
    /// Topics.
    pub topics: Option<Vec<String>>,
    /// Dependabot alerts enabled.
    pub vulnerability_alerts: Option<bool>,
    /// Template to generate from.
    pub template: Option<TemplateModel>,
    /// `owner/name`.
    pub full_name: Option<String>,
    /// Default branch.
    pub default_branch: Option<String>,
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

impl RepositoryModel {
    fn private(&self) -> Option<bool> {
        self.visibility.as_deref().map(|v| v != "public")
    }

    fn settings(&self) -> UpdateRepoRequest {
        UpdateRepoRequest {
            description: self.description.clone(),
            homepage: self.homepage_url.clone(),
            visibility: self.visibility.clone(),
            has_issues: self.has_issues,
            has_discussions: self.has_discussions,
            has_projects: self.has_projects,
            has_wiki: self.has_wiki,
            is_template: self.is_template,
            allow_merge_commit: self.allow_merge_commit,
            allow_squash_merge: self.allow_squash_merge,
            allow_rebase_merge: self.allow_rebase_merge,
            allow_auto_merge: self.allow_auto_merge,
            delete_branch_on_merge: self.delete_branch_on_merge,
            ..Default::default()
        }
    }

    /// Overlays API values, keeping attributes GitHub does not report.
    fn refresh(mut self, repo: Repository) -> Self {
        self.id = Some(repo.name.clone());
        self.name = Some(repo.name);
        self.description = repo.description.filter(|d| !d.is_empty());
        self.homepage_url = repo.homepage.filter(|h| !h.is_empty());
        self.visibility = Some(repo.visibility.unwrap_or_else(|| {
            if repo.private { "private" } else { "public" }.to_string()
        }));
        self.has_issues = Some(repo.has_issues);
        self.has_discussions = Some(repo.has_discussions);
        self.has_projects = Some(repo.has_projects);
        self.has_wiki = Some(repo.has_wiki);
        self.is_template = Some(repo.is_template);
        self.allow_merge_commit = Some(repo.allow_merge_commit);
        self.allow_squash_merge = Some(repo.allow_squash_merge);
        self.allow_rebase_merge = Some(repo.allow_rebase_merge);
        self.allow_auto_merge = Some(repo.allow_auto_merge);
        self.delete_branch_on_merge = Some(repo.delete_branch_on_merge);
        self.archived = Some(repo.archived);
        self.topics = Some(repo.topics);
        self.full_name = Some(repo.full_name);
        self.default_branch = Some(repo.default_branch).filter(|b| !b.is_empty());
        self.html_url = Some(repo.html_url);
        self.ssh_clone_url = Some(repo.ssh_url);
        self.http_clone_url = Some(repo.clone_url);
        self.git_clone_url = Some(repo.git_url);
        self.svn_url = Some(repo.svn_url);
        self.node_id = Some(repo.node_id);
        self.repo_id = Some(repo.id);
        self
    }
}

/// `github_repository`.
pub struct RepositoryResource;

#[async_trait]
impl Resource for RepositoryResource {
    type Model = RepositoryModel;
    const TYPE_NAME: &'static str = "github_repository";

    fn schema(&self) -> Schema {
        let flag =
            |default: bool| Attribute::optional(AttributeType::Bool).default_value(json!(default));

        Schema::resource("A GitHub repository owned by the configured owner.")
            .with_attribute(
                "name",
                Attribute::required(AttributeType::String)
                    .description("Repository name. Renaming keeps the repository and changes its ID.")
                    .validator(Validator::Regex {
                        pattern: "^[-a-zA-Z0-9_.]{1,100}$",
                        message: "must include only alphanumeric characters, underscores, hyphens or periods",
                    }),
            )
            .with_attribute("description", Attribute::optional(AttributeType::String))
            .with_attribute("homepage_url", Attribute::optional(AttributeType::String))
            .with_attribute(
                "visibility",
                Attribute::optional_computed(AttributeType::String)
                    .validator(Validator::OneOf(vec!["public", "private", "internal"])),
            )
            .with_attribute("has_issues", flag(false))
            .with_attribute("has_discussions", flag(false))
            .with_attribute("has_projects", flag(false))
            .with_attribute("has_wiki", flag(false))
            .with_attribute("is_template", flag(false))
            .with_attribute("allow_merge_commit", flag(true))
            .with_attribute("allow_squash_merge", flag(true))
            .with_attribute("allow_rebase_merge", flag(true))
            .with_attribute("allow_auto_merge", flag(false))
            .with_attribute("delete_branch_on_merge", flag(false))
            .with_attribute("auto_init", Attribute::optional(AttributeType::Bool).force_new())
            .with_attribute(
                "gitignore_template",
                Attribute::optional(AttributeType::String).force_new(),
            )
            .with_attribute(
                "license_template",
                Attribute::optional(AttributeType::String).force_new(),
            )
            .with_attribute("archived", flag(false))
            .with_attribute(
                "archive_on_destroy",
                Attribute::optional(AttributeType::Bool)
                    .description("Archive instead of deleting on destroy."),
            )
            .with_attribute(
                "topics",
                Attribute::optional_computed(AttributeType::string_set())
                    .validator(topic_validator()),
            )
            .with_attribute(
                "vulnerability_alerts",
                Attribute::optional_computed(AttributeType::Bool),
            )
            .with_attribute(
                "template",
                Attribute::optional(AttributeType::object([
                    ("owner", Attribute::required(AttributeType::String)),
                    ("repository", Attribute::required(AttributeType::String)),
                    ("include_all_branches", Attribute::optional(AttributeType::Bool)),
                ]))
                .force_new(),
            )
            .with_attribute(
                "full_name",
                Attribute::computed(AttributeType::String).use_state_for_unknown(),
            )
            .with_attribute(
                "default_branch",
                Attribute::computed(AttributeType::String).use_state_for_unknown(),
            )
            .with_attribute("html_url", Attribute::computed(AttributeType::String))
            .with_attribute("ssh_clone_url", Attribute::computed(AttributeType::String))
            .with_attribute("http_clone_url", Attribute::computed(AttributeType::String))
            .with_attribute("git_clone_url", Attribute::computed(AttributeType::String))
            .with_attribute("svn_url", Attribute::computed(AttributeType::String))
            .with_attribute(
                "node_id",
                Attribute::computed(AttributeType::String).use_state_for_unknown(),
            )
            .with_attribute(
                "repo_id",
                Attribute::computed(AttributeType::Int).use_state_for_unknown(),
            )
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: RepositoryModel,
    ) -> ProviderResult<RepositoryModel> {
        let owner_name = owner.name()?;
        let name = required(&plan.name, "name")?;
        let repos = owner.client().repositories();

        let created = match plan.template {
            Some(ref template) => {
                let request = TemplateRepoRequest {
                    owner: owner_name.to_string(),
                    name: name.to_string(),
                    description: plan.description.clone(),
                    private: plan.private().unwrap_or(false),
                    include_all_branches: template.include_all_branches.unwrap_or(false),
                };
                let repo = repos
                    .create_from_template(
                        required(&template.owner, "template.owner")?,
                        required(&template.repository, "template.repository")?,
                        &request,
                    )
                    .await?;
                repos.update(owner_name, &repo.name, &plan.settings()).await?
            }
            None => {
                let request = CreateRepoRequest {
                    name: name.to_string(),
                    description: plan.description.clone(),
                    homepage: plan.homepage_url.clone(),
                    private: plan.private(),
                    visibility: plan.visibility.clone(),
                    has_issues: plan.has_issues,
                    has_discussions: plan.has_discussions,
                    has_projects: plan.has_projects,
                    has_wiki: plan.has_wiki,
                    is_template: plan.is_template,
                    allow_merge_commit: plan.allow_merge_commit,
                    allow_squash_merge: plan.allow_squash_merge,
                    allow_rebase_merge: plan.allow_rebase_merge,
                    allow_auto_merge: plan.allow_auto_merge,
                    delete_branch_on_merge: plan.delete_branch_on_merge,
                    auto_init: plan.auto_init,
                    gitignore_template: plan.gitignore_template.clone(),
                    license_template: plan.license_template.clone(),
                };
                if owner.is_organization() {
                    repos.create_for_org(owner_name, &request).await?
                } else {
                    repos.create(&request).await?
                }
            }
        };
        tracing::info!(repository = %created.full_name, "Created repository");

        if let Some(topics) = plan.topics.as_ref().filter(|t| !t.is_empty()) {
            repos.replace_topics(owner_name, &created.name, topics).await?;
        }
        if let Some(enabled) = plan.vulnerability_alerts {
            repos
                .set_vulnerability_alerts(owner_name, &created.name, enabled)
                .await?;
        }
        if plan.archived == Some(true) {
            let archive = UpdateRepoRequest {
                archived: Some(true),
                ..Default::default()
            };
            repos.update(owner_name, &created.name, &archive).await?;
        }

        let id = created.name.clone();
        let mut state = plan;
        state.id = Some(created.name);
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn read(
        &self,
        owner: &Owner,
        state: RepositoryModel,
    ) -> ProviderResult<Option<RepositoryModel>> {
        let owner_name = owner.name()?;
        let id = required(&state.id, "id")?;
        let repos = owner.client().repositories();

        let repo = match repos.get_optional(owner_name, id).await? {
            Some(repo) => repo,
            None => return Ok(None),
        };
        let archived = repo.archived;
        let name = repo.name.clone();
        let mut model = state.refresh(repo);

        if !archived {
            model.vulnerability_alerts =
                Some(repos.vulnerability_alerts_enabled(owner_name, &name).await?);
        }
        Ok(Some(model))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: RepositoryModel,
        plan: RepositoryModel,
    ) -> ProviderResult<RepositoryModel> {
        let owner_name = owner.name()?;
        let current = required(&prior.id, "id")?;
        let name = required(&plan.name, "name")?.to_string();
        let repos = owner.client().repositories();

        let was_archived = prior.archived == Some(true);
        let archive = plan.archived == Some(true);

        if was_archived && archive {
            tracing::warn!(
                repository = %current,
                "Repository is archived, only unarchiving is possible"
            );
        } else {
            let mut settings = plan.settings();
            if name != current {
                settings.name = Some(name.clone());
            }
            if plan.visibility == prior.visibility {
                settings.visibility = None;
            }
            if was_archived && !archive {
                settings.archived = Some(false);
            }
            repos.update(owner_name, current, &settings).await?;

            if !same_set(&prior.topics, &plan.topics) {
                let topics = plan.topics.clone().unwrap_or_default();
                repos.replace_topics(owner_name, &name, &topics).await?;
            }
            if let Some(enabled) = plan.vulnerability_alerts {
                if prior.vulnerability_alerts != Some(enabled) {
                    repos.set_vulnerability_alerts(owner_name, &name, enabled).await?;
                }
            }
            // Archived repositories reject writes, so archiving goes last.
            if archive && !was_archived {
                let request = UpdateRepoRequest {
                    archived: Some(true),
                    ..Default::default()
                };
                repos.update(owner_name, &name, &request).await?;
            }
        }

        let mut state = plan;
        state.id = Some(name.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &name))
    }

    async fn delete(&self, owner: &Owner, state: RepositoryModel) -> ProviderResult<()> {
        let owner_name = owner.name()?;
        let id = required(&state.id, "id")?;
        let repos = owner.client().repositories();

        if state.archive_on_destroy == Some(true) {
            if state.archived == Some(true) {
                tracing::debug!(repository = %id, "Repository already archived");
                return Ok(());
            }
            tracing::info!(repository = %id, "Archiving repository instead of deleting it");
            let request = UpdateRepoRequest {
                archived: Some(true),
                ..Default::default()
            };
            repos.update(owner_name, id, &request).await?;
            return Ok(());
        }

        repos.delete(owner_name, id).await?;
        Ok(())
    }
}

/// State of `github_repository_topics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryTopicsModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Topics.
    pub topics: Option<Vec<String>>,
}

/// `github_repository_topics`: owns the whole topic list of a repository.
pub struct RepositoryTopicsResource;

#[async_trait]
impl Resource for RepositoryTopicsResource {
    type Model = RepositoryTopicsModel;
    const TYPE_NAME: &'static str = "github_repository_topics";

    fn schema(&self) -> Schema {
        Schema::resource("Topics of a repository.")
            .with_attribute(
                "repository",
                Attribute::required(AttributeType::String).force_new(),
            )
            .with_attribute(
                "topics",
                Attribute::required(AttributeType::string_set()).validator(topic_validator()),
            )
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: RepositoryTopicsModel,
    ) -> ProviderResult<RepositoryTopicsModel> {
        let repository = required(&plan.repository, "repository")?.to_string();
        let topics = plan.topics.clone().unwrap_or_default();
        let names = owner
            .client()
            .repositories()
            .replace_topics(owner.name()?, &repository, &topics)
            .await?;

        Ok(RepositoryTopicsModel {
            id: Some(repository.clone()),
            repository: Some(repository),
            topics: Some(names),
        })
    }

    async fn read(
        &self,
        owner: &Owner,
        state: RepositoryTopicsModel,
    ) -> ProviderResult<Option<RepositoryTopicsModel>> {
        let id = required(&state.id, "id")?;
        let names = owner
            .client()
            .repositories()
            .get_topics(owner.name()?, id)
            .await?;

        Ok(Some(RepositoryTopicsModel {
            id: Some(id.to_string()),
            repository: Some(id.to_string()),
            topics: Some(names),
        }))
    }

    async fn update(
        &self,
        owner: &Owner,
        _prior: RepositoryTopicsModel,
        plan: RepositoryTopicsModel,
    ) -> ProviderResult<RepositoryTopicsModel> {
        self.create(owner, plan).await
    }

    async fn delete(&self, owner: &Owner, state: RepositoryTopicsModel) -> ProviderResult<()> {
        let id = required(&state.id, "id")?;
        owner
            .client()
            .repositories()
            .replace_topics(owner.name()?, id, &[])
            .await?;
        Ok(())
    }
}
