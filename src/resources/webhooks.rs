//! Repository and organization webhooks.

use super::{required, vanished};
use crate::errors::ProviderResult;
use crate::ids::{parse_import_id, parse_u64};
use crate::provider::{Owner, Resource};
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use crate::services::{HookRequest, HookScope};
use crate::types::{Hook, HookConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const MASKED_SECRET: &str = "********";

/// Delivery configuration block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfigModel {
    /// Payload URL.
    pub url: String,
    /// Payload encoding (json, form).
    pub content_type: Option<String>,
    /// HMAC secret.
    pub secret: Option<String>,
    /// Skip TLS verification.
    pub insecure_ssl: bool,
}

/// State shared by both webhook resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookModel {
    /// Hook ID.
    pub id: Option<String>,
    /// Repository name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Events that trigger delivery.
    pub events: Option<Vec<String>>,
    /// Deliveries enabled.
    pub active: Option<bool>,
    /// Delivery settings.
    pub configuration: Option<WebhookConfigModel>,
    /// Hook API URL.
    pub url: Option<String>,
}

impl WebhookModel {
    fn request(&self, creating: bool) -> HookRequest {
        let config = self.configuration.clone().unwrap_or_default();
        HookRequest {
            name: creating.then(|| "web".to_string()),
            config: HookConfig {
                url: Some(config.url),
                content_type: config.content_type,
                secret: config.secret,
                insecure_ssl: Some(if config.insecure_ssl { "1" } else { "0" }.to_string()),
            },
            events: self.events.clone().unwrap_or_default(),
            active: self.active.unwrap_or(true),
        }
    }

    /// Builds state from the API. GitHub masks the secret, so the one in
    /// `prior` is kept.
    fn refresh(prior: &WebhookModel, hook: Hook) -> Self {
        let prior_secret = prior.configuration.as_ref().and_then(|c| c.secret.clone());
        let secret = match hook.config.secret {
            Some(s) if s == MASKED_SECRET => prior_secret,
            Some(s) => Some(s),
            None => None,
        };
        WebhookModel {
            id: Some(hook.id.to_string()),
            repository: prior.repository.clone(),
            events: Some(hook.events),
            active: Some(hook.active),
            configuration: Some(WebhookConfigModel {
                url: hook.config.url.unwrap_or_default(),
                content_type: hook.config.content_type,
                secret,
                insecure_ssl: hook.config.insecure_ssl.as_deref() == Some("1"),
            }),
            url: Some(hook.url),
        }
    }
}

fn webhook_schema(description: &str) -> Schema {
    Schema::resource(description)
        .with_attribute("events", Attribute::required(AttributeType::string_set()))
        .with_attribute(
            "active",
            Attribute::optional(AttributeType::Bool).default_value(json!(true)),
        )
        .with_attribute(
            "configuration",
            Attribute::optional(AttributeType::object([
                ("url", Attribute::required(AttributeType::String).sensitive()),
                (
                    "content_type",
                    Attribute::optional(AttributeType::String)
                        .validator(Validator::OneOf(vec!["json", "form"])),
                ),
                ("secret", Attribute::optional(AttributeType::String).sensitive()),
                (
                    "insecure_ssl",
                    Attribute::optional(AttributeType::Bool).default_value(json!(false)),
                ),
            ])),
        )
        .with_attribute("url", Attribute::computed(AttributeType::String))
}

async fn create_hook(
    scope: HookScope<'_>,
    owner: &Owner,
    plan: &WebhookModel,
) -> ProviderResult<String> {
    let hook = owner
        .client()
        .hooks()
        .create(scope, &plan.request(true))
        .await?;
    tracing::info!(id = hook.id, "Created webhook");
    Ok(hook.id.to_string())
}

async fn read_hook(
    scope: HookScope<'_>,
    owner: &Owner,
    state: &WebhookModel,
) -> ProviderResult<Option<WebhookModel>> {
    let id = required(&state.id, "id")?;
    let hook_id = parse_u64(id, id, "numeric webhook id")?;
    let hook = owner.client().hooks().get(scope, hook_id).await?;
    Ok(hook.map(|h| WebhookModel::refresh(state, h)))
}

async fn update_hook(
    scope: HookScope<'_>,
    owner: &Owner,
    plan: &WebhookModel,
) -> ProviderResult<()> {
    let id = required(&plan.id, "id")?;
    let hook_id = parse_u64(id, id, "numeric webhook id")?;
    owner
        .client()
        .hooks()
        .update(scope, hook_id, &plan.request(false))
        .await?;
    Ok(())
}

async fn delete_hook(
    scope: HookScope<'_>,
    owner: &Owner,
    state: &WebhookModel,
) -> ProviderResult<()> {
    let id = required(&state.id, "id")?;
    let hook_id = parse_u64(id, id, "numeric webhook id")?;
    owner.client().hooks().delete(scope, hook_id).await?;
    Ok(())
}

/// `github_repository_webhook`.
pub struct RepositoryWebhookResource;

#[async_trait]
impl Resource for RepositoryWebhookResource {
    type Model = WebhookModel;
    const TYPE_NAME: &'static str = "github_repository_webhook";

    fn schema(&self) -> Schema {
        webhook_schema("A repository webhook.")
            .with_attribute("repository", Attribute::required(AttributeType::String).force_new())
    }

    async fn create(&self, owner: &Owner, plan: WebhookModel) -> ProviderResult<WebhookModel> {
        let repo = required(&plan.repository, "repository")?;
        let id = create_hook(HookScope::Repository(owner.name()?, repo), owner, &plan).await?;

        let mut state = plan.clone();
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn read(
        &self,
        owner: &Owner,
        state: WebhookModel,
    ) -> ProviderResult<Option<WebhookModel>> {
        let repo = required(&state.repository, "repository")?;
        read_hook(HookScope::Repository(owner.name()?, repo), owner, &state).await
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: WebhookModel,
        plan: WebhookModel,
    ) -> ProviderResult<WebhookModel> {
        let mut plan = plan;
        plan.id = prior.id;
        let repo = required(&plan.repository, "repository")?;
        update_hook(HookScope::Repository(owner.name()?, repo), owner, &plan).await?;

        let id = plan.id.clone().unwrap_or_default();
        self.read(owner, plan)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn delete(&self, owner: &Owner, state: WebhookModel) -> ProviderResult<()> {
        let repo = required(&state.repository, "repository")?;
        delete_hook(HookScope::Repository(owner.name()?, repo), owner, &state).await
    }

    /// Accepts `repository/hookId`.
    async fn import(&self, _owner: &Owner, id: &str) -> ProviderResult<WebhookModel> {
        let (repo, hook_id) = parse_import_id(id, "repository/hookId")?;
        parse_u64(hook_id, id, "repository/hookId")?;
        Ok(WebhookModel {
            id: Some(hook_id.to_string()),
            repository: Some(repo.to_string()),
            ..Default::default()
        })
    }
}

/// `github_organization_webhook`.
pub struct OrganizationWebhookResource;

#[async_trait]
impl Resource for OrganizationWebhookResource {
    type Model = WebhookModel;
    const TYPE_NAME: &'static str = "github_organization_webhook";

    fn schema(&self) -> Schema {
        webhook_schema("An organization webhook.")
    }

    async fn create(&self, owner: &Owner, plan: WebhookModel) -> ProviderResult<WebhookModel> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        let id = create_hook(HookScope::Organization(org), owner, &plan).await?;

        let mut state = plan.clone();
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn read(
        &self,
        owner: &Owner,
        state: WebhookModel,
    ) -> ProviderResult<Option<WebhookModel>> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        read_hook(HookScope::Organization(org), owner, &state).await
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: WebhookModel,
        plan: WebhookModel,
    ) -> ProviderResult<WebhookModel> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        let mut plan = plan;
        plan.id = prior.id;
        update_hook(HookScope::Organization(org), owner, &plan).await?;

        let id = plan.id.clone().unwrap_or_default();
        self.read(owner, plan)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn delete(&self, owner: &Owner, state: WebhookModel) -> ProviderResult<()> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        delete_hook(HookScope::Organization(org), owner, &state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn model_with_secret(secret: &str) -> WebhookModel {
        WebhookModel {
            id: Some("12".into()),
            repository: Some("api".into()),
            configuration: Some(WebhookConfigModel {
                url: "https://ci.example.com/hook".into(),
                secret: Some(secret.into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_masked_secret_kept_from_state() {
        let hook = Hook {
            id: 12,
            active: true,
            events: vec!["push".into()],
            config: HookConfig {
                url: Some("https://ci.example.com/hook".into()),
                secret: Some(MASKED_SECRET.into()),
                insecure_ssl: Some("0".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let refreshed = WebhookModel::refresh(&model_with_secret("s3cret"), hook);
        let config = refreshed.configuration.unwrap();
        assert_eq!(config.secret.as_deref(), Some("s3cret"));
        assert!(!config.insecure_ssl);
        assert_eq!(refreshed.repository.as_deref(), Some("api"));
    }

    #[test]
    fn test_request_encodes_insecure_ssl() {
        let mut model = model_with_secret("s");
        if let Some(c) = model.configuration.as_mut() {
            c.insecure_ssl = true;
        }
        let request = model.request(true);
        assert_eq!(request.name.as_deref(), Some("web"));
        assert_eq!(request.config.insecure_ssl.as_deref(), Some("1"));
        assert!(request.active);
        assert!(model.request(false).name.is_none());
    }

    #[test]
    fn test_org_state_omits_repository() {
        let value = serde_json::to_value(WebhookModel::default()).unwrap();
        assert!(value.get("repository").is_none());
    }
}
