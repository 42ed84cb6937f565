//! The provider: configuration, type registry and the resource lifecycle.
//!
//! ```rust,no_run
//! use serde_json::json;
//! use terraform_provider_github::Provider;
//!
//! # async fn run() -> Result<(), terraform_provider_github::ProviderError> {
//! let provider = Provider::new();
//! provider.configure(&json!({"owner": "acme"})).await?;
//!
//! let config = json!({"name": "widgets", "visibility": "private"});
//! let plan = provider.plan_resource_change("github_repository", None, Some(&config))?;
//! let state = provider.apply_plan("github_repository", None, &plan).await?;
//! # let _ = state;
//! # Ok(())
//! # }
//! ```

mod owner;
mod plan;
mod traits;

pub use owner::Owner;
pub use plan::{plan, AttributeChange, PlanAction, PlanResult};
pub use traits::{DataSource, DynDataSource, DynResource, Resource};

use crate::auth::{default_sources, resolve_auth};
use crate::client::GitHubClient;
use crate::config::ProviderConfig;
use crate::errors::{Diagnostic, ProviderError, ProviderResult};
use crate::observability::TracingHooks;
use crate::schema::{Attribute, AttributeType, ProviderSchema, Schema, Validator};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// GitHub provider.
pub struct Provider {
    resources: BTreeMap<&'static str, Arc<dyn DynResource>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DynDataSource>>,
    owner: RwLock<Option<Owner>>,
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider {
    /// Creates a provider with every resource and data source registered.
    pub fn new() -> Self {
        let resources = crate::resources::all()
            .into_iter()
            .map(|r| (r.type_name(), r))
            .collect();
        let data_sources = crate::data_sources::all()
            .into_iter()
            .map(|d| (d.type_name(), d))
            .collect();

        Self {
            resources,
            data_sources,
            owner: RwLock::new(None),
        }
    }

    /// Registered resource type names.
    pub fn resource_types(&self) -> Vec<&'static str> {
        self.resources.keys().copied().collect()
    }

    /// Registered data source type names.
    pub fn data_source_types(&self) -> Vec<&'static str> {
        self.data_sources.keys().copied().collect()
    }

    /// Provider block schema.
    pub fn provider_schema() -> Schema {
        Schema::new("GitHub provider configuration.")
            .with_attribute(
                "token",
                Attribute::optional(AttributeType::String)
                    .sensitive()
                    .description("OAuth or personal access token. Falls back to GITHUB_TOKEN, then `gh auth token`."),
            )
            .with_attribute(
                "owner",
                Attribute::optional(AttributeType::String)
                    .description("Account to manage. Falls back to GITHUB_OWNER."),
            )
            .with_attribute(
                "organization",
                Attribute::optional(AttributeType::String)
                    .deprecated("Use \"owner\" instead.")
                    .conflicts_with(&["owner"]),
            )
            .with_attribute(
                "base_url",
                Attribute::optional(AttributeType::String)
                    .description("API base URL. Falls back to GITHUB_BASE_URL.")
                    .validator(Validator::Regex {
                        pattern: "^https?://",
                        message: "base_url must start with http:// or https://",
                    }),
            )
            .with_attribute("insecure", Attribute::optional(AttributeType::Bool))
            .with_attribute(
                "max_retries",
                Attribute::optional(AttributeType::Int).validator(Validator::IntBetween(0, 100)),
            )
            .with_attribute(
                "retry_delay_ms",
                Attribute::optional(AttributeType::Int)
                    .validator(Validator::IntBetween(0, i64::MAX)),
            )
            .with_attribute(
                "retryable_errors",
                Attribute::optional(AttributeType::List(Box::new(AttributeType::Int))),
            )
            .with_attribute(
                "write_delay_ms",
                Attribute::optional(AttributeType::Int)
                    .validator(Validator::IntBetween(1, i64::MAX)),
            )
            .with_attribute(
                "read_delay_ms",
                Attribute::optional(AttributeType::Int)
                    .validator(Validator::IntBetween(0, i64::MAX)),
            )
            .with_attribute("parallel_requests", Attribute::optional(AttributeType::Bool))
    }

    /// Full schema.
    pub fn schema(&self) -> ProviderSchema {
        ProviderSchema {
            provider: Self::provider_schema(),
            resources: self
                .resources
                .iter()
                .map(|(name, r)| (name.to_string(), r.resource_schema()))
                .collect(),
            data_sources: self
                .data_sources
                .iter()
                .map(|(name, d)| (name.to_string(), d.data_source_schema()))
                .collect(),
        }
    }

    /// Configures the provider from a provider block.
    pub async fn configure(&self, config: &Value) -> ProviderResult<()> {
        fail_on_errors(Self::provider_schema().validate(config))?;
        let config = ProviderConfig::from_value(config)?;
        self.configure_with(config).await
    }

    /// Configures the provider from an already built configuration.
    pub async fn configure_with(&self, config: ProviderConfig) -> ProviderResult<()> {
        let sources = default_sources(config.token.clone(), &config.hostname());
        let auth = resolve_auth(&sources).await?;
        let owner_name = config.owner.clone();

        tracing::info!(
            base_url = %config.rest_url(),
            auth = auth.token_prefix(),
            owner = owner_name.as_deref().unwrap_or(""),
            parallel_requests = config.throttle.parallel_requests,
            "Configuring GitHub provider"
        );

        let client = Arc::new(GitHubClient::new(config, auth)?);
        let owner = Owner::resolve(client, owner_name.as_deref()).await?;
        *self.owner.write().await = Some(owner);
        Ok(())
    }

    /// The configured owner.
    pub async fn owner(&self) -> ProviderResult<Owner> {
        self.owner
            .read()
            .await
            .clone()
            .ok_or(ProviderError::NotConfigured)
    }

    fn resource(&self, type_name: &str) -> ProviderResult<&Arc<dyn DynResource>> {
        self.resources.get(type_name).ok_or_else(|| ProviderError::UnknownType {
            kind: "resource",
            name: type_name.to_string(),
        })
    }

    fn data_source(&self, type_name: &str) -> ProviderResult<&Arc<dyn DynDataSource>> {
        self.data_sources.get(type_name).ok_or_else(|| ProviderError::UnknownType {
            kind: "data source",
            name: type_name.to_string(),
        })
    }

    /// Validates resource configuration.
    pub fn validate_resource_config(
        &self,
        type_name: &str,
        config: &Value,
    ) -> ProviderResult<Vec<Diagnostic>> {
        Ok(self.resource(type_name)?.resource_schema().validate(config))
    }

    /// Validates data source configuration.
    pub fn validate_data_source_config(
        &self,
        type_name: &str,
        config: &Value,
    ) -> ProviderResult<Vec<Diagnostic>> {
        Ok(self.data_source(type_name)?.data_source_schema().validate(config))
    }

    /// Plans a change from `prior` state to `config`. `config == None`
    /// plans destruction.
    pub fn plan_resource_change(
        &self,
        type_name: &str,
        prior: Option<&Value>,
        config: Option<&Value>,
    ) -> ProviderResult<PlanResult> {
        let schema = self.resource(type_name)?.resource_schema();
        let mut diagnostics = Vec::new();
        if let Some(config) = config.filter(|c| !c.is_null()) {
            diagnostics = schema.validate(config);
            fail_on_errors(diagnostics.clone())?;
        }

        let mut result = plan(&schema, prior, config);
        result.diagnostics = diagnostics;

        tracing::debug!(
            resource = type_name,
            action = %result.action,
            changes = result.changes.len(),
            "Planned resource change"
        );
        Ok(result)
    }

    /// Applies a single create, update or delete.
    ///
    /// No prior state creates, `planned == null` deletes, anything else
    /// updates. Returns the new state, `null` after delete.
    pub async fn apply_resource_change(
        &self,
        type_name: &str,
        prior: Option<&Value>,
        planned: &Value,
    ) -> ProviderResult<Value> {
        let resource = self.resource(type_name)?;
        let owner = self.owner().await?;
        let prior = prior.filter(|p| !p.is_null());

        match (prior, planned.is_null()) {
            (None, true) => Ok(Value::Null),
            (Some(prior), true) => {
                tracing::info!(resource = type_name, id = %state_id(prior), "Deleting");
                resource.delete_value(&owner, prior.clone()).await?;
                Ok(Value::Null)
            }
            (None, false) => {
                tracing::info!(resource = type_name, "Creating");
                resource.create_value(&owner, planned.clone()).await
            }
            (Some(prior), false) => {
                tracing::info!(resource = type_name, id = %state_id(prior), "Updating");
                resource
                    .update_value(&owner, prior.clone(), planned.clone())
                    .await
            }
        }
    }

    /// Applies a plan. Replacement deletes the old object, then creates the
    /// new one.
    pub async fn apply_plan(
        &self,
        type_name: &str,
        prior: Option<&Value>,
        plan: &PlanResult,
    ) -> ProviderResult<Value> {
        match plan.action {
            PlanAction::NoOp => Ok(prior.cloned().unwrap_or(Value::Null)),
            PlanAction::Create => {
                self.apply_resource_change(type_name, None, &plan.planned_state)
                    .await
            }
            PlanAction::Update => {
                self.apply_resource_change(type_name, prior, &plan.planned_state)
                    .await
            }
            PlanAction::Delete => {
                self.apply_resource_change(type_name, prior, &Value::Null)
                    .await
            }
            PlanAction::Replace => {
                self.apply_resource_change(type_name, prior, &Value::Null)
                    .await?;
                self.apply_resource_change(type_name, None, &plan.planned_state)
                    .await
            }
        }
    }

    /// Refreshes state. `None` means the object no longer exists and must be
    /// removed from state.
    pub async fn read_resource(
        &self,
        type_name: &str,
        state: &Value,
    ) -> ProviderResult<Option<Value>> {
        let resource = self.resource(type_name)?;
        let owner = self.owner().await?;

        match resource.read_value(&owner, state.clone()).await {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => {
                TracingHooks::on_removed_from_state(type_name, &state_id(state));
                Ok(None)
            }
            Err(e) if e.is_not_found() => {
                TracingHooks::on_removed_from_state(type_name, &state_id(state));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Imports an existing object by ID.
    pub async fn import_resource_state(&self, type_name: &str, id: &str) -> ProviderResult<Value> {
        let resource = self.resource(type_name)?;
        let owner = self.owner().await?;

        tracing::info!(resource = type_name, id = id, "Importing");
        let partial = resource.import_value(&owner, id).await?;
        match resource.read_value(&owner, partial).await {
            Ok(Some(state)) => Ok(state),
            Ok(None) => Err(ProviderError::ImportNotFound(id.to_string())),
            Err(e) if e.is_not_found() => Err(ProviderError::ImportNotFound(id.to_string())),
            Err(e) => Err(e),
        }
    }

    /// Reads a data source.
    pub async fn read_data_source(&self, type_name: &str, config: &Value) -> ProviderResult<Value> {
        let data_source = self.data_source(type_name)?;
        fail_on_errors(data_source.data_source_schema().validate(config))?;
        let owner = self.owner().await?;
        data_source.read_value(&owner, config.clone()).await
    }
}

fn fail_on_errors(diagnostics: Vec<Diagnostic>) -> ProviderResult<()> {
    for warning in diagnostics.iter().filter(|d| !d.is_error()) {
        tracing::warn!(%warning, "Configuration warning");
    }
    let errors: Vec<Diagnostic> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ProviderError::Validation(errors))
    }
}

fn state_id(state: &Value) -> String {
    match state.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_is_complete() {
        let provider = Provider::new();
        assert_eq!(provider.resource_types().len(), 28);
        assert_eq!(provider.data_source_types().len(), 12);
        assert!(provider.resource_types().contains(&"github_repository"));
        assert!(provider.data_source_types().contains(&"github_ip_ranges"));
    }

    #[test]
    fn test_unknown_type() {
        let provider = Provider::new();
        let err = provider
            .plan_resource_change("github_nope", None, Some(&json!({})))
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownType { kind: "resource", .. }));
    }

    #[test]
    fn test_plan_rejects_invalid_config() {
        let provider = Provider::new();
        let err = provider
            .plan_resource_change("github_issue_label", None, Some(&json!({"repository": "r"})))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[test]
    fn test_provider_schema_validation() {
        let diags = Provider::provider_schema().validate(&json!({"write_delay_ms": 0}));
        assert!(diags.iter().any(|d| d.is_error()));

        let diags = Provider::provider_schema().validate(&json!({"organization": "acme"}));
        assert!(diags.iter().all(|d| !d.is_error()));
        assert_eq!(diags.len(), 1);
    }

    #[tokio::test]
    async fn test_requires_configure() {
        let provider = Provider::new();
        let err = provider
            .read_resource("github_repository", &json!({"id": "r"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured));
    }

    #[test]
    fn test_every_schema_has_id() {
        let schema = Provider::new().schema();
        for (name, s) in schema.resources.iter().chain(schema.data_sources.iter()) {
            assert!(s.attribute("id").is_some(), "{} has no id", name);
        }
    }
}
