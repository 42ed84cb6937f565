//! Actions and Dependabot secrets, sealed to the scope's public key before
//! they leave the process.

use super::{required, vanished};
use crate::encryption::secret_payload;
use crate::errors::{ProviderError, ProviderResult};
use crate::ids::{build_two_part_id, parse_two_part_id};
use crate::provider::{Owner, Resource};
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use crate::services::{ActionsScope, PutSecretRequest, SecretStore};
use crate::types::Secret;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const SECRET_ID: &str = "repository:secret_name";

fn secret_name_attribute() -> Attribute {
    Attribute::required(AttributeType::String)
        .force_new()
        .validator(Validator::Regex {
            pattern: r"^[a-zA-Z_][a-zA-Z0-9_]*$",
            message: "may only contain alphanumeric characters or underscores and must not start with a number",
        })
        .validator(Validator::NotPrefix("GITHUB_"))
}

fn value_attributes(schema: Schema) -> Schema {
    schema
        .with_attribute(
            "plaintext_value",
            Attribute::optional(AttributeType::String)
                .sensitive()
                .force_new()
                .conflicts_with(&["encrypted_value"]),
        )
        .with_attribute(
            "encrypted_value",
            Attribute::optional(AttributeType::String)
                .sensitive()
                .force_new()
                .conflicts_with(&["plaintext_value"])
                .validator(Validator::Regex {
                    pattern: r"^[A-Za-z0-9+/]*={0,2}$",
                    message: "must be base64",
                }),
        )
        .with_attribute(
            "destroy_on_drift",
            Attribute::optional(AttributeType::Bool)
                .default_value(json!(true))
                .description("Recreate the secret when it was changed outside of Terraform."),
        )
        .with_attribute(
            "created_at",
            Attribute::computed(AttributeType::String).use_state_for_unknown(),
        )
        .with_attribute("updated_at", Attribute::computed(AttributeType::String))
}

/// Seals the configured value and writes it.
async fn put(
    owner: &Owner,
    scope: ActionsScope<'_>,
    store: SecretStore,
    name: &str,
    plaintext: Option<&str>,
    encrypted: Option<&str>,
    mut request: PutSecretRequest,
) -> ProviderResult<()> {
    let actions = owner.client().actions();
    let key = actions.get_public_key(scope, store).await?;
    request.encrypted_value = secret_payload(&key.key, plaintext, encrypted)?;
    request.key_id = key.key_id;
    actions.put_secret(scope, store, name, &request).await?;
    tracing::info!(secret = %name, "Stored secret");
    Ok(())
}

/// Returns true when the secret changed since `updated_at` was recorded.
fn drifted(recorded: Option<&str>, secret: &Secret) -> bool {
    matches!(recorded, Some(at) if !at.is_empty() && at != secret.updated_at)
}

/// State of a repository-level secret.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Repository name.
    pub repository: Option<String>,
    /// Secret name.
    pub secret_name: Option<String>,
    /// Value encrypted before upload.
    pub plaintext_value: Option<String>,
    /// Value already sealed for the repository public key, base64 encoded.
    pub encrypted_value: Option<String>,
    /// Recreate when the remote value changed outside of this provider.
    pub destroy_on_drift: Option<bool>,
    /// Creation timestamp.
    pub created_at: Option<String>,
    /// Last update timestamp.
    pub updated_at: Option<String>,
}

impl SecretModel {
    /// Applies drift handling to a freshly read secret. `None` drops the
    /// secret from state so that it is recreated.
    fn refresh(mut self, secret: Secret) -> Option<Self> {
        if drifted(self.updated_at.as_deref(), &secret) {
            if self.destroy_on_drift != Some(false) {
                tracing::warn!(
                    secret = %secret.name,
                    "Secret changed outside Terraform, recreating"
                );
                return None;
            }
            self.plaintext_value = None;
            self.encrypted_value = None;
        }
        self.secret_name = Some(secret.name);
        self.created_at = Some(secret.created_at);
        self.updated_at = Some(secret.updated_at);
        Some(self)
    }
}

async fn create_repository_secret(
    owner: &Owner,
    store: SecretStore,
    plan: &SecretModel,
) -> ProviderResult<String> {
    let repo = required(&plan.repository, "repository")?;
    let name = required(&plan.secret_name, "secret_name")?;
    put(
        owner,
        ActionsScope::Repository(owner.name()?, repo),
        store,
        name,
        plan.plaintext_value.as_deref(),
        plan.encrypted_value.as_deref(),
        PutSecretRequest::default(),
    )
    .await?;
    Ok(build_two_part_id(repo, name))
}

async fn read_repository_secret(
    owner: &Owner,
    store: SecretStore,
    state: SecretModel,
) -> ProviderResult<Option<SecretModel>> {
    let id = required(&state.id, "id")?.to_string();
    let (repo, name) = parse_two_part_id(&id, SECRET_ID)?;

    let secret = owner
        .client()
        .actions()
        .get_secret(ActionsScope::Repository(owner.name()?, repo), store, name)
        .await?;

    let repo = repo.to_string();
    Ok(secret.and_then(|s| {
        let mut state = state;
        state.repository = Some(repo);
        state.refresh(s)
    }))
}

async fn delete_repository_secret(
    owner: &Owner,
    store: SecretStore,
    state: &SecretModel,
) -> ProviderResult<()> {
    let id = required(&state.id, "id")?;
    let (repo, name) = parse_two_part_id(id, SECRET_ID)?;
    owner
        .client()
        .actions()
        .delete_secret(ActionsScope::Repository(owner.name()?, repo), store, name)
        .await?;
    Ok(())
}

fn repository_secret_schema(description: &str) -> Schema {
    value_attributes(
        Schema::resource(description)
            .with_attribute("repository", Attribute::required(AttributeType::String).force_new())
            .with_attribute("secret_name", secret_name_attribute()),
    )
}

/// `github_actions_secret`.
pub struct ActionsSecretResource;

#[async_trait]
impl Resource for ActionsSecretResource {
    type Model = SecretModel;
    const TYPE_NAME: &'static str = "github_actions_secret";

    fn schema(&self) -> Schema {
        repository_secret_schema("A GitHub Actions secret of a repository.")
    }

    async fn create(&self, owner: &Owner, plan: SecretModel) -> ProviderResult<SecretModel> {
        let id = create_repository_secret(owner, SecretStore::Actions, &plan).await?;
        let mut state = plan;
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn read(&self, owner: &Owner, state: SecretModel) -> ProviderResult<Option<SecretModel>> {
        read_repository_secret(owner, SecretStore::Actions, state).await
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: SecretModel,
        plan: SecretModel,
    ) -> ProviderResult<SecretModel> {
        let mut plan = plan;
        plan.id = prior.id;
        plan.updated_at = None;
        self.create(owner, plan).await
    }

    async fn delete(&self, owner: &Owner, state: SecretModel) -> ProviderResult<()> {
        delete_repository_secret(owner, SecretStore::Actions, &state).await
    }
}

/// `github_dependabot_secret`.
pub struct DependabotSecretResource;

#[async_trait]
impl Resource for DependabotSecretResource {
    type Model = SecretModel;
    const TYPE_NAME: &'static str = "github_dependabot_secret";

    fn schema(&self) -> Schema {
        repository_secret_schema("A Dependabot secret of a repository.")
    }

    async fn create(&self, owner: &Owner, plan: SecretModel) -> ProviderResult<SecretModel> {
        let id = create_repository_secret(owner, SecretStore::Dependabot, &plan).await?;
        let mut state = plan;
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn read(&self, owner: &Owner, state: SecretModel) -> ProviderResult<Option<SecretModel>> {
        read_repository_secret(owner, SecretStore::Dependabot, state).await
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: SecretModel,
        plan: SecretModel,
    ) -> ProviderResult<SecretModel> {
        let mut plan = plan;
        plan.id = prior.id;
        plan.updated_at = None;
        self.create(owner, plan).await
    }

    async fn delete(&self, owner: &Owner, state: SecretModel) -> ProviderResult<()> {
        delete_repository_secret(owner, SecretStore::Dependabot, &state).await
    }
}

/// State of `github_actions_organization_secret`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationSecretModel {
    /// Resource ID.
    pub id: Option<String>,
    /// Secret name.
    pub secret_name: Option<String>,
    /// Value encrypted before upload.
    pub plaintext_value: Option<String>,
    /// Value already sealed for the repository public key, base64 encoded.
    pub encrypted_value: Option<String>,
    /// Visibility.
    pub visibility: Option<String>,
    /// Repository IDs when visibility is `selected`.
    pub selected_repository_ids: Option<Vec<u64>>,
    /// Recreate when the remote value changed outside of this provider.
    pub destroy_on_drift: Option<bool>,
    /// Creation timestamp.
    pub created_at: Option<String>,
    /// Last update timestamp.
    pub updated_at: Option<String>,
}

/// Checks that repository ids are only given for `selected` visibility.
pub(crate) fn selected_repositories(
    visibility: Option<&str>,
    ids: &Option<Vec<u64>>,
) -> ProviderResult<Option<Vec<u64>>> {
    match (visibility, ids) {
        (Some("selected"), ids) => Ok(Some(ids.clone().unwrap_or_default())),
        (_, Some(ids)) if !ids.is_empty() => Err(ProviderError::Configuration(
            "selected_repository_ids requires visibility \"selected\"".to_string(),
        )),
        _ => Ok(None),
    }
}

/// `github_actions_organization_secret`.
pub struct ActionsOrganizationSecretResource;

#[async_trait]
impl Resource for ActionsOrganizationSecretResource {
    type Model = OrganizationSecretModel;
    const TYPE_NAME: &'static str = "github_actions_organization_secret";

    fn schema(&self) -> Schema {
        value_attributes(
            Schema::resource("A GitHub Actions secret shared across an organization.")
                .with_attribute("secret_name", secret_name_attribute())
                .with_attribute(
                    "visibility",
                    Attribute::required(AttributeType::String)
                        .validator(Validator::OneOf(vec!["all", "private", "selected"])),
                )
                .with_attribute(
                    "selected_repository_ids",
                    Attribute::optional(AttributeType::int_set()),
                ),
        )
    }

    async fn create(
        &self,
        owner: &Owner,
        plan: OrganizationSecretModel,
    ) -> ProviderResult<OrganizationSecretModel> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        let name = required(&plan.secret_name, "secret_name")?;
        let visibility = required(&plan.visibility, "visibility")?;

        let request = PutSecretRequest {
            visibility: Some(visibility.to_string()),
            selected_repository_ids: selected_repositories(
                Some(visibility),
                &plan.selected_repository_ids,
            )?,
            ..Default::default()
        };
        put(
            owner,
            ActionsScope::Organization(org),
            SecretStore::Actions,
            name,
            plan.plaintext_value.as_deref(),
            plan.encrypted_value.as_deref(),
            request,
        )
        .await?;

        let id = name.to_string();
        let mut state = plan.clone();
        state.id = Some(id.clone());
        self.read(owner, state)
            .await?
            .ok_or_else(|| vanished(Self::TYPE_NAME, &id))
    }

    async fn read(
        &self,
        owner: &Owner,
        state: OrganizationSecretModel,
    ) -> ProviderResult<Option<OrganizationSecretModel>> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        let id = required(&state.id, "id")?;
        let actions = owner.client().actions();

        let secret = match actions
            .get_secret(ActionsScope::Organization(org), SecretStore::Actions, id)
            .await?
        {
            Some(secret) => secret,
            None => return Ok(None),
        };

        let mut model = state.clone();
        if drifted(state.updated_at.as_deref(), &secret) {
            if state.destroy_on_drift != Some(false) {
                tracing::warn!(
                    secret = %secret.name,
                    "Organization secret changed outside Terraform, recreating"
                );
                return Ok(None);
            }
            model.plaintext_value = None;
            model.encrypted_value = None;
        }

        model.selected_repository_ids = match secret.visibility.as_deref() {
            Some("selected") => Some(
                actions
                    .list_secret_repositories(org, SecretStore::Actions, id)
                    .await?,
            ),
            _ => None,
        };
        model.secret_name = Some(secret.name);
        model.visibility = secret.visibility;
        model.created_at = Some(secret.created_at);
        model.updated_at = Some(secret.updated_at);
        Ok(Some(model))
    }

    async fn update(
        &self,
        owner: &Owner,
        prior: OrganizationSecretModel,
        plan: OrganizationSecretModel,
    ) -> ProviderResult<OrganizationSecretModel> {
        let mut plan = plan;
        plan.id = prior.id;
        plan.updated_at = None;
        self.create(owner, plan).await
    }

    async fn delete(&self, owner: &Owner, state: OrganizationSecretModel) -> ProviderResult<()> {
        let org = owner.require_organization(Self::TYPE_NAME)?;
        let id = required(&state.id, "id")?;
        owner
            .client()
            .actions()
            .delete_secret(ActionsScope::Organization(org), SecretStore::Actions, id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn secret(updated_at: &str) -> Secret {
        Secret {
            name: "DEPLOY_TOKEN".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: updated_at.into(),
            visibility: None,
        }
    }

    fn state(updated_at: &str, destroy_on_drift: bool) -> SecretModel {
        SecretModel {
            id: Some("api:DEPLOY_TOKEN".into()),
            plaintext_value: Some("v".into()),
            destroy_on_drift: Some(destroy_on_drift),
            updated_at: Some(updated_at.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_unchanged_secret_keeps_value() {
        let model = state("2024-02-01T00:00:00Z", true)
            .refresh(secret("2024-02-01T00:00:00Z"))
            .unwrap();
        assert_eq!(model.plaintext_value.as_deref(), Some("v"));
    }

    #[test]
    fn test_drift_removes_secret() {
        assert!(state("2024-02-01T00:00:00Z", true)
            .refresh(secret("2024-03-01T00:00:00Z"))
            .is_none());
    }

    #[test]
    fn test_drift_without_destroy_clears_value() {
        let model = state("2024-02-01T00:00:00Z", false)
            .refresh(secret("2024-03-01T00:00:00Z"))
            .unwrap();
        assert_eq!(model.plaintext_value, None);
        assert_eq!(model.updated_at.as_deref(), Some("2024-03-01T00:00:00Z"));
    }

    #[test]
    fn test_selected_repositories() {
        assert_eq!(selected_repositories(Some("selected"), &None).unwrap(), Some(vec![]));
        assert_eq!(
            selected_repositories(Some("selected"), &Some(vec![1, 2])).unwrap(),
            Some(vec![1, 2])
        );
        assert_eq!(selected_repositories(Some("all"), &Some(vec![])).unwrap(), None);
        assert!(selected_repositories(Some("private"), &Some(vec![3])).is_err());
    }

    #[test]
    fn test_secret_name_rejects_github_prefix() {
        let schema = ActionsSecretResource.schema();
        let diags = schema.validate(&json!({
            "repository": "api",
            "secret_name": "github_token",
            "plaintext_value": "x"
        }));
        assert!(diags.iter().any(|d| d.is_error()));
    }
}
