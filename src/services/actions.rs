//! GitHub Actions and Dependabot secrets and variables.

use crate::client::GitHubClient;
use crate::errors::GitHubResult;
use crate::types::{PublicKey, Repository, Secret, Variable};
use serde::Serialize;

/// Secret store a secret is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretStore {
    /// GitHub Actions secrets.
    Actions,
    /// Dependabot secrets.
    Dependabot,
}

impl SecretStore {
    fn segment(&self) -> &'static str {
        match self {
            Self::Actions => "actions",
            Self::Dependabot => "dependabot",
        }
    }
}

/// Account level a secret or variable is scoped to.
#[derive(Debug, Clone, Copy)]
pub enum ActionsScope<'s> {
    /// Repository scope (`owner`, `repo`).
    Repository(&'s str, &'s str),
    /// Organization scope.
    Organization(&'s str),
}

impl ActionsScope<'_> {
    fn prefix(&self) -> String {
        match self {
            Self::Repository(owner, repo) => format!("/repos/{}/{}", owner, repo),
            Self::Organization(org) => format!("/orgs/{}", org),
        }
    }

    fn secrets(&self, store: SecretStore) -> String {
        format!("{}/{}/secrets", self.prefix(), store.segment())
    }

    fn variables(&self) -> String {
        format!("{}/actions/variables", self.prefix())
    }
}

/// Service for Actions and Dependabot configuration.
pub struct ActionsService<'a> {
    client: &'a GitHubClient,
}

impl<'a> ActionsService<'a> {
    /// Creates a new actions service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    // Secrets

    /// Gets the public key used to encrypt secrets for a scope.
    pub async fn get_public_key(
        &self,
        scope: ActionsScope<'_>,
        store: SecretStore,
    ) -> GitHubResult<PublicKey> {
        self.client
            .get(&format!("{}/public-key", scope.secrets(store)))
            .await
    }

    /// Gets secret metadata, `None` when missing.
    pub async fn get_secret(
        &self,
        scope: ActionsScope<'_>,
        store: SecretStore,
        name: &str,
    ) -> GitHubResult<Option<Secret>> {
        self.client
            .get_optional(&format!("{}/{}", scope.secrets(store), name))
            .await
    }

    /// Creates or updates a secret with an already-encrypted value.
    pub async fn put_secret(
        &self,
        scope: ActionsScope<'_>,
        store: SecretStore,
        name: &str,
        request: &PutSecretRequest,
    ) -> GitHubResult<()> {
        self.client
            .put_no_response(&format!("{}/{}", scope.secrets(store), name), request)
            .await
    }

    /// Deletes a secret.
    pub async fn delete_secret(
        &self,
        scope: ActionsScope<'_>,
        store: SecretStore,
        name: &str,
    ) -> GitHubResult<()> {
        self.client
            .delete(&format!("{}/{}", scope.secrets(store), name))
            .await
    }

    /// Lists repositories selected for an organization secret.
    pub async fn list_secret_repositories(
        &self,
        org: &str,
        store: SecretStore,
        name: &str,
    ) -> GitHubResult<Vec<u64>> {
        let path = format!(
            "{}/{}/repositories",
            ActionsScope::Organization(org).secrets(store),
            name
        );
        let repos = self
            .client
            .get_all_wrapped::<Repository>(&path, "repositories")
            .await?;
        Ok(repos.into_iter().map(|r| r.id).collect())
    }

    // Variables

    /// Gets a variable, `None` when missing.
    pub async fn get_variable(
        &self,
        scope: ActionsScope<'_>,
        name: &str,
    ) -> GitHubResult<Option<Variable>> {
        self.client
            .get_optional(&format!("{}/{}", scope.variables(), name))
            .await
    }

    /// Creates a variable.
    pub async fn create_variable(
        &self,
        scope: ActionsScope<'_>,
        request: &VariableRequest,
    ) -> GitHubResult<()> {
        self.client
            .post_no_response(&scope.variables(), request)
            .await
    }

    /// Updates a variable.
    pub async fn update_variable(
        &self,
        scope: ActionsScope<'_>,
        name: &str,
        request: &VariableRequest,
    ) -> GitHubResult<()> {
        self.client
            .patch_no_response(&format!("{}/{}", scope.variables(), name), request)
            .await
    }

    /// Deletes a variable.
    pub async fn delete_variable(&self, scope: ActionsScope<'_>, name: &str) -> GitHubResult<()> {
        self.client
            .delete(&format!("{}/{}", scope.variables(), name))
            .await
    }

    /// Lists repositories selected for an organization variable.
    pub async fn list_variable_repositories(
        &self,
        org: &str,
        name: &str,
    ) -> GitHubResult<Vec<u64>> {
        let path = format!(
            "{}/{}/repositories",
            ActionsScope::Organization(org).variables(),
            name
        );
        let repos = self
            .client
            .get_all_wrapped::<Repository>(&path, "repositories")
            .await?;
        Ok(repos.into_iter().map(|r| r.id).collect())
    }
}

/// Request to create or update a secret.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PutSecretRequest {
    /// Encrypted value (base64 encoded sealed box).
    pub encrypted_value: String,
    /// Key ID used for encryption.
    pub key_id: String,
    /// Visibility (organization secrets only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    /// Selected repository IDs (visibility "selected" only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_repository_ids: Option<Vec<u64>>,
}

/// Request to create or update a variable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VariableRequest {
    /// Variable name.
    pub name: String,
    /// Variable value.
    pub value: String,
    /// Visibility (organization variables only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    /// Selected repository IDs (visibility "selected" only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_repository_ids: Option<Vec<u64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_paths() {
        assert_eq!(
            ActionsScope::Repository("o", "r").secrets(SecretStore::Actions),
            "/repos/o/r/actions/secrets"
        );
        assert_eq!(
            ActionsScope::Organization("acme").secrets(SecretStore::Dependabot),
            "/orgs/acme/dependabot/secrets"
        );
        assert_eq!(
            ActionsScope::Organization("acme").variables(),
            "/orgs/acme/actions/variables"
        );
    }
}
