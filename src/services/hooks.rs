//! Repository and organization webhooks.

use crate::client::GitHubClient;
use crate::errors::GitHubResult;
use crate::types::{Hook, HookConfig};
use serde::Serialize;

/// Where a webhook lives.
#[derive(Debug, Clone, Copy)]
pub enum HookScope<'s> {
    /// Repository webhook (`owner`, `repo`).
    Repository(&'s str, &'s str),
    /// Organization webhook.
    Organization(&'s str),
}

impl HookScope<'_> {
    fn base(&self) -> String {
        match self {
            Self::Repository(owner, repo) => format!("/repos/{}/{}/hooks", owner, repo),
            Self::Organization(org) => format!("/orgs/{}/hooks", org),
        }
    }
}

/// Service for webhook operations.
pub struct HooksService<'a> {
    client: &'a GitHubClient,
}

impl<'a> HooksService<'a> {
    /// Creates a new hooks service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Creates a webhook.
    pub async fn create(&self, scope: HookScope<'_>, request: &HookRequest) -> GitHubResult<Hook> {
        self.client.post(&scope.base(), request).await
    }

    /// Gets a webhook, `None` when missing.
    pub async fn get(&self, scope: HookScope<'_>, id: u64) -> GitHubResult<Option<Hook>> {
        self.client
            .get_optional(&format!("{}/{}", scope.base(), id))
            .await
    }

    /// Updates a webhook.
    pub async fn update(
        &self,
        scope: HookScope<'_>,
        id: u64,
        request: &HookRequest,
    ) -> GitHubResult<Hook> {
        self.client
            .patch(&format!("{}/{}", scope.base(), id), request)
            .await
    }

    /// Deletes a webhook.
    pub async fn delete(&self, scope: HookScope<'_>, id: u64) -> GitHubResult<()> {
        self.client.delete(&format!("{}/{}", scope.base(), id)).await
    }
}

/// Request to create or update a webhook.
#[derive(Debug, Clone, Serialize)]
pub struct HookRequest {
    /// Always "web" on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Delivery configuration.
    pub config: HookConfig,
    /// Subscribed events.
    pub events: Vec<String>,
    /// Whether the hook is active.
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_paths() {
        assert_eq!(HookScope::Repository("o", "r").base(), "/repos/o/r/hooks");
        assert_eq!(HookScope::Organization("acme").base(), "/orgs/acme/hooks");
    }
}
