//! The account resources are managed under.

use crate::client::GitHubClient;
use crate::errors::{ProviderError, ProviderResult};
use std::sync::Arc;

/// Configured account plus the API client, passed to every resource
/// operation.
#[derive(Clone)]
pub struct Owner {
    name: Option<String>,
    id: Option<u64>,
    is_organization: bool,
    client: Arc<GitHubClient>,
}

impl std::fmt::Debug for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Owner")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("is_organization", &self.is_organization)
            .finish()
    }
}

impl Owner {
    /// Creates an owner handle without contacting GitHub.
    pub fn new(
        client: Arc<GitHubClient>,
        name: Option<String>,
        id: Option<u64>,
        is_organization: bool,
    ) -> Self {
        Self {
            name,
            id,
            is_organization,
            client,
        }
    }

    /// Resolves the owner account.
    ///
    /// An explicit owner is looked up as an organization first, then as a
    /// user. Without one, an authenticated client uses the token's login and
    /// an anonymous client has no owner.
    pub async fn resolve(
        client: Arc<GitHubClient>,
        configured: Option<&str>,
    ) -> ProviderResult<Self> {
        let owner = match configured {
            Some(name) => match client.organizations().get_optional(name).await? {
                Some(org) => {
                    tracing::debug!(owner = %org.login, id = org.id, "Owner is an organization");
                    Self::new(client.clone(), Some(org.login), Some(org.id), true)
                }
                None => {
                    let user = client.users().get(name).await?;
                    let id = user.as_ref().map(|u| u.id);
                    if user.is_none() {
                        tracing::warn!(owner = %name, "Owner not found as organization or user");
                    }
                    Self::new(client.clone(), Some(name.to_string()), id, false)
                }
            },
            None if client.is_anonymous() => {
                tracing::info!("Anonymous access, no owner configured");
                Self::new(client.clone(), None, None, false)
            }
            None => {
                let user = client.users().get_authenticated().await?;
                tracing::debug!(owner = %user.login, "Owner is the authenticated user");
                Self::new(client.clone(), Some(user.login), Some(user.id), false)
            }
        };
        Ok(owner)
    }

    /// Owner login; fails when no owner could be determined.
    pub fn name(&self) -> ProviderResult<&str> {
        self.name.as_deref().ok_or_else(|| {
            ProviderError::Configuration(
                "an owner is required: set `owner`, GITHUB_OWNER or a token".to_string(),
            )
        })
    }

    /// Numeric account id, when known.
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    /// True when the owner is an organization.
    pub fn is_organization(&self) -> bool {
        self.is_organization
    }

    /// Organization login, or a "requires organization" error for users.
    pub fn require_organization(&self, type_name: &'static str) -> ProviderResult<&str> {
        let name = self.name()?;
        if self.is_organization {
            Ok(name)
        } else {
            Err(ProviderError::RequiresOrganization(type_name, name.to_string()))
        }
    }

    /// Organization id, needed by the id-based team endpoints.
    pub fn org_id(&self, type_name: &'static str) -> ProviderResult<u64> {
        self.require_organization(type_name)?;
        self.id.ok_or_else(|| {
            ProviderError::Configuration("organization id was not resolved".to_string())
        })
    }

    /// API client.
    pub fn client(&self) -> &GitHubClient {
        &self.client
    }
}
