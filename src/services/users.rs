//! User and SSH key operations.

use crate::client::GitHubClient;
use crate::errors::GitHubResult;
use crate::services::CreateKeyRequest;
use crate::types::{Key, UserProfile};

/// Service for user operations.
pub struct UsersService<'a> {
    client: &'a GitHubClient,
}

impl<'a> UsersService<'a> {
    /// Creates a new users service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Gets the authenticated user.
    pub async fn get_authenticated(&self) -> GitHubResult<UserProfile> {
        self.client.get("/user").await
    }

    /// Gets a user by username, `None` when missing.
    pub async fn get(&self, username: &str) -> GitHubResult<Option<UserProfile>> {
        self.client.get_optional(&format!("/users/{}", username)).await
    }

    /// Lists public SSH keys of a user.
    pub async fn list_keys_for_user(&self, username: &str) -> GitHubResult<Vec<Key>> {
        self.client.get_all(&format!("/users/{}/keys", username)).await
    }

    // SSH keys of the authenticated user

    /// Gets an SSH key, `None` when missing.
    pub async fn get_ssh_key(&self, key_id: u64) -> GitHubResult<Option<Key>> {
        self.client.get_optional(&format!("/user/keys/{}", key_id)).await
    }

    /// Adds an SSH key.
    pub async fn create_ssh_key(&self, request: &CreateKeyRequest) -> GitHubResult<Key> {
        self.client.post("/user/keys", request).await
    }

    /// Deletes an SSH key.
    pub async fn delete_ssh_key(&self, key_id: u64) -> GitHubResult<()> {
        self.client.delete(&format!("/user/keys/{}", key_id)).await
    }
}
