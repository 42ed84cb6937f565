//! `github_user`.

use super::not_found;
use crate::errors::ProviderResult;
use crate::provider::{DataSource, Owner};
use crate::schema::{Attribute, AttributeType, Schema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Output of `github_user`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserModel {
    /// User ID.
    pub id: Option<String>,
    /// Login to look up.
    pub username: Option<String>,
    /// Login as reported by the API.
    pub login: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Public email.
    pub email: Option<String>,
    /// Company.
    pub company: Option<String>,
    /// Blog URL.
    pub blog: Option<String>,
    /// Location.
    pub location: Option<String>,
    /// Biography.
    pub bio: Option<String>,
    /// Avatar URL.
    pub avatar_url: Option<String>,
    /// Gravatar ID.
    pub gravatar_id: Option<String>,
    /// GraphQL node ID.
    pub node_id: Option<String>,
    /// Site administrator flag.
    pub site_admin: Option<bool>,
    /// Public repository count.
    pub public_repos: Option<u64>,
    /// Public gist count.
    pub public_gists: Option<u64>,
    /// Follower count.
    pub followers: Option<u64>,
    /// Following count.
    pub following: Option<u64>,
    /// Creation timestamp.
    pub created_at: Option<String>,
    /// Last update timestamp.
    pub updated_at: Option<String>,
    /// Public SSH keys.
    pub ssh_keys: Option<Vec<String>>,
}

/// `github_user`. An empty `username` selects the authenticated user.
pub struct UserDataSource;

#[async_trait]
impl DataSource for UserDataSource {
    type Model = UserModel;
    const TYPE_NAME: &'static str = "github_user";

    fn schema(&self) -> Schema {
        let mut schema = Schema::data_source("A GitHub user.")
            .with_attribute("username", Attribute::required(AttributeType::String))
            .with_attribute("ssh_keys", Attribute::computed(AttributeType::string_list()));
        for name in [
            "login",
            "name",
            "email",
            "company",
            "blog",
            "location",
            "bio",
            "avatar_url",
            "gravatar_id",
            "node_id",
            "created_at",
            "updated_at",
        ] {
            schema = schema.with_attribute(name, Attribute::computed(AttributeType::String));
        }
        for name in ["public_repos", "public_gists", "followers", "following"] {
            schema = schema.with_attribute(name, Attribute::computed(AttributeType::Int));
        }
        schema.with_attribute("site_admin", Attribute::computed(AttributeType::Bool))
    }

    async fn read(&self, owner: &Owner, config: UserModel) -> ProviderResult<UserModel> {
        let users = owner.client().users();
        let username = config.username.clone().unwrap_or_default();

        let profile = if username.is_empty() {
            users.get_authenticated().await?
        } else {
            users
                .get(&username)
                .await?
                .ok_or_else(|| not_found(Self::TYPE_NAME, &username))?
        };
        let ssh_keys = users
            .list_keys_for_user(&profile.login)
            .await?
            .into_iter()
            .map(|k| k.key)
            .collect();

        Ok(UserModel {
            id: Some(profile.id.to_string()),
            username: Some(username),
            login: Some(profile.login),
            name: profile.name,
            email: profile.email,
            company: profile.company,
            blog: profile.blog,
            location: profile.location,
            bio: profile.bio,
            avatar_url: Some(profile.avatar_url),
            gravatar_id: profile.gravatar_id,
            node_id: Some(profile.node_id),
            site_admin: Some(profile.site_admin),
            public_repos: Some(profile.public_repos),
            public_gists: Some(profile.public_gists),
            followers: Some(profile.followers),
            following: Some(profile.following),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
            ssh_keys: Some(ssh_keys),
        })
    }
}
