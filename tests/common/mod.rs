//! Shared helpers for tests against a mocked GitHub Enterprise endpoint.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::time::Duration;
use terraform_provider_github::{Provider, ProviderConfig, RetryConfig, ThrottleConfig};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const OWNER: &str = "acme";
pub const TOKEN: &str = "test-token";

/// Builds a configuration for `server` with fast retries and pacing.
pub fn config_for(server: &MockServer, owner: &str, max_retries: u32) -> ProviderConfig {
    ProviderConfig::builder()
        .token(TOKEN)
        .owner(owner)
        .base_url(server.uri())
        .retry(RetryConfig {
            max_retries,
            retry_delay: Duration::from_millis(1),
            ..Default::default()
        })
        .throttle(ThrottleConfig {
            write_delay: Duration::from_millis(1),
            ..Default::default()
        })
        .build()
        .expect("valid test configuration")
}

/// Mounts the owner lookup for the `acme` organization.
pub async fn mount_organization(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v3/orgs/{}", OWNER)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "login": OWNER,
            "node_id": "O_kgDO"
        })))
        .mount(server)
        .await;
}

/// Starts a mock server and a provider configured for the `acme`
/// organization.
pub async fn setup() -> (MockServer, Provider) {
    setup_with_retries(0).await
}

/// Like [`setup`] with `max_retries` retries per request.
pub async fn setup_with_retries(max_retries: u32) -> (MockServer, Provider) {
    let server = MockServer::start().await;
    mount_organization(&server).await;

    let provider = Provider::new();
    provider
        .configure_with(config_for(&server, OWNER, max_retries))
        .await
        .expect("provider configures");
    (server, provider)
}

/// Mock for `verb path` carrying the test token.
pub fn authed(verb: &str, route: impl Into<String>) -> wiremock::MockBuilder {
    Mock::given(method(verb))
        .and(path(route.into()))
        .and(header("Authorization", format!("Bearer {}", TOKEN).as_str()))
}

/// Mock for `verb path` without any header requirement.
pub fn api(verb: &str, route: impl Into<String>) -> wiremock::MockBuilder {
    Mock::given(method(verb)).and(path(route.into()))
}

/// JSON response helper.
pub fn json_response(status: u16, body: Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(body)
}

/// GitHub error body.
pub fn error_response(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "message": message,
        "documentation_url": "https://docs.github.com/rest"
    }))
}

/// A repository as returned by the REST API.
pub fn repository_json(name: &str) -> Value {
    json!({
        "id": 1296269,
        "node_id": "R_kgDO",
        "name": name,
        "full_name": format!("{}/{}", OWNER, name),
        "owner": { "id": 1, "login": OWNER },
        "private": true,
        "visibility": "private",
        "description": "Widgets",
        "homepage": "",
        "html_url": format!("https://github.example.com/{}/{}", OWNER, name),
        "clone_url": format!("https://github.example.com/{}/{}.git", OWNER, name),
        "ssh_url": format!("git@github.example.com:{}/{}.git", OWNER, name),
        "git_url": format!("git://github.example.com/{}/{}.git", OWNER, name),
        "svn_url": format!("https://github.example.com/{}/{}", OWNER, name),
        "default_branch": "main",
        "topics": [],
        "has_issues": true,
        "has_discussions": false,
        "has_projects": false,
        "has_wiki": false,
        "is_template": false,
        "allow_merge_commit": true,
        "allow_squash_merge": true,
        "allow_rebase_merge": true,
        "allow_auto_merge": false,
        "delete_branch_on_merge": false,
        "archived": false
    })
}
