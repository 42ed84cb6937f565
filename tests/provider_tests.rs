//! Provider configuration, owner resolution and the repository lifecycle
//! against a mocked GitHub Enterprise API.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use terraform_provider_github::{PlanAction, Provider, ProviderError};
use wiremock::{MockServer, ResponseTemplate};

#[tokio::test]
async fn test_configure_resolves_organization_owner() {
    let (_server, provider) = setup().await;

    let owner = provider.owner().await.unwrap();
    assert_eq!(owner.name().unwrap(), OWNER);
    assert_eq!(owner.id(), Some(1));
    assert!(owner.is_organization());
}

#[tokio::test]
async fn test_configure_falls_back_to_user_owner() {
    let server = MockServer::start().await;
    api("GET", "/api/v3/orgs/octocat")
        .respond_with(error_response(404, "Not Found"))
        .mount(&server)
        .await;
    api("GET", "/api/v3/users/octocat")
        .respond_with(json_response(200, json!({"id": 583231, "login": "octocat"})))
        .mount(&server)
        .await;

    let provider = Provider::new();
    provider
        .configure_with(config_for(&server, "octocat", 0))
        .await
        .unwrap();

    let owner = provider.owner().await.unwrap();
    assert_eq!(owner.name().unwrap(), "octocat");
    assert_eq!(owner.id(), Some(583231));
    assert!(!owner.is_organization());

    let err = provider
        .read_data_source("github_organization_teams", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::RequiresOrganization(..)));
}

#[tokio::test]
async fn test_configure_rejects_invalid_provider_block() {
    let provider = Provider::new();
    let err = provider
        .configure(&json!({"base_url": "ftp://example.com", "token": "t"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Validation(_)));
}

#[tokio::test]
async fn test_repository_lifecycle() {
    let (server, provider) = setup().await;

    authed("POST", "/api/v3/orgs/acme/repos")
        .respond_with(json_response(201, repository_json("widgets")))
        .expect(1)
        .mount(&server)
        .await;
    authed("GET", "/api/v3/repos/acme/widgets")
        .respond_with(json_response(200, repository_json("widgets")))
        .mount(&server)
        .await;
    api("GET", "/api/v3/repos/acme/widgets/vulnerability-alerts")
        .respond_with(error_response(404, "Not Found"))
        .mount(&server)
        .await;

    let config = json!({
        "name": "widgets",
        "description": "Widgets",
        "visibility": "private",
        "has_issues": true
    });
    let plan = provider
        .plan_resource_change("github_repository", None, Some(&config))
        .unwrap();
    assert_eq!(plan.action, PlanAction::Create);
    assert!(plan.unknown.contains(&"full_name".to_string()));

    let state = provider
        .apply_plan("github_repository", None, &plan)
        .await
        .unwrap();
    assert_eq!(state["id"], "widgets");
    assert_eq!(state["full_name"], "acme/widgets");
    assert_eq!(state["default_branch"], "main");
    assert_eq!(state["vulnerability_alerts"], false);
    assert_eq!(state["repo_id"], 1296269);

    // Refreshing an unchanged repository plans nothing.
    let refreshed = provider
        .read_resource("github_repository", &state)
        .await
        .unwrap()
        .unwrap();
    let plan = provider
        .plan_resource_change("github_repository", Some(&refreshed), Some(&config))
        .unwrap();
    assert_eq!(plan.action, PlanAction::NoOp);

    api("PATCH", "/api/v3/repos/acme/widgets")
        .respond_with(json_response(200, repository_json("widgets")))
        .expect(1)
        .mount(&server)
        .await;
    let changed = json!({
        "name": "widgets",
        "description": "Better widgets",
        "visibility": "private",
        "has_issues": true
    });
    let plan = provider
        .plan_resource_change("github_repository", Some(&refreshed), Some(&changed))
        .unwrap();
    assert_eq!(plan.action, PlanAction::Update);
    provider
        .apply_plan("github_repository", Some(&refreshed), &plan)
        .await
        .unwrap();

    api("DELETE", "/api/v3/repos/acme/widgets")
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let plan = provider
        .plan_resource_change("github_repository", Some(&refreshed), None)
        .unwrap();
    assert_eq!(plan.action, PlanAction::Delete);
    let gone = provider
        .apply_plan("github_repository", Some(&refreshed), &plan)
        .await
        .unwrap();
    assert!(gone.is_null());
}

#[tokio::test]
async fn test_read_removes_missing_repository_from_state() {
    let (server, provider) = setup().await;
    api("GET", "/api/v3/repos/acme/deleted")
        .respond_with(error_response(404, "Not Found"))
        .mount(&server)
        .await;

    let state = json!({"id": "deleted", "name": "deleted"});
    let refreshed = provider
        .read_resource("github_repository", &state)
        .await
        .unwrap();
    assert!(refreshed.is_none());
}

#[tokio::test]
async fn test_read_propagates_other_errors() {
    let (server, provider) = setup().await;
    api("GET", "/api/v3/repos/acme/locked")
        .respond_with(error_response(403, "Must have admin rights to Repository."))
        .mount(&server)
        .await;

    let err = provider
        .read_resource("github_repository", &json!({"id": "locked"}))
        .await
        .unwrap_err();
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_import_repository() {
    let (server, provider) = setup().await;
    api("GET", "/api/v3/repos/acme/widgets")
        .respond_with(json_response(200, repository_json("widgets")))
        .mount(&server)
        .await;
    api("GET", "/api/v3/repos/acme/widgets/vulnerability-alerts")
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let state = provider
        .import_resource_state("github_repository", "widgets")
        .await
        .unwrap();
    assert_eq!(state["name"], "widgets");
    assert_eq!(state["visibility"], "private");
    assert_eq!(state["vulnerability_alerts"], true);
}

#[tokio::test]
async fn test_import_missing_object() {
    let (server, provider) = setup().await;
    api("GET", "/api/v3/repos/acme/nope")
        .respond_with(error_response(404, "Not Found"))
        .mount(&server)
        .await;

    let err = provider
        .import_resource_state("github_repository", "nope")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::ImportNotFound(id) if id == "nope"));
}

#[tokio::test]
async fn test_ip_ranges_data_source() {
    let (server, provider) = setup().await;
    api("GET", "/api/v3/meta")
        .respond_with(json_response(
            200,
            json!({
                "hooks": ["192.30.252.0/22", "2a0a:a440::/29"],
                "git": ["140.82.112.0/20"],
                "actions": []
            }),
        ))
        .mount(&server)
        .await;

    let state = provider
        .read_data_source("github_ip_ranges", &json!({}))
        .await
        .unwrap();
    assert_eq!(state["hooks_ipv4"], json!(["192.30.252.0/22"]));
    assert_eq!(state["hooks_ipv6"], json!(["2a0a:a440::/29"]));
    assert_eq!(state["git"], json!(["140.82.112.0/20"]));
    assert_eq!(state["actions"], json!([]));
}

#[tokio::test]
async fn test_data_source_lookup_miss_is_an_error() {
    let (server, provider) = setup().await;
    api("GET", "/api/v3/repos/acme/widgets/git/ref/heads/nope")
        .respond_with(error_response(404, "Not Found"))
        .mount(&server)
        .await;

    let err = provider
        .read_data_source("github_branch", &json!({"repository": "widgets", "branch": "nope"}))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_data_source_config_validation() {
    let provider = Provider::new();
    let errors = |config: serde_json::Value| {
        provider
            .validate_data_source_config("github_repository", &config)
            .unwrap()
            .into_iter()
            .filter(|d| d.is_error())
            .count()
    };

    assert_eq!(errors(json!({"name": "widgets"})), 0);
    assert_eq!(errors(json!({"full_name": "widgets"})), 1);
    assert!(errors(json!({"name": "widgets", "full_name": "acme/widgets"})) > 0);

    let diags = provider
        .validate_data_source_config("github_repositories", &json!({}))
        .unwrap();
    assert!(diags.iter().any(|d| d.is_error()));

    assert!(matches!(
        provider.validate_data_source_config("github_nope", &json!({})),
        Err(ProviderError::UnknownType { .. })
    ));
}
