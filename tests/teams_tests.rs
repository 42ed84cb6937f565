//! Team resources against a mocked organization with id 1.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use terraform_provider_github::PlanAction;
use wiremock::matchers::{body_json, query_param};
use wiremock::{MockServer, ResponseTemplate};

fn team_json(id: u64, name: &str, slug: &str, parent: Option<Value>) -> Value {
    json!({
        "id": id,
        "node_id": format!("T_{}", id),
        "name": name,
        "slug": slug,
        "description": "",
        "privacy": "secret",
        "permission": "pull",
        "parent": parent
    })
}

async fn mount_team(server: &MockServer, id: u64, slug: &str) {
    api("GET", format!("/api/v3/organizations/1/team/{}", id))
        .respond_with(json_response(200, team_json(id, slug, slug, None)))
        .mount(server)
        .await;
    api("GET", format!("/api/v3/orgs/acme/teams/{}", slug))
        .respond_with(json_response(200, team_json(id, slug, slug, None)))
        .mount(server)
        .await;
}

async fn mount_members(server: &MockServer, role: &str, logins: &[&str]) {
    let users: Vec<Value> = logins
        .iter()
        .enumerate()
        .map(|(i, login)| json!({"id": i + 1, "login": login}))
        .collect();
    api("GET", "/api/v3/organizations/1/team/12/members")
        .and(query_param("role", role))
        .respond_with(json_response(200, json!(users)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_create_team_resolves_parent_and_drops_creator() {
    let (server, provider) = setup().await;
    mount_team(&server, 5, "platform").await;

    authed("POST", "/api/v3/orgs/acme/teams")
        .and(body_json(json!({
            "name": "Backend",
            "privacy": "secret",
            "parent_team_id": 5
        })))
        .respond_with(json_response(
            201,
            team_json(12, "Backend", "backend", Some(team_json(5, "Platform", "platform", None))),
        ))
        .expect(1)
        .mount(&server)
        .await;
    api("GET", "/api/v3/user")
        .respond_with(json_response(200, json!({"id": 99, "login": "terraform-bot"})))
        .mount(&server)
        .await;
    api("DELETE", "/api/v3/organizations/1/team/12/memberships/terraform-bot")
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = json!({"name": "Backend", "parent_team_id": "platform"});
    let plan = provider
        .plan_resource_change("github_team", None, Some(&config))
        .unwrap();
    let state = provider.apply_plan("github_team", None, &plan).await.unwrap();

    assert_eq!(state["id"], "12");
    assert_eq!(state["slug"], "backend");
    assert_eq!(state["parent_team_id"], "platform");
    assert_eq!(state["create_default_maintainer"], false);

    let plan = provider
        .plan_resource_change("github_team", Some(&state), Some(&config))
        .unwrap();
    assert_eq!(plan.action, PlanAction::NoOp);
}

#[tokio::test]
async fn test_create_default_maintainer_keeps_creator() {
    let (server, provider) = setup().await;

    authed("POST", "/api/v3/orgs/acme/teams")
        .respond_with(json_response(201, team_json(12, "Backend", "backend", None)))
        .expect(1)
        .mount(&server)
        .await;
    api("GET", "/api/v3/user")
        .respond_with(json_response(200, json!({"id": 99, "login": "terraform-bot"})))
        .expect(0)
        .mount(&server)
        .await;

    let config = json!({"name": "Backend", "create_default_maintainer": true});
    let plan = provider
        .plan_resource_change("github_team", None, Some(&config))
        .unwrap();
    let state = provider.apply_plan("github_team", None, &plan).await.unwrap();
    assert_eq!(state["create_default_maintainer"], true);
}

#[tokio::test]
async fn test_import_team_by_slug() {
    let (server, provider) = setup().await;
    mount_team(&server, 12, "backend").await;

    let state = provider
        .import_resource_state("github_team", "backend")
        .await
        .unwrap();

    assert_eq!(state["id"], "12");
    assert_eq!(state["name"], "backend");
    assert_eq!(state["description"], Value::Null);
    assert_eq!(state["parent_team_id"], Value::Null);
}

#[tokio::test]
async fn test_reconcile_team_members() {
    let (server, provider) = setup().await;
    mount_team(&server, 12, "backend").await;
    mount_members(&server, "member", &["Alice", "carol"]).await;
    mount_members(&server, "maintainer", &[]).await;

    // alice: promoted; bob: added; carol: removed.
    api("PUT", "/api/v3/organizations/1/team/12/memberships/alice")
        .and(body_json(json!({"role": "maintainer"})))
        .respond_with(json_response(200, json!({"role": "maintainer", "state": "active"})))
        .expect(1)
        .mount(&server)
        .await;
    api("PUT", "/api/v3/organizations/1/team/12/memberships/bob")
        .and(body_json(json!({"role": "member"})))
        .respond_with(json_response(200, json!({"role": "member", "state": "pending"})))
        .expect(1)
        .mount(&server)
        .await;
    api("DELETE", "/api/v3/organizations/1/team/12/memberships/carol")
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = json!({
        "team_id": "12",
        "members": [
            {"username": "alice", "role": "maintainer"},
            {"username": "bob"}
        ]
    });
    let plan = provider
        .plan_resource_change("github_team_members", None, Some(&config))
        .unwrap();
    let state = provider
        .apply_plan("github_team_members", None, &plan)
        .await
        .unwrap();
    assert_eq!(state["id"], "12");
}

#[tokio::test]
async fn test_team_members_refresh_is_stable() {
    let (server, provider) = setup().await;
    mount_team(&server, 12, "backend").await;
    mount_members(&server, "member", &["Alice"]).await;
    mount_members(&server, "maintainer", &["Bob"]).await;

    let config = json!({
        "team_id": "backend",
        "members": [
            {"username": "alice"},
            {"username": "bob", "role": "maintainer"}
        ]
    });
    let state = json!({
        "id": "12",
        "team_id": "backend",
        "members": [
            {"username": "alice", "role": "member"},
            {"username": "bob", "role": "maintainer"}
        ]
    });

    let refreshed = provider
        .read_resource("github_team_members", &state)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed["members"], state["members"]);

    let plan = provider
        .plan_resource_change("github_team_members", Some(&refreshed), Some(&config))
        .unwrap();
    assert_eq!(plan.action, PlanAction::NoOp);
}

#[tokio::test]
async fn test_team_repository_lifecycle() {
    let (server, provider) = setup().await;

    let mut repository = repository_json("widgets");
    repository["permissions"] = json!({
        "admin": false,
        "maintain": false,
        "push": true,
        "triage": true,
        "pull": true
    });

    api("PUT", "/api/v3/organizations/1/team/12/repos/acme/widgets")
        .and(body_json(json!({"permission": "push"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    api("GET", "/api/v3/organizations/1/team/12/repos/acme/widgets")
        .respond_with(json_response(200, repository))
        .mount(&server)
        .await;

    let config = json!({"team_id": "12", "repository": "widgets", "permission": "push"});
    let plan = provider
        .plan_resource_change("github_team_repository", None, Some(&config))
        .unwrap();
    let state = provider
        .apply_plan("github_team_repository", None, &plan)
        .await
        .unwrap();

    assert_eq!(state["id"], "12:widgets");
    assert_eq!(state["permission"], "push");

    let plan = provider
        .plan_resource_change("github_team_repository", Some(&state), Some(&config))
        .unwrap();
    assert_eq!(plan.action, PlanAction::NoOp);
}

#[tokio::test]
async fn test_team_repository_gone_is_removed_from_state() {
    let (server, provider) = setup().await;
    api("GET", "/api/v3/organizations/1/team/12/repos/acme/widgets")
        .respond_with(error_response(404, "Not Found"))
        .mount(&server)
        .await;

    let state = json!({
        "id": "12:widgets",
        "team_id": "12",
        "repository": "widgets",
        "permission": "pull"
    });
    let refreshed = provider
        .read_resource("github_team_repository", &state)
        .await
        .unwrap();
    assert!(refreshed.is_none());
}
