//! Set reconciliation of `github_repository_collaborators`.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use terraform_provider_github::PlanAction;
use wiremock::matchers::body_json;
use wiremock::{MockServer, ResponseTemplate};

async fn mount_repository(server: &MockServer) {
    api("GET", "/api/v3/repos/acme/widgets")
        .respond_with(json_response(200, repository_json("widgets")))
        .mount(server)
        .await;
    api("GET", "/api/v3/repos/acme/widgets/teams")
        .respond_with(json_response(
            200,
            json!([{"id": 9, "name": "Ops", "slug": "ops", "permission": "pull"}]),
        ))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_reconcile_users_and_teams() {
    let (server, provider) = setup().await;
    mount_repository(&server).await;

    api("GET", "/api/v3/repos/acme/widgets/collaborators")
        .respond_with(json_response(
            200,
            json!([
                {"id": 1, "login": "Alice", "role_name": "read", "permissions": {"pull": true}},
                {
                    "id": 2,
                    "login": "carol",
                    "role_name": "write",
                    "permissions": {"push": true, "pull": true}
                }
            ]),
        ))
        .mount(&server)
        .await;
    api("GET", "/api/v3/repos/acme/widgets/invitations")
        .respond_with(json_response(
            200,
            json!([
                {"id": 77, "invitee": {"id": 4, "login": "dave"}, "permissions": "read"}
            ]),
        ))
        .mount(&server)
        .await;

    // alice: permission raised; bob: added; carol and dave: removed.
    api("PUT", "/api/v3/repos/acme/widgets/collaborators/Alice")
        .and(body_json(json!({"permission": "push"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    api("PUT", "/api/v3/repos/acme/widgets/collaborators/bob")
        .and(body_json(json!({"permission": "pull"})))
        .respond_with(json_response(
            201,
            json!({"id": 42, "invitee": {"id": 3, "login": "bob"}, "permissions": "read"}),
        ))
        .expect(1)
        .mount(&server)
        .await;
    api("DELETE", "/api/v3/repos/acme/widgets/collaborators/carol")
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    api("DELETE", "/api/v3/repos/acme/widgets/invitations/77")
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    // ops keeps pull and is left alone; platform is granted maintain.
    api("PUT", "/api/v3/orgs/acme/teams/platform/repos/acme/widgets")
        .and(body_json(json!({"permission": "maintain"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    api("PUT", "/api/v3/orgs/acme/teams/ops/repos/acme/widgets")
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let config = json!({
        "repository": "widgets",
        "user": [
            {"username": "alice", "permission": "push"},
            {"username": "bob", "permission": "pull"}
        ],
        "team": [
            {"team_id": "ops", "permission": "pull"},
            {"team_id": "platform", "permission": "maintain"}
        ]
    });
    let plan = provider
        .plan_resource_change("github_repository_collaborators", None, Some(&config))
        .unwrap();
    let state = provider
        .apply_plan("github_repository_collaborators", None, &plan)
        .await
        .unwrap();

    assert_eq!(state["id"], "widgets");
    assert_eq!(state["invitation_ids"], json!({"dave": "77"}));
}

#[tokio::test]
async fn test_destroy_revokes_everyone_but_ignored_teams() {
    let (server, provider) = setup().await;
    mount_repository(&server).await;

    api("GET", "/api/v3/repos/acme/widgets/collaborators")
        .respond_with(json_response(
            200,
            json!([{"id": 2, "login": "carol", "role_name": "write"}]),
        ))
        .mount(&server)
        .await;
    api("GET", "/api/v3/repos/acme/widgets/invitations")
        .respond_with(json_response(200, json!([])))
        .mount(&server)
        .await;
    api("DELETE", "/api/v3/repos/acme/widgets/collaborators/carol")
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    api("DELETE", "/api/v3/orgs/acme/teams/ops/repos/acme/widgets")
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let state = json!({
        "id": "widgets",
        "repository": "widgets",
        "user": [{"username": "carol", "permission": "push"}],
        "team": [],
        "ignore_team": [{"team_id": "ops"}]
    });
    let plan = provider
        .plan_resource_change("github_repository_collaborators", Some(&state), None)
        .unwrap();
    let result = provider
        .apply_plan("github_repository_collaborators", Some(&state), &plan)
        .await
        .unwrap();
    assert!(result.is_null());
}

#[tokio::test]
async fn test_refresh_keeps_configured_login_case() {
    let (server, provider) = setup().await;
    mount_repository(&server).await;

    api("GET", "/api/v3/repos/acme/widgets/collaborators")
        .respond_with(json_response(
            200,
            json!([{
                "id": 1,
                "login": "Alice",
                "role_name": "write",
                "permissions": {"push": true}
            }]),
        ))
        .mount(&server)
        .await;
    api("GET", "/api/v3/repos/acme/widgets/invitations")
        .respond_with(json_response(200, json!([])))
        .mount(&server)
        .await;

    let config = json!({
        "repository": "widgets",
        "user": [{"username": "alice", "permission": "push"}],
        "team": [{"team_id": "ops", "permission": "pull"}]
    });
    let mut state = config.clone();
    state["id"] = json!("widgets");

    let refreshed = provider
        .read_resource("github_repository_collaborators", &state)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed["user"], json!([{"username": "alice", "permission": "push"}]));

    let plan = provider
        .plan_resource_change("github_repository_collaborators", Some(&refreshed), Some(&config))
        .unwrap();
    assert_eq!(plan.action, PlanAction::NoOp);
}
