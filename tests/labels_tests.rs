//! Issue label resources: refresh after apply must not plan further changes.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use terraform_provider_github::PlanAction;
use wiremock::MockServer;

async fn mount_labels(server: &MockServer) {
    api("GET", "/api/v3/repos/acme/widgets")
        .respond_with(json_response(200, repository_json("widgets")))
        .mount(server)
        .await;
    api("GET", "/api/v3/repos/acme/widgets/labels")
        .respond_with(json_response(
            200,
            json!([{
                "id": 208045946,
                "name": "bug",
                "color": "d73a4a",
                "description": "",
                "url": "https://github.example.com/api/v3/repos/acme/widgets/labels/bug"
            }]),
        ))
        .mount(server)
        .await;
    api("GET", "/api/v3/repos/acme/widgets/labels/bug")
        .respond_with(json_response(
            200,
            json!({
                "id": 208045946,
                "name": "bug",
                "color": "d73a4a",
                "description": null,
                "url": "https://github.example.com/api/v3/repos/acme/widgets/labels/bug"
            }),
        ))
        .mount(server)
        .await;
    api("POST", "/api/v3/repos/acme/widgets/labels")
        .respond_with(error_response(500, "unexpected write"))
        .expect(0)
        .mount(server)
        .await;
    api("PATCH", "/api/v3/repos/acme/widgets/labels/bug")
        .respond_with(error_response(500, "unexpected write"))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_issue_labels_stable_after_apply() {
    let (server, provider) = setup().await;
    mount_labels(&server).await;

    let config = json!({
        "repository": "widgets",
        "label": [{"name": "bug", "color": "#D73A4A"}]
    });
    let plan = provider
        .plan_resource_change("github_issue_labels", None, Some(&config))
        .unwrap();
    let state = provider
        .apply_plan("github_issue_labels", None, &plan)
        .await
        .unwrap();

    assert_eq!(state["label"][0]["color"], "#D73A4A");
    assert!(state["label"][0]["url"].is_string());

    let refreshed = provider
        .read_resource("github_issue_labels", &state)
        .await
        .unwrap()
        .unwrap();
    let plan = provider
        .plan_resource_change("github_issue_labels", Some(&refreshed), Some(&config))
        .unwrap();
    assert_eq!(plan.action, PlanAction::NoOp, "{:?}", plan.changes);
}

#[tokio::test]
async fn test_issue_label_keeps_configured_color_spelling() {
    let (server, provider) = setup().await;
    mount_labels(&server).await;

    let config = json!({"repository": "widgets", "name": "bug", "color": "#D73A4A"});
    let mut state = config.clone();
    state["id"] = json!("widgets:bug");

    let refreshed = provider
        .read_resource("github_issue_label", &state)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed["color"], "#D73A4A");

    let plan = provider
        .plan_resource_change("github_issue_label", Some(&refreshed), Some(&config))
        .unwrap();
    assert_eq!(plan.action, PlanAction::NoOp, "{:?}", plan.changes);
}
