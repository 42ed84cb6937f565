//! Transport behaviour: retries, REST pagination and GraphQL cursors.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, query_param};
use wiremock::ResponseTemplate;

#[tokio::test]
async fn test_retries_statuses_on_the_allowlist() {
    let (server, provider) = setup_with_retries(2).await;

    api("GET", "/api/v3/repos/acme/flaky")
        .respond_with(error_response(502, "Bad Gateway"))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    api("GET", "/api/v3/repos/acme/flaky")
        .respond_with(
            json_response(200, repository_json("flaky"))
                .insert_header("x-ratelimit-limit", "5000")
                .insert_header("x-ratelimit-remaining", "4321")
                .insert_header("x-ratelimit-reset", "4102444800")
                .insert_header("x-ratelimit-resource", "core"),
        )
        .mount(&server)
        .await;
    api("GET", "/api/v3/repos/acme/flaky/vulnerability-alerts")
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let state = provider
        .read_resource("github_repository", &json!({"id": "flaky"}))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state["full_name"], "acme/flaky");

    let owner = provider.owner().await.unwrap();
    let metrics = owner.client().metrics();
    assert_eq!(metrics.retries, 1);
    assert_eq!(metrics.failures, 1);

    let core = owner.client().rate_limit(false).await.unwrap();
    assert_eq!((core.limit, core.remaining), (5000, 4321));
    assert!(owner.client().rate_limit(true).await.is_none());
}

#[tokio::test]
async fn test_does_not_retry_other_statuses() {
    let (server, provider) = setup_with_retries(3).await;

    api("PATCH", "/api/v3/repos/acme/widgets")
        .respond_with(json_response(
            422,
            json!({
                "message": "Validation Failed",
                "errors": [{"resource": "Repository", "field": "name", "code": "already_exists"}]
            }),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let prior = json!({"id": "widgets", "name": "widgets", "topics": []});
    let config = json!({"name": "gadgets"});
    let plan = provider
        .plan_resource_change("github_repository", Some(&prior), Some(&config))
        .unwrap();
    let err = provider
        .apply_plan("github_repository", Some(&prior), &plan)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Validation Failed"));
}

#[tokio::test]
async fn test_follows_link_headers() {
    let (server, provider) = setup().await;

    let next = format!(
        "<{}/api/v3/repos/acme/widgets/labels?page=2&per_page=100>; rel=\"next\"",
        server.uri()
    );
    api("GET", "/api/v3/repos/acme/widgets/labels")
        .and(query_param("page", "2"))
        .respond_with(json_response(
            200,
            json!([{"id": 2, "name": "wontfix", "color": "ffffff", "url": "u2"}]),
        ))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    api("GET", "/api/v3/repos/acme/widgets/labels")
        .respond_with(
            json_response(
                200,
                json!([{
                    "id": 1,
                    "name": "bug",
                    "color": "d73a4a",
                    "description": "Broken",
                    "url": "u1"
                }]),
            )
            .insert_header("Link", next.as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let state = provider
        .read_data_source("github_issue_labels", &json!({"repository": "widgets"}))
        .await
        .unwrap();
    let names: Vec<&str> = state["labels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["bug", "wontfix"]);
}

#[tokio::test]
async fn test_graphql_walks_team_cursors() {
    let (server, provider) = setup().await;

    let team = |id: u64, slug: &str, privacy: &str| {
        json!({
            "databaseId": id,
            "id": format!("T_{}", id),
            "slug": slug,
            "name": slug,
            "description": null,
            "privacy": privacy,
            "parentTeam": null,
            "members": {"nodes": [{"login": "alice"}]},
            "repositories": {"nodes": []}
        })
    };

    api("POST", "/api/graphql")
        .and(body_partial_json(json!({"variables": {"login": "acme", "after": null}})))
        .respond_with(json_response(
            200,
            json!({"data": {"organization": {"teams": {
                "nodes": [team(1, "platform", "VISIBLE")],
                "pageInfo": {"hasNextPage": true, "endCursor": "Y3Vyc29yOjE="}
            }}}}),
        ))
        .expect(1)
        .mount(&server)
        .await;
    api("POST", "/api/graphql")
        .and(body_partial_json(json!({"variables": {"after": "Y3Vyc29yOjE="}})))
        .respond_with(json_response(
            200,
            json!({"data": {"organization": {"teams": {
                "nodes": [team(2, "security", "SECRET")],
                "pageInfo": {"hasNextPage": false, "endCursor": null}
            }}}}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let state = provider
        .read_data_source("github_organization_teams", &json!({}))
        .await
        .unwrap();
    let teams = state["teams"].as_array().unwrap();
    assert_eq!(teams.len(), 2);
    assert_eq!(teams[0]["slug"], "platform");
    assert_eq!(teams[0]["privacy"], "closed");
    assert_eq!(teams[1]["privacy"], "secret");
    assert_eq!(teams[1]["members"], json!(["alice"]));
}

#[tokio::test]
async fn test_graphql_errors_surface() {
    let (server, provider) = setup().await;
    api("POST", "/api/graphql")
        .respond_with(json_response(
            200,
            json!({"data": null, "errors": [{"message": "Could not resolve to an Organization"}]}),
        ))
        .mount(&server)
        .await;

    let err = provider
        .read_data_source("github_organization_teams", &json!({}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Could not resolve"));
}
