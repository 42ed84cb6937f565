//! Actions secrets are sealed to the repository key before upload.

mod common;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::*;
use crypto_box::aead::OsRng;
use crypto_box::SecretKey;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::ResponseTemplate;

const SECRET_PATH: &str = "/api/v3/repos/acme/widgets/actions/secrets/DEPLOY_TOKEN";

#[tokio::test]
async fn test_plaintext_secret_is_sealed_to_repository_key() {
    let (server, provider) = setup().await;
    let secret_key = SecretKey::generate(&mut OsRng);

    api("GET", "/api/v3/repos/acme/widgets/actions/secrets/public-key")
        .respond_with(json_response(
            200,
            json!({
                "key_id": "568250167242549743",
                "key": STANDARD.encode(secret_key.public_key().as_bytes())
            }),
        ))
        .mount(&server)
        .await;
    api("PUT", SECRET_PATH)
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    api("GET", SECRET_PATH)
        .respond_with(json_response(
            200,
            json!({
                "name": "DEPLOY_TOKEN",
                "created_at": "2024-01-10T14:59:22Z",
                "updated_at": "2024-01-10T14:59:22Z"
            }),
        ))
        .mount(&server)
        .await;

    let config = json!({
        "repository": "widgets",
        "secret_name": "DEPLOY_TOKEN",
        "plaintext_value": "hunter2"
    });
    let plan = provider
        .plan_resource_change("github_actions_secret", None, Some(&config))
        .unwrap();
    let state = provider
        .apply_plan("github_actions_secret", None, &plan)
        .await
        .unwrap();

    assert_eq!(state["id"], "widgets:DEPLOY_TOKEN");
    assert_eq!(state["plaintext_value"], "hunter2");
    assert_eq!(state["updated_at"], "2024-01-10T14:59:22Z");

    let requests = server.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|r| r.method.to_string() == "PUT")
        .expect("secret was written");
    let body: Value = serde_json::from_slice(&put.body).unwrap();
    assert_eq!(body["key_id"], "568250167242549743");

    let sealed = STANDARD
        .decode(body["encrypted_value"].as_str().unwrap())
        .unwrap();
    assert_eq!(secret_key.unseal(&sealed).unwrap(), b"hunter2");
}

#[tokio::test]
async fn test_drifted_secret_is_removed_from_state() {
    let (server, provider) = setup().await;
    api("GET", SECRET_PATH)
        .respond_with(json_response(
            200,
            json!({
                "name": "DEPLOY_TOKEN",
                "created_at": "2024-01-10T14:59:22Z",
                "updated_at": "2024-03-01T08:00:00Z"
            }),
        ))
        .mount(&server)
        .await;

    let state = json!({
        "id": "widgets:DEPLOY_TOKEN",
        "repository": "widgets",
        "secret_name": "DEPLOY_TOKEN",
        "plaintext_value": "hunter2",
        "destroy_on_drift": true,
        "created_at": "2024-01-10T14:59:22Z",
        "updated_at": "2024-01-10T14:59:22Z"
    });
    let refreshed = provider
        .read_resource("github_actions_secret", &state)
        .await
        .unwrap();
    assert!(refreshed.is_none());

    let mut kept = state.clone();
    kept["destroy_on_drift"] = json!(false);
    let refreshed = provider
        .read_resource("github_actions_secret", &kept)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed["plaintext_value"], Value::Null);
    assert_eq!(refreshed["updated_at"], "2024-03-01T08:00:00Z");
}

#[test]
fn test_secret_names_are_validated() {
    let provider = terraform_provider_github::Provider::new();
    for name in ["GITHUB_TOKEN", "1ABC", "has-dash"] {
        let diags = provider
            .validate_resource_config(
                "github_actions_secret",
                &json!({"repository": "widgets", "secret_name": name}),
            )
            .unwrap();
        assert!(diags.iter().any(|d| d.is_error()), "{} should be rejected", name);
    }
}
