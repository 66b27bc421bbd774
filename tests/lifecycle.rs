//! Create/read/update/delete against a mock Tsuga API.

mod common;

use common::*;
use serde_json::json;
use tsuga_provider::client::{SOURCE_COMMIT, SOURCE_DATE};
use tsuga_provider::testing::assert_plan_changes_attribute;
use tsuga_provider::ProviderError;

fn team_config(name: &str) -> serde_json::Value {
    json!({"name": name, "description": null, "visibility": "private", "tags": null})
}

#[tokio::test]
async fn test_team_crud() {
    let h = Harness::new().await;

    Mock::given(method("POST"))
        .and(path("/v1/teams"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(header("x-tsuga-source", "tsuga-provider"))
        .and(header("x-tsuga-source-version", env!("CARGO_PKG_VERSION")))
        .and(header("x-tsuga-source-commit", SOURCE_COMMIT))
        .and(header("x-tsuga-source-date", SOURCE_DATE))
        .and(body_json(json!({"name": "payments", "visibility": "private", "tags": []})))
        .respond_with(EchoWithId("team-1"))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/teams/team-1"))
        .respond_with(EchoWithId("team-1"))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/teams/team-1"))
        .respond_with(data(json!({
            "id": "team-1", "name": "billing", "description": "",
            "visibility": "private", "tags": []
        })))
        .mount(&h.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/teams/team-1"))
        .respond_with(wiremock::ResponseTemplate::new(204))
        .expect(1)
        .mount(&h.server)
        .await;

    let plan = h.tester.plan_create("tsuga_team", team_config("payments")).await.unwrap();
    let created = h.tester.create("tsuga_team", plan.planned_state).await.unwrap();
    assert_eq!(created["id"], "team-1");
    assert_eq!(created["name"], "payments");
    assert!(created["tags"].is_null());

    let plan = h
        .tester
        .plan_update("tsuga_team", created.clone(), team_config("billing"))
        .await
        .unwrap();
    assert_plan_changes_attribute(&plan, "name");
    let updated = h
        .tester
        .update("tsuga_team", created, plan.planned_state)
        .await
        .unwrap();
    assert_eq!(updated["name"], "billing");

    let read = h.tester.read("tsuga_team", updated.clone()).await.unwrap();
    let state = read.state.expect("team still exists");
    assert_eq!(state["name"], "billing");
    assert!(state["description"].is_null());

    h.tester.lifecycle_delete("tsuga_team", state).await.unwrap();
}

#[tokio::test]
async fn test_missing_resource_is_gone() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/teams/team-9"))
        .respond_with(api_error(404, "NOT_FOUND", "team not found"))
        .mount(&h.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/teams/team-9"))
        .respond_with(api_error(404, "NOT_FOUND", "team not found"))
        .mount(&h.server)
        .await;

    let state = json!({"id": "team-9", "name": "old", "visibility": "public"});
    let read = h.tester.read("tsuga_team", state.clone()).await.unwrap();
    assert!(read.state.is_none());

    h.tester.delete("tsuga_team", state).await.unwrap();
}

#[tokio::test]
async fn test_api_error_carries_code_and_request_id() {
    let h = Harness::new().await;
    Mock::given(method("POST"))
        .and(path("/v1/teams"))
        .respond_with(api_error(409, "CONFLICT", "a team named payments exists"))
        .mount(&h.server)
        .await;

    let err = h
        .tester
        .create("tsuga_team", team_config("payments"))
        .await
        .unwrap_err();
    match &err {
        ProviderError::Api {
            status,
            code,
            message,
            request_id,
        } => {
            assert_eq!(*status, 409);
            assert_eq!(code.as_deref(), Some("CONFLICT"));
            assert_eq!(message, "a team named payments exists");
            assert_eq!(request_id.as_deref(), Some("req-123"));
        }
        other => panic!("expected an API error, got {other:?}"),
    }
    let rendered = err.to_string();
    assert!(rendered.contains("CONFLICT"));
    assert!(rendered.contains("req-123"));
}

#[tokio::test]
async fn test_unparseable_error_body_is_kept() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/teams/team-1"))
        .respond_with(wiremock::ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&h.server)
        .await;

    let err = h
        .tester
        .read("tsuga_team", json!({"id": "team-1"}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::Api { status: 502, code: None, ref message, .. } if message == "bad gateway"
    ));
}

#[tokio::test]
async fn test_invalid_config_never_reaches_the_api() {
    let h = Harness::new().await;
    let err = h
        .tester
        .create("tsuga_team", json!({"name": "payments", "visibility": "secret"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidConfiguration { ref path, .. } if path == "visibility"));
    assert!(h.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ingestion_key_survives_read_and_update() {
    let h = Harness::new().await;
    Mock::given(method("POST"))
        .and(path("/v1/ingestion-api-keys"))
        .respond_with(data(json!({
            "id": "key-1", "name": "ingest", "owner": "team-1",
            "keyLastCharacters": "a1b2", "key": "tsg_full_secret"
        })))
        .mount(&h.server)
        .await;
    let stored = json!({
        "id": "key-1", "name": "ingest", "owner": "team-1", "keyLastCharacters": "a1b2"
    });
    Mock::given(method("GET"))
        .and(path("/v1/ingestion-api-keys/key-1"))
        .respond_with(data(stored.clone()))
        .mount(&h.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/ingestion-api-keys/key-1"))
        .and(body_json(json!({"name": "ingest-renamed", "owner": "team-1"})))
        .respond_with(data(json!({
            "id": "key-1", "name": "ingest-renamed", "owner": "team-1", "keyLastCharacters": "a1b2"
        })))
        .mount(&h.server)
        .await;

    let config = json!({"name": "ingest", "owner": "team-1", "tags": null, "team_override_fields": null});
    let created = h.tester.lifecycle_create("tsuga_ingestion_api_key", config).await.unwrap();
    assert_eq!(created["key"], "tsg_full_secret");
    assert_eq!(created["key_last_characters"], "a1b2");

    let renamed = json!({"name": "ingest-renamed", "owner": "team-1", "tags": null, "team_override_fields": null});
    let plan = h
        .tester
        .plan_update("tsuga_ingestion_api_key", created.clone(), renamed)
        .await
        .unwrap();
    let updated = h
        .tester
        .update("tsuga_ingestion_api_key", created, plan.planned_state)
        .await
        .unwrap();
    assert_eq!(updated["name"], "ingest-renamed");
    assert_eq!(updated["key"], "tsg_full_secret");
}

#[tokio::test]
async fn test_membership_uses_pair_addressing() {
    let h = Harness::new().await;
    let membership = json!({"id": "m-1", "userId": "user-1", "teamId": "team-1", "roleKey": "viewer"});

    Mock::given(method("GET"))
        .and(path("/v1/team-memberships"))
        .and(query_param("userId", "user-1"))
        .and(query_param("teamId", "team-1"))
        .respond_with(data(json!([membership])))
        .mount(&h.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/team-memberships"))
        .and(body_json(json!({"userId": "user-1", "teamId": "team-1", "roleKey": "admin"})))
        .respond_with(data(json!({"id": "m-1", "userId": "user-1", "teamId": "team-1", "roleKey": "admin"})))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/team-memberships"))
        .and(body_json(json!({"userId": "user-1", "teamId": "team-1"})))
        .respond_with(wiremock::ResponseTemplate::new(204))
        .expect(1)
        .mount(&h.server)
        .await;

    let imported = h
        .tester
        .import_resource("tsuga_team_membership", "user-1:team-1")
        .await
        .unwrap();
    let read = h
        .tester
        .read("tsuga_team_membership", imported[0].state.clone())
        .await
        .unwrap();
    let state = read.state.expect("membership exists");
    assert_eq!(state["id"], "m-1");
    assert_eq!(state["role_key"], "viewer");

    let mut promoted = state.clone();
    promoted["role_key"] = json!("admin");
    let updated = h
        .tester
        .update("tsuga_team_membership", state, promoted)
        .await
        .unwrap();
    assert_eq!(updated["role_key"], "admin");

    h.tester.delete("tsuga_team_membership", updated).await.unwrap();
}

#[tokio::test]
async fn test_membership_missing_from_lookup_is_gone() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/team-memberships"))
        .respond_with(data(json!([])))
        .mount(&h.server)
        .await;

    let read = h
        .tester
        .read(
            "tsuga_team_membership",
            json!({"id": "m-1", "user_id": "user-1", "team_id": "team-1", "role_key": "viewer"}),
        )
        .await
        .unwrap();
    assert!(read.state.is_none());
}
