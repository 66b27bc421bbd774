//! Data source lookups against a mock Tsuga API.

mod common;

use common::*;
use serde_json::json;
use tsuga_provider::ProviderError;

fn team(id: &str, name: &str) -> serde_json::Value {
    json!({
        "id": id, "name": name, "description": "", "visibility": "public",
        "tags": [{"key": "env", "value": "prod"}]
    })
}

#[tokio::test]
async fn test_team_by_id() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/teams/team-1"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(data(team("team-1", "platform")))
        .expect(1)
        .mount(&h.server)
        .await;

    let state = h
        .tester
        .read_data_source("tsuga_team", json!({"id": "team-1", "name": null}))
        .await
        .unwrap();
    assert_eq!(
        state,
        json!({
            "id": "team-1", "name": "platform", "description": null,
            "visibility": "public", "tags": [{"key": "env", "value": "prod"}]
        })
    );
}

#[tokio::test]
async fn test_team_by_name() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/teams"))
        .respond_with(data(json!([
            team("team-1", "platform"),
            team("team-2", "payments"),
        ])))
        .expect(1)
        .mount(&h.server)
        .await;

    let state = h
        .tester
        .read_data_source("tsuga_team", json!({"name": "payments"}))
        .await
        .unwrap();
    assert_eq!(state["id"], "team-2");
    assert_eq!(state["visibility"], "public");
}

#[tokio::test]
async fn test_team_not_found() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/teams/team-9"))
        .respond_with(api_error(404, "not_found", "team not found"))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/teams"))
        .respond_with(data(json!([team("team-1", "platform")])))
        .mount(&h.server)
        .await;

    let err = h
        .tester
        .read_data_source("tsuga_team", json!({"id": "team-9"}))
        .await
        .unwrap_err();
    assert!(matches!(&err, ProviderError::NotFound(detail) if detail.contains("team-9")));

    let err = h
        .tester
        .read_data_source("tsuga_team", json!({"name": "billing"}))
        .await
        .unwrap_err();
    assert!(matches!(&err, ProviderError::NotFound(detail) if detail.contains("billing")));
}

#[tokio::test]
async fn test_team_name_must_be_unique() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/teams"))
        .respond_with(data(json!([
            team("team-1", "platform"),
            team("team-2", "platform"),
        ])))
        .mount(&h.server)
        .await;

    let err = h
        .tester
        .read_data_source("tsuga_team", json!({"name": "platform"}))
        .await
        .unwrap_err();
    let diagnostic = err.to_diagnostic();
    assert_eq!(diagnostic.attribute.as_deref(), Some("name"));
    assert!(err.to_string().contains("found 2 teams"));
}

#[tokio::test]
async fn test_team_lookup_needs_a_key() {
    let h = Harness::new().await;
    let err = h
        .tester
        .read_data_source("tsuga_team", json!({"id": null, "name": null}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidConfiguration { .. }));
    assert!(h.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_user_by_id() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/users/user-1"))
        .respond_with(data(json!({
            "id": "user-1", "email": "ada@example.com", "name": "Ada", "role": "admin"
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let state = h
        .tester
        .read_data_source(
            "tsuga_user",
            json!({"id": "user-1", "email": null, "name": null, "role": null}),
        )
        .await
        .unwrap();
    assert_eq!(
        state,
        json!({"id": "user-1", "email": "ada@example.com", "name": "Ada", "role": "admin"})
    );
}

#[tokio::test]
async fn test_user_not_found() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/users/ghost"))
        .respond_with(api_error(404, "not_found", "user not found"))
        .mount(&h.server)
        .await;

    let err = h
        .tester
        .read_data_source("tsuga_user", json!({"id": "ghost"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::NotFound(_)));
    assert_eq!(err.to_diagnostic().summary, "Not found");
}
