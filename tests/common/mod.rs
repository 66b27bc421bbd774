//! Shared helpers for the HTTP integration tests.
//!
//! Every test gets its own wiremock server and a provider configured
//! against it.

#![allow(dead_code)]

use serde_json::{json, Value};
use tsuga_provider::testing::ProviderTester;
use tsuga_provider::TsugaProvider;
use wiremock::{Request, Respond, ResponseTemplate};

pub use wiremock::matchers::{body_json, header, method, path, query_param};
pub use wiremock::{Mock, MockServer};

pub const TOKEN: &str = "tsg_test_token";

fn no_env(_: &str) -> Option<String> {
    None
}

/// A mock API and a provider configured to talk to it.
pub struct Harness {
    pub server: MockServer,
    pub tester: ProviderTester<TsugaProvider>,
}

impl Harness {
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        let tester = ProviderTester::new(TsugaProvider::with_env_lookup(no_env));
        tester
            .configure(json!({"base_url": server.uri(), "token": TOKEN}))
            .await
            .expect("configure against mock server");
        Self { server, tester }
    }
}

/// `{"data": entity}` with status 200.
pub fn data(entity: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": entity }))
}

/// API error body with the given status.
pub fn api_error(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "requestId": "req-123",
        "error": {"code": code, "message": message, "statusCode": status}
    }))
}

/// Answers with the request body plus an `id`, the way the API echoes
/// created and updated entities.
pub struct EchoWithId(pub &'static str);

impl Respond for EchoWithId {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut body {
            map.insert("id".to_string(), json!(self.0));
        }
        data(body)
    }
}

/// The JSON body of the `index`-th request the server received.
pub async fn request_body(server: &MockServer, index: usize) -> Value {
    let requests = server
        .received_requests()
        .await
        .expect("request recording is enabled");
    serde_json::from_slice(&requests[index].body).expect("request body is JSON")
}
