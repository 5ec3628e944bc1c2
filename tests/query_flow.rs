//! Integration tests for the legacy query endpoint using wiremock.

use fbgraph::client::GraphClient;
use fbgraph::config::{ClientConfig, Endpoints};
use fbgraph::error::GraphError;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_config(server: &MockServer) -> ClientConfig {
    ClientConfig::new("app-1")
        .with_endpoints(Endpoints::with_base_url(&server.uri()))
        .with_access_token("tok")
}

async fn blocking<T, F>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .expect("blocking task panicked")
}

#[tokio::test]
async fn query_returns_rows_tagged_with_table() {
    let server = MockServer::start().await;
    let fql = "SELECT uid, name FROM user WHERE uid=me()";

    Mock::given(method("GET"))
        .and(path("/v5.0/fql"))
        .and(query_param("q", fql))
        .and(query_param("access_token", "tok"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "uid": 4, "name": "Mark" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = mock_config(&server);
    let rows = blocking(move || GraphClient::new(config)?.execute_query(fql))
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind(), Some("user"));
    assert_eq!(rows[0].str_field("name"), Some("Mark"));
}

#[tokio::test]
async fn query_error_envelope_raises_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v5.0/fql"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {
                "message": "(#12) fql is deprecated for versions v2.1 and higher",
                "type": "OAuthException",
                "code": 12
            }
        })))
        .mount(&server)
        .await;

    let config = mock_config(&server);
    let err = blocking(move || {
        GraphClient::new(config)?.execute_query("SELECT uid FROM user WHERE uid=me()")
    })
    .await
    .unwrap_err();

    match err {
        GraphError::Api { message, code, .. } => {
            assert!(message.starts_with("(#12) fql is deprecated"));
            assert_eq!(code, Some(12));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_query_is_rejected_before_any_request() {
    let server = MockServer::start().await;

    let config = mock_config(&server);
    let err = blocking(move || GraphClient::new(config)?.execute_query("SELECT uid"))
        .await
        .unwrap_err();

    assert!(matches!(err, GraphError::QuerySyntax { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}
