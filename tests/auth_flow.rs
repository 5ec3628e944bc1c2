//! Integration tests for the OAuth token lifecycle using wiremock.
//!
//! The client is blocking, so each call runs on tokio's blocking pool while
//! the mock server keeps serving on the test runtime.

use std::time::Duration;

use fbgraph::client::GraphClient;
use fbgraph::config::{ClientConfig, Endpoints};
use fbgraph::error::GraphError;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper: client configuration pointed at the given wiremock server.
fn mock_config(server: &MockServer) -> ClientConfig {
    ClientConfig::new("app-1").with_endpoints(Endpoints::with_base_url(&server.uri()))
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

// ── Code exchange ───────────────────────────────────────────────────────

#[tokio::test]
async fn code_exchange_stores_token_from_json() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v5.0/oauth/access_token"))
        .and(query_param("client_id", "app-1"))
        .and(query_param("client_secret", "s3cret"))
        .and(query_param("code", "abc"))
        .and(query_param("redirect_uri", "https://app.example/cb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "X",
            "expires": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = mock_config(&server);
    let (exchange, stored) = blocking(move || {
        let mut client = GraphClient::new(config).unwrap();
        let exchange = client
            .get_access_token("s3cret", "abc", Some("https://app.example/cb"))
            .unwrap();
        (exchange, client.credentials().clone())
    })
    .await;

    assert_eq!(exchange.access_token, "X");
    assert_eq!(exchange.expires_at, Some(Duration::from_secs(3600)));
    assert_eq!(stored.access_token.as_deref(), Some("X"));
    assert_eq!(stored.expires_at, Some(Duration::from_secs(3600)));
}

#[tokio::test]
async fn code_exchange_accepts_legacy_query_string() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v5.0/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("access_token=X&expires=3600"))
        .mount(&server)
        .await;

    let config = mock_config(&server);
    let exchange = blocking(move || {
        GraphClient::new(config)
            .unwrap()
            .get_access_token("s3cret", "abc", None)
    })
    .await
    .unwrap();

    assert_eq!(exchange.access_token, "X");
    assert_eq!(exchange.expires_at, Some(Duration::from_secs(3600)));
}

#[tokio::test]
async fn code_exchange_error_raises_authentication_error() {
    let server = MockServer::start().await;

    // The API reports bad codes with a 400 and an error envelope; the
    // envelope, not the status, decides the outcome.
    Mock::given(method("GET"))
        .and(path("/v5.0/oauth/access_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "message": "bad code", "type": "OAuthException", "code": 100 }
        })))
        .mount(&server)
        .await;

    let config = mock_config(&server);
    let (err, token) = blocking(move || {
        let mut client = GraphClient::new(config).unwrap();
        let err = client.get_access_token("s3cret", "abc", None).unwrap_err();
        (err, client.access_token().map(str::to_owned))
    })
    .await;

    match err {
        GraphError::Authentication { message } => assert_eq!(message, "bad code"),
        other => panic!("expected Authentication error, got {other:?}"),
    }
    assert!(token.is_none(), "a failed exchange must not install a token");
}

// ── Long-lived exchange ─────────────────────────────────────────────────

#[tokio::test]
async fn long_lived_exchange_replaces_short_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v5.0/oauth/access_token"))
        .and(query_param("grant_type", "fb_exchange_token"))
        .and(query_param("fb_exchange_token", "SHORT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "LONG",
            "token_type": "bearer",
            "expires_in": 5183944
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = mock_config(&server).with_access_token("SHORT");
    let token = blocking(move || {
        let mut client = GraphClient::new(config).unwrap();
        client.exchange_token("s3cret", "SHORT").unwrap();
        client.access_token().map(str::to_owned)
    })
    .await;

    assert_eq!(token.as_deref(), Some("LONG"));
}

#[tokio::test]
async fn long_lived_exchange_failure_carries_api_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v5.0/oauth/access_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "message": "Error validating client secret.", "code": 1 }
        })))
        .mount(&server)
        .await;

    let config = mock_config(&server);
    let err = blocking(move || {
        GraphClient::new(config)
            .unwrap()
            .exchange_token("wrong", "SHORT")
    })
    .await
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "authentication failed: Error validating client secret."
    );
}

// ── Transport failures ──────────────────────────────────────────────────

#[tokio::test]
async fn unreachable_token_endpoint_is_a_transport_error() {
    // Nothing listens on the discard port.
    let config = ClientConfig::new("app-1").with_endpoints(Endpoints::with_base_url("http://127.0.0.1:9"));
    let err = blocking(move || {
        GraphClient::new(config)
            .unwrap()
            .get_access_token("s3cret", "abc", None)
    })
    .await
    .unwrap_err();

    assert!(
        matches!(err, GraphError::Transport(_)),
        "expected Transport error, got {err:?}"
    );
}
