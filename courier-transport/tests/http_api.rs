//! Integration tests for the HTTP API provider adapter.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use courier_transport::{HttpApiTransport, OutboundMessage, Transport, TransportError};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

fn message() -> OutboundMessage {
    OutboundMessage {
        from: "campaigns@example.com".to_string(),
        to: "user@example.org".to_string(),
        subject: "Spring launch".to_string(),
        html_body: "<p>Hello</p>".to_string(),
    }
}

fn transport(server: &MockServer) -> HttpApiTransport {
    HttpApiTransport::new(
        "primary",
        format!("{}/send", server.uri()),
        "test-key",
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn posts_message_with_bearer_auth() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "from": "campaigns@example.com",
            "to": "user@example.org",
            "subject": "Spring launch",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    transport(&server).send(&message()).await.unwrap();
}

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let error = transport(&server).send(&message()).await.unwrap_err();
    assert!(error.is_auth(), "expected auth error, got {error}");
}

#[tokio::test]
async fn client_error_maps_to_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid recipient"))
        .mount(&server)
        .await;

    let error = transport(&server).send(&message()).await.unwrap_err();
    assert!(matches!(error, TransportError::Rejected(_)));
}

#[tokio::test]
async fn server_error_maps_to_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let error = transport(&server).send(&message()).await.unwrap_err();
    assert!(matches!(error, TransportError::Unavailable(_)));
}
