//! Integration tests for the device authorization flow against a stubbed
//! identity provider.

use fedcreds::auth::device_flow::DeviceFlowPoller;
use fedcreds::auth::types::AuthError;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn poller(server: &MockServer) -> DeviceFlowPoller {
    DeviceFlowPoller::new(
        reqwest::Client::new(),
        server.uri(),
        "client-id".to_string(),
    )
}

fn device_auth_body(expires_in: u64, interval: u64) -> serde_json::Value {
    json!({
        "device_code": "dc-123",
        "user_code": "ABCD-EFGH",
        "verification_uri": "https://example.okta.com/activate",
        "verification_uri_complete": "https://example.okta.com/activate?user_code=ABCD-EFGH",
        "expires_in": expires_in,
        "interval": interval,
    })
}

#[tokio::test]
async fn requests_device_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v1/device/authorize"))
        .and(body_string_contains("client_id=client-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_auth_body(600, 5)))
        .expect(1)
        .mount(&server)
        .await;

    let auth = poller(&server).request_authorization().await.unwrap();
    assert_eq!(auth.device_code, "dc-123");
    assert_eq!(auth.user_code, "ABCD-EFGH");
    assert_eq!(auth.interval, 5);
}

#[tokio::test]
async fn device_authorization_failure_is_a_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v1/device/authorize"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_client"))
        .mount(&server)
        .await;

    let result = poller(&server).request_authorization().await;
    assert!(matches!(result, Err(AuthError::Provider(_))));
}

#[tokio::test]
async fn polls_until_token_is_issued() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v1/device/authorize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_auth_body(30, 1)))
        .mount(&server)
        .await;

    // Pending twice, then the token appears
    Mock::given(method("POST"))
        .and(path("/oauth2/v1/token"))
        .and(body_string_contains("device_code=dc-123"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "authorization_pending"})),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v1/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "token-xyz"})),
        )
        .mount(&server)
        .await;

    let poller = poller(&server);
    let auth = poller.request_authorization().await.unwrap();
    let token = poller.poll(&auth).await.unwrap();
    assert_eq!(token, "token-xyz");
}

#[tokio::test]
async fn expiry_without_token_is_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v1/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "authorization_pending"})),
        )
        .mount(&server)
        .await;

    let auth: fedcreds::auth::types::DeviceAuthorization =
        serde_json::from_value(device_auth_body(2, 1)).unwrap();

    let result = poller(&server).poll(&auth).await;
    assert!(matches!(result, Err(AuthError::Timeout)));
}

#[tokio::test]
async fn terminal_oauth_error_is_a_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "access_denied",
            "error_description": "User rejected the request"
        })))
        .mount(&server)
        .await;

    let auth: fedcreds::auth::types::DeviceAuthorization =
        serde_json::from_value(device_auth_body(10, 1)).unwrap();

    let result = poller(&server).poll(&auth).await;
    assert!(matches!(result, Err(AuthError::Provider(_))));
}

#[tokio::test]
async fn transient_provider_hiccups_do_not_abort_polling() {
    let server = MockServer::start().await;

    // Garbage body first, then a token: the malformed attempt must be
    // swallowed, not escalated
    Mock::given(method("POST"))
        .and(path("/oauth2/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v1/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "token-after-hiccup"})),
        )
        .mount(&server)
        .await;

    let auth: fedcreds::auth::types::DeviceAuthorization =
        serde_json::from_value(device_auth_body(30, 1)).unwrap();

    let token = poller(&server).poll(&auth).await.unwrap();
    assert_eq!(token, "token-after-hiccup");
}
