use std::sync::Arc;

use bltnm::client::{CsrfClientError, CsrfTokenClient};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn server_issuing(token: &str, expected_calls: u64) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-csrf-token", token)
                .set_body_string(r#"{"status":"ok"}"#),
        )
        .expect(expected_calls)
        .mount(&mock_server)
        .await;

    mock_server
}

#[tokio::test]
async fn fetches_once_then_serves_from_cache() {
    let mock_server = server_issuing("tok-123", 1).await;
    let client = CsrfTokenClient::new(&mock_server.uri()).unwrap();

    assert_eq!(client.get_token().await, "tok-123");
    assert_eq!(client.get_token().await, "tok-123");
}

#[tokio::test]
async fn concurrent_callers_share_one_fetch() {
    let mock_server = server_issuing("tok-shared", 1).await;
    let client = Arc::new(CsrfTokenClient::new(&mock_server.uri()).unwrap());

    let (a, b, c) = tokio::join!(client.get_token(), client.get_token(), client.get_token());
    assert_eq!(a, "tok-shared");
    assert_eq!(b, "tok-shared");
    assert_eq!(c, "tok-shared");
}

#[tokio::test]
async fn clear_forces_refetch_and_set_overrides() {
    let mock_server = server_issuing("tok-fresh", 2).await;
    let client = CsrfTokenClient::new(&mock_server.uri()).unwrap();

    assert_eq!(client.get_token().await, "tok-fresh");

    client.set_token("tok-pushed").await;
    assert_eq!(client.get_token().await, "tok-pushed");

    client.clear_token().await;
    assert_eq!(client.get_token().await, "tok-fresh");
}

#[tokio::test]
async fn missing_header_fails_open_with_empty_token() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = CsrfTokenClient::new(&mock_server.uri()).unwrap();

    assert!(matches!(
        client.try_get_token().await,
        Err(CsrfClientError::MissingHeader)
    ));
    assert_eq!(client.get_token().await, "");
}

#[tokio::test]
async fn unreachable_server_fails_open() {
    // Nothing listens on port 1
    let client = CsrfTokenClient::new("http://127.0.0.1:1").unwrap();
    assert!(matches!(
        client.try_get_token().await,
        Err(CsrfClientError::Request(_))
    ));
    assert_eq!(client.get_token().await, "");
}

#[tokio::test]
async fn attach_sends_token_header_on_mutation() {
    let mock_server = server_issuing("tok-attach", 1).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/signout"))
        .and(header("x-csrf-token", "tok-attach"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = CsrfTokenClient::new(&mock_server.uri()).unwrap();
    let request = client
        .http()
        .post(format!("{}/api/auth/signout", mock_server.uri()));
    let response = client.attach(request).await.send().await.unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn round_trip_against_running_gateway() {
    use bltnm::test_utils::test_helpers::{build_test_app, TestAppOptions};

    let (app, _pool) = build_test_app(TestAppOptions::default()).await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let base_url = format!("http://{}", addr);
    let client = CsrfTokenClient::new(&base_url).unwrap();
    let token = client.try_get_token().await.unwrap();
    assert_eq!(token.len(), 64);

    // Cookie jar replays the session, so the cached token validates
    let request = client.http().post(format!("{}/api/auth/signout", base_url));
    let response = client.attach(request).await.send().await.unwrap();
    assert_eq!(response.status(), 200);

    // Without the token the gateway refuses
    client.clear_token().await;
    let response = client
        .http()
        .post(format!("{}/api/auth/signout", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}
