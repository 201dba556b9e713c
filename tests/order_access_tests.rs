//! Order endpoints expose customer data and are reserved for operators.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use bltnm::{
    services::webhook_service::{sign_payload, SIGNATURE_HEADER},
    test_utils::test_helpers::{
        admin_get, body_json, body_string, build_test_app, get, TestAppOptions,
        TEST_WEBHOOK_SECRET,
    },
};
use serde_json::json;
use tower::ServiceExt;

async fn app_with_recorded_order(options: TestAppOptions) -> axum::Router {
    let (app, _pool) = build_test_app(options).await;
    let payload = json!({
        "type": "checkout.completed",
        "data": { "id": "chk_9", "customer_email": "buyer@example.com", "amount": 100 }
    })
    .to_string();
    let signature = sign_payload(TEST_WEBHOOK_SECRET, payload.as_bytes()).unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/webhooks/polar")
                .header(header::HOST, "bltnm.store")
                .header(header::CONTENT_TYPE, "application/json")
                .header(SIGNATURE_HEADER, signature)
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    app
}

fn with_bearer(uri: &str, token: &str) -> Request<Body> {
    let mut request = get(uri, "shop.bltnm.store");
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", token).parse().unwrap(),
    );
    request
}

#[tokio::test]
async fn anonymous_callers_cannot_read_orders() {
    let app = app_with_recorded_order(TestAppOptions::default()).await;

    for uri in ["/api/orders", "/api/orders/chk_9"] {
        let response = app
            .clone()
            .oneshot(get(uri, "shop.bltnm.store"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);

        let body = body_string(response).await;
        assert!(body.contains("PERMISSION_DENIED"));
        assert!(!body.contains("buyer@example.com"));
    }
}

#[tokio::test]
async fn wrong_bearer_token_is_refused() {
    let app = app_with_recorded_order(TestAppOptions::default()).await;

    let response = app
        .oneshot(with_bearer("/api/orders", "not-the-admin-token"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn order_endpoints_stay_closed_without_configured_token() {
    let app = app_with_recorded_order(TestAppOptions {
        admin_token: None,
        ..TestAppOptions::default()
    })
    .await;

    let response = app
        .oneshot(admin_get("/api/orders", "bltnm.store"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn admin_token_grants_access() {
    let app = app_with_recorded_order(TestAppOptions::default()).await;

    let response = app
        .oneshot(admin_get("/api/orders", "shop.bltnm.store"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let orders = body_json(response).await;
    assert_eq!(orders[0]["checkout_id"], "chk_9");
    assert_eq!(orders[0]["customer_email"], "buyer@example.com");
}
