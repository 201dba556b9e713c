use std::sync::Arc;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth::require_admin,
    config::SessionLayer,
    handlers,
    middleware::{
        add_security_headers, csrf_middleware, host_routing_middleware, rate_limit_middleware,
        HostRouter, CSRF_HEADER,
    },
    AppState,
};

/// Credentialed CORS for the first-party sub-application origins.
///
/// The token header is exposed so browser code on another subdomain can read it.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    let csrf_header = HeaderName::from_static(CSRF_HEADER);

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::OPTIONS,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            csrf_header.clone(),
        ])
        .expose_headers([csrf_header])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Assemble the full application.
///
/// Host routing wraps the inner router so that rewritten paths are what the
/// inner router matches on. Sessions sit outside the CSRF middleware because
/// the middleware reads and writes the session.
pub fn build_router(
    state: AppState,
    host_router: Arc<HostRouter>,
    session_layer: SessionLayer,
    allowed_origins: &[String],
) -> Router {
    // Customer data; operators only
    let order_routes = Router::new()
        .route("/api/orders", get(handlers::list_orders_handler))
        .route(
            "/api/orders/{checkout_id}",
            get(handlers::get_order_handler),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let api_routes = Router::new()
        .route("/api/health", get(handlers::health_handler))
        .route("/api/csrf-token", get(handlers::csrf_token_handler))
        .route("/api/auth/signout", post(handlers::signout_handler))
        .merge(order_routes)
        .route(
            "/api/webhooks/polar",
            post(handlers::polar_webhook_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let page_routes = Router::new()
        .route("/landing", get(handlers::landing_page))
        .route("/shop", get(handlers::shop_index))
        .route("/shop/{*path}", get(handlers::shop_page))
        .route("/dashboard", get(handlers::dashboard_index))
        .route("/dashboard/{*path}", get(handlers::dashboard_page));

    let app = Router::new()
        .merge(api_routes)
        .merge(page_routes)
        .layer(middleware::from_fn_with_state(state.clone(), csrf_middleware))
        .layer(session_layer)
        .layer(middleware::from_fn(add_security_headers))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Router::new()
        .fallback_service(app)
        .layer(middleware::from_fn_with_state(
            host_router,
            host_routing_middleware,
        ))
}
