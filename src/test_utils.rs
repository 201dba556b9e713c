pub mod test_helpers {
    use std::{sync::Arc, time::Duration};

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, Response},
        Router,
    };
    use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
    use tower_sessions_sqlx_store::SqliteStore;

    use crate::{
        config::{SessionConfig, SessionLayer},
        middleware::{CsrfConfig, FixedWindowRateLimiter, HostRouter},
        repositories::SqliteOrderRepository,
        routes::build_router,
        AppState,
    };

    pub const TEST_ROOT_DOMAIN: &str = "bltnm.store";
    pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";
    pub const TEST_ADMIN_TOKEN: &str = "admin_test_token";

    /// Create a new in-memory SQLite database for testing
    pub async fn create_test_db() -> Result<SqlitePool, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(pool)
    }

    /// Session layer backed by the given pool, configured from the environment
    pub async fn create_session_layer(pool: SqlitePool) -> Result<SessionLayer, sqlx::Error> {
        let store = SqliteStore::new(pool)
            .with_table_name("sessions")
            .map_err(|e| sqlx::Error::Configuration(e.into()))?;
        store.migrate().await?;

        Ok(SessionConfig::from_env().create_layer(store))
    }

    /// Knobs for [`build_test_app`].
    #[derive(Debug, Clone)]
    pub struct TestAppOptions {
        pub max_requests: u32,
        pub window: Duration,
        pub token_ttl: Option<Duration>,
        pub webhook_secret: Option<String>,
        pub admin_token: Option<String>,
    }

    impl Default for TestAppOptions {
        fn default() -> Self {
            Self {
                max_requests: 1_000,
                window: Duration::from_secs(60),
                token_ttl: None,
                webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
                admin_token: Some(TEST_ADMIN_TOKEN.to_string()),
            }
        }
    }

    /// Full application router over an in-memory database
    pub async fn build_test_app(options: TestAppOptions) -> (Router, SqlitePool) {
        let pool = create_test_db().await.expect("test database");
        let session_layer = create_session_layer(pool.clone())
            .await
            .expect("session store");

        let state = AppState::new(
            CsrfConfig::with_ttl(options.token_ttl),
            Arc::new(FixedWindowRateLimiter::new(
                options.max_requests,
                options.window,
            )),
            Arc::new(SqliteOrderRepository::new(pool.clone())),
            options.webhook_secret,
        )
        .with_admin_token(options.admin_token);

        let router = build_router(
            state,
            Arc::new(HostRouter::for_domain(TEST_ROOT_DOMAIN)),
            session_layer,
            &[],
        );

        (router, pool)
    }

    /// `name=value` pair of the session cookie set by a response, if any
    pub fn session_cookie<B>(response: &Response<B>) -> Option<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .find(|pair| pair.starts_with("session=") || pair.starts_with("__Host-session="))
            .map(String::from)
    }

    pub fn get(uri: &str, host: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .header(header::HOST, host)
            .body(Body::empty())
            .expect("request to build")
    }

    /// GET carrying the test admin bearer token
    pub fn admin_get(uri: &str, host: &str) -> Request<Body> {
        let mut request = get(uri, host);
        request.headers_mut().insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", TEST_ADMIN_TOKEN))
                .expect("valid header value"),
        );
        request
    }

    pub async fn body_json(response: Response<Body>) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body to be readable");
        serde_json::from_slice(&bytes).expect("body to be JSON")
    }

    pub async fn body_string(response: Response<Body>) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body to be readable");
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
