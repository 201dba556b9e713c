use bltnm::{
    config::{
        spawn_expired_session_cleanup, validate_production_config, AppConfig, SessionConfig,
    },
    db,
    middleware::{CsrfConfig, FixedWindowRateLimiter, HostRouter},
    repositories::SqliteOrderRepository,
    routes::build_router,
    AppState,
};

use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bltnm=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    validate_production_config()?;
    let config = AppConfig::from_env()?;

    // Database connection
    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    // Session store
    let session_store = SqliteStore::new(pool.clone()).with_table_name("sessions")?;
    session_store.migrate().await?;
    spawn_expired_session_cleanup(session_store.clone(), Duration::from_secs(60));
    let session_layer = SessionConfig::from_env().create_layer(session_store);

    let rate_limiter = Arc::new(FixedWindowRateLimiter::new(
        config.rate_limit_max_requests,
        config.rate_limit_window,
    ));

    // Elapsed windows are never read again; sweep them so the map stays bounded.
    {
        let rate_limiter = rate_limiter.clone();
        let mut interval = tokio::time::interval(rate_limiter.window().max(Duration::from_secs(1)));
        tokio::spawn(async move {
            loop {
                interval.tick().await;
                let purged = rate_limiter.purge_expired();
                if purged > 0 {
                    tracing::debug!("Purged {} expired rate limit windows", purged);
                }
            }
        });
    }

    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_API_TOKEN not set; order endpoints will refuse every request");
    }

    if config.webhook_secret.is_none() {
        tracing::warn!("POLAR_WEBHOOK_SECRET not set; webhook deliveries will be rejected");
    }

    let app_state = AppState::new(
        CsrfConfig::with_ttl(config.csrf_token_ttl),
        rate_limiter,
        Arc::new(SqliteOrderRepository::new(pool.clone())),
        config.webhook_secret.clone(),
    )
    .with_admin_token(config.admin_token.clone());

    let app = build_router(
        app_state,
        Arc::new(HostRouter::for_domain(&config.root_domain)),
        session_layer,
        &config.first_party_origins(),
    );

    let addr = SocketAddr::from((config.host, config.port));

    tracing::info!(
        "Serving {} (shop., dashboard.) on http://{}",
        config.root_domain,
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
