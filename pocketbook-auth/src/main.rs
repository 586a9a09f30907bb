use pocketbook_auth::{
    build_router,
    config::AuthConfig,
    services::{AccountService, AuthService, GoogleAuthService, TokenService},
    store::{AccountStore, PgAccountStore},
    AppState,
};
use pocketbook_core::middleware::rate_limit::create_ip_rate_limiter;
use pocketbook_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), pocketbook_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = AuthConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting authentication service"
    );

    // Initialize database connection and schema
    tracing::info!("Connecting to database");
    let pool = pocketbook_auth::db::create_pool(&config.database).await?;
    pocketbook_auth::db::run_migrations(&pool)
        .await
        .map_err(|e| {
            pocketbook_core::error::AppError::InternalError(anyhow::anyhow!(
                "Migration failed: {}",
                e
            ))
        })?;
    tracing::info!("Database initialized successfully");

    let store: Arc<dyn AccountStore> = Arc::new(PgAccountStore::new(pool));

    // Initialize services
    let tokens = TokenService::new(&config.jwt);
    let auth = AuthService::new(store.clone(), tokens.clone());
    let accounts = AccountService::new(store.clone(), config.google.default_age);
    let google = GoogleAuthService::new(config.google.clone(), store.clone(), accounts.clone())
        .map_err(pocketbook_core::error::AppError::from)?;

    // Initialize rate limiters using shared logic
    let login_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );
    tracing::info!("Rate limiters initialized: Login and Global IP");

    let state = AppState {
        config: config.clone(),
        store,
        tokens,
        auth,
        accounts,
        google,
        login_rate_limiter,
        ip_rate_limiter,
    };

    let app = build_router(state).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );
    let _guard = service_span.enter();

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
