use panel_auth::{
    build_router,
    config::AuthConfig,
    services::{GoogleIdentityProvider, GoogleOAuthClient, MongoStore},
    AppState,
};
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = AuthConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting panel auth service"
    );

    if config.jwt.uses_fallback_secret() {
        tracing::warn!("JWT_SECRET_KEY not set; signing tokens with the development fallback secret");
    }

    tracing::info!("Initializing database connection");
    let store = Arc::new(MongoStore::connect(&config.mongodb.uri, &config.mongodb.database).await?);
    store.initialize_indexes().await?;
    tracing::info!("Database initialized successfully");

    let google: Option<Arc<dyn GoogleIdentityProvider>> = match &config.google {
        Some(google_config) => {
            tracing::info!("Google sign-in enabled");
            Some(Arc::new(GoogleOAuthClient::new(google_config.clone())))
        }
        None => {
            tracing::warn!("Google OAuth not configured; social login routes will return errors");
            None
        }
    };

    let state = AppState::new(config.clone(), store.clone(), store, google);
    let app = build_router(state);

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

    service_core::axum::serve(listener, app.into_make_service())
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
