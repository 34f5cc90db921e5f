//! SkyCart API service shell.
//!
//! Serves `/`, `/health`, and `/health/ready` on port 8000.
//!
//! # Architecture
//!
//! - Axum web framework
//! - `PostgreSQL` document store (JSONB collections) via sqlx
//! - Sentry error tracking, structured `tracing` logs
//!
//! The database pool connects lazily so the process answers `/health` even
//! while `PostgreSQL` is still starting; `/health/ready` reports whether it is
//! reachable.

#![cfg_attr(not(test), forbid(unsafe_code))]

use skycart_server::config::ServerConfig;
use skycart_server::db::{self, PgStore};
use skycart_server::{AppState, app, telemetry};

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let sentry_guard = telemetry::init_sentry(&config);

    telemetry::init_tracing(config.log_format);
    if sentry_guard.is_some() {
        tracing::info!("Sentry initialized");
    }

    tracing::info!(
        app = %config.app_name,
        version = ServerConfig::VERSION,
        environment = %config.environment,
        "Starting"
    );

    let pool = db::create_lazy_pool(&config.database_url).expect("Invalid database URL");
    let store = PgStore::new(pool, config.namespace.clone());
    tracing::info!(namespace = %config.namespace, "Database pool created");

    // NOTE: Provisioning is NOT run automatically on startup.
    // Run it explicitly via: cargo run -p skycart-cli -- provision

    let addr = config.socket_addr();
    let state = AppState::new(config, store);
    let router = app(state);

    tracing::info!("skycart listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    drop(sentry_guard);
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
