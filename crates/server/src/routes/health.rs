//! Health and service information endpoints.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::config::{Environment, ServerConfig};
use crate::db::DocumentStore;
use crate::state::AppState;

/// Liveness payload.
#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub app: String,
    pub version: &'static str,
    pub environment: Environment,
}

/// Readiness payload.
#[derive(Debug, Serialize)]
pub struct Readiness {
    pub status: &'static str,
}

/// Root payload.
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: &'static str,
    pub docs: &'static str,
}

/// Liveness health check endpoint.
///
/// Reports the service identity. Does not check dependencies.
pub async fn health<S>(State(state): State<AppState<S>>) -> Json<Health> {
    let config = state.config();
    Json(Health {
        status: "healthy",
        app: config.app_name.clone(),
        version: ServerConfig::VERSION,
        environment: config.environment,
    })
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
pub async fn readiness<S: DocumentStore>(
    State(state): State<AppState<S>>,
) -> (StatusCode, Json<Readiness>) {
    match state.store().ping().await {
        Ok(()) => (StatusCode::OK, Json(Readiness { status: "ready" })),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Readiness {
                    status: "unavailable",
                }),
            )
        }
    }
}

/// Service information at `/`.
pub async fn root<S>(State(state): State<AppState<S>>) -> Json<ServiceInfo> {
    let config = state.config();
    let docs = if config.environment == Environment::Production {
        "Disabled in production"
    } else {
        "/api/docs"
    };

    Json(ServiceInfo {
        message: format!("Welcome to {}", config.app_name),
        version: ServerConfig::VERSION,
        docs,
    })
}
