//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Service information
//! GET  /health                 - Liveness check (no dependencies)
//! GET  /health/ready           - Readiness check (pings the store)
//! ```
//!
//! Everything else answers `404 {"detail": "Route not found"}`.

pub mod health;

use std::time::Duration;

use axum::{Router, middleware::from_fn, routing::get};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::middleware::{correlation_id_middleware, cors_layer};
use crate::state::AppState;

/// Create all routes for the service.
pub fn routes<S: DocumentStore + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(health::root::<S>))
        .route("/health", get(health::health::<S>))
        .route("/health/ready", get(health::readiness::<S>))
        .fallback(not_found)
}

/// The complete application: routes, middleware, and state.
pub fn app<S: DocumentStore + 'static>(state: AppState<S>) -> Router {
    let cors = cors_layer(&state.config().allowed_origins);

    routes()
        .layer(from_fn(correlation_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        correlation_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(cors)
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

async fn not_found() -> AppError {
    AppError::NotFound("Route".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use skycart_core::EntityId;
    use skycart_core::schema::{CollectionSpec, IndexSpec};

    use super::*;
    use crate::config::ServerConfig;
    use crate::db::{Document, Filter, MemoryStore, StoreError};
    use crate::middleware::CORRELATION_ID_HEADER;

    /// A store whose database is never reachable.
    struct DownStore;

    impl DocumentStore for DownStore {
        async fn create_collection(&self, _: &CollectionSpec) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn create_index(&self, _: &str, _: &IndexSpec) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn insert(&self, _: &str, _: Value) -> Result<EntityId, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn count(&self, _: &str, _: &Filter) -> Result<u64, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn find_one(&self, _: &str, _: &Filter) -> Result<Option<Document>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    fn config(environment: &str) -> ServerConfig {
        let environment = environment.to_string();
        ServerConfig::from_lookup(|key| match key {
            "SKYCART_DATABASE_URL" => Some("postgres://localhost/skycart".to_string()),
            "APP_NAME" => Some("SkyCart API".to_string()),
            "ENVIRONMENT" => Some(environment.clone()),
            _ => None,
        })
        .unwrap()
    }

    fn memory_app() -> Router {
        app(AppState::new(config("development"), MemoryStore::new()))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(memory_app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "status": "healthy",
                "app": "SkyCart API",
                "version": ServerConfig::VERSION,
                "environment": "development",
            })
        );
    }

    #[tokio::test]
    async fn test_health_does_not_touch_store() {
        let app = app(AppState::new(config("production"), DownStore));
        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["environment"], "production");
    }

    #[tokio::test]
    async fn test_readiness() {
        let (status, body) = get_json(memory_app(), "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ready"}));

        let app = app(AppState::new(config("development"), DownStore));
        let (status, body) = get_json(app, "/health/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({"status": "unavailable"}));
    }

    #[tokio::test]
    async fn test_root() {
        let (status, body) = get_json(memory_app(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Welcome to SkyCart API");
        assert_eq!(body["docs"], "/api/docs");

        let app = app(AppState::new(config("production"), MemoryStore::new()));
        let (_, body) = get_json(app, "/").await;
        assert_eq!(body["docs"], "Disabled in production");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, body) = get_json(memory_app(), "/api/v1/carts").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"detail": "Route not found"}));
    }

    #[tokio::test]
    async fn test_correlation_id_echoed() {
        let response = memory_app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(CORRELATION_ID_HEADER, "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(CORRELATION_ID_HEADER).unwrap(),
            "abc-123"
        );
    }

    #[tokio::test]
    async fn test_correlation_id_generated() {
        let response = memory_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let id = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }
}
