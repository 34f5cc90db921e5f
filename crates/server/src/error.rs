//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Errors are rendered as `{"detail": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;

/// Application-level error type for the service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::DuplicateKey { .. }) => StatusCode::CONFLICT,
            Self::Store(StoreError::Validation { .. } | StoreError::CheckViolation { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Store(StoreError::DuplicateKey { .. }) => "Resource already exists".to_string(),
            Self::Store(StoreError::Validation { source, .. }) => source.to_string(),
            Self::Store(StoreError::CheckViolation { .. }) => "Document failed validation".to_string(),
            Self::Store(_) => "Internal server error".to_string(),
            Self::NotFound(what) => format!("{what} not found"),
        };

        (status, Json(json!({ "detail": message }))).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn body(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_detail() {
        let (status, body) = body(AppError::NotFound("Route".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"detail": "Route not found"}));
    }

    #[tokio::test]
    async fn test_duplicate_key_is_conflict() {
        let err = AppError::from(StoreError::DuplicateKey {
            collection: "users".to_string(),
            index: "users_email_key".to_string(),
        });
        let (status, body) = body(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["detail"], "Resource already exists");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let err = AppError::from(StoreError::DataCorruption("secret detail".to_string()));
        let (status, body) = body(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");
    }
}
