//! HTTP health probe.
//!
//! Used as the container `HEALTHCHECK`, so it must exit non-zero on any
//! failure: connection errors, timeouts, and non-2xx responses.

use std::time::Duration;

use thiserror::Error;

/// Default probe target.
pub const DEFAULT_URL: &str = "http://127.0.0.1:8000/health";

/// Errors that can occur during the probe.
#[derive(Debug, Error)]
pub enum HealthError {
    #[error("Health request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unhealthy: {url} returned {status}")]
    Unhealthy {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// GET `url`, succeeding only on a 2xx response within `timeout_secs`.
///
/// # Errors
///
/// Returns `HealthError` if the request fails or the status is not 2xx.
pub async fn probe(url: &str, timeout_secs: u64) -> Result<(), HealthError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;

    let response = client.get(url).send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(HealthError::Unhealthy {
            url: url.to_owned(),
            status,
        });
    }

    tracing::info!(%status, "Healthy");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, http::StatusCode, routing::get};

    use super::*;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/health")
    }

    #[tokio::test]
    async fn test_probe_healthy() {
        let url = serve(Router::new().route("/health", get(|| async { "ok" }))).await;
        assert!(probe(&url, 5).await.is_ok());
    }

    #[tokio::test]
    async fn test_probe_unhealthy_status() {
        let url = serve(Router::new().route(
            "/health",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;
        let err = probe(&url, 5).await.unwrap_err();
        assert!(matches!(
            err,
            HealthError::Unhealthy { status, .. } if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[tokio::test]
    async fn test_probe_connection_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = probe(&format!("http://{addr}/health"), 2).await;
        assert!(matches!(result, Err(HealthError::Request(_))));
    }
}
