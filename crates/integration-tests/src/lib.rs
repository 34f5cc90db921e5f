//! Integration tests for SkyCart.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (no external services)
//! cargo test -p skycart-integration-tests
//!
//! # Tests against PostgreSQL
//! SKYCART_TEST_DATABASE_URL=postgres://localhost/skycart_test \
//!     cargo test -p skycart-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `health` - Service shell over real HTTP
//! - `provisioning` - Provisioning and storage invariants in `PostgreSQL`
//!
//! Every `PostgreSQL` test runs in its own randomly named schema, dropped
//! when the test finishes.

use std::net::SocketAddr;

use secrecy::SecretString;
use uuid::Uuid;

use skycart_server::config::ServerConfig;
use skycart_server::db::{self, DocumentStore, PgStore};
use skycart_server::{AppState, app};

/// Variable holding the test database URL.
pub const TEST_DATABASE_URL: &str = "SKYCART_TEST_DATABASE_URL";

/// Test database URL from the environment.
///
/// # Panics
///
/// Panics if `SKYCART_TEST_DATABASE_URL` is unset.
#[must_use]
pub fn test_database_url() -> SecretString {
    let url = std::env::var(TEST_DATABASE_URL)
        .unwrap_or_else(|_| panic!("{TEST_DATABASE_URL} must be set for database tests"));
    SecretString::from(url)
}

/// A store in a fresh, uniquely named schema.
pub struct TestDatabase {
    pub store: PgStore,
}

impl TestDatabase {
    /// Connect and pick a new namespace. Nothing is created until provisioning.
    ///
    /// # Panics
    ///
    /// Panics if the database is unreachable.
    pub async fn new() -> Self {
        let pool = db::create_pool(&test_database_url())
            .await
            .expect("Failed to connect to test database");
        let namespace = format!("test_{}", Uuid::new_v4().simple());
        Self {
            store: PgStore::new(pool, namespace),
        }
    }

    /// Drop the schema.
    ///
    /// # Panics
    ///
    /// Panics if the schema cannot be dropped.
    pub async fn cleanup(self) {
        self.store
            .drop_namespace()
            .await
            .expect("Failed to drop test namespace");
    }
}

/// Configuration for an in-process server.
///
/// # Panics
///
/// Panics if the fixed test configuration fails to load.
#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig::from_lookup(|key| match key {
        "SKYCART_DATABASE_URL" => Some("postgres://localhost/skycart_test".to_string()),
        "APP_NAME" => Some("SkyCart API".to_string()),
        "ENVIRONMENT" => Some("development".to_string()),
        _ => None,
    })
    .expect("Failed to build test configuration")
}

/// Serve the application on an ephemeral port and return its base URL.
///
/// # Panics
///
/// Panics if no local port can be bound.
pub async fn spawn_app<S: DocumentStore + 'static>(store: S) -> String {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");

    let router = app(AppState::new(test_config(), store));
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Test server error");
    });

    format!("http://{addr}")
}
