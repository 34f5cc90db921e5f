//! CLI command implementations.

pub mod admin;
pub mod health;
pub mod provision;
pub mod verify;

use skycart_server::config::{ConfigError, DatabaseConfig, validate_identifier};
use skycart_server::db::{self, PgStore};

/// Connect to the configured database, optionally overriding the namespace.
///
/// # Errors
///
/// Returns `ConnectError` if configuration is missing or the database is unreachable.
pub async fn connect(namespace: Option<&str>) -> Result<PgStore, ConnectError> {
    let config = DatabaseConfig::from_env()?;
    let namespace = resolve_namespace(&config, namespace)?;

    tracing::info!(namespace = %namespace, "Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;

    Ok(PgStore::new(pool, namespace))
}

/// The namespace to use: the override if given (validated), else the configured one.
///
/// # Errors
///
/// Returns `ConnectError::InvalidNamespace` if the override is not a plain identifier.
pub fn resolve_namespace(
    config: &DatabaseConfig,
    namespace: Option<&str>,
) -> Result<String, ConnectError> {
    match namespace {
        Some(ns) => {
            validate_identifier(ns).map_err(ConnectError::InvalidNamespace)?;
            Ok(ns.to_owned())
        }
        None => Ok(config.namespace.clone()),
    }
}

/// Errors that can occur while connecting to the database.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid `--namespace`.
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn config() -> DatabaseConfig {
        DatabaseConfig {
            database_url: SecretString::from("postgres://localhost/skycart"),
            namespace: "skycart".to_string(),
        }
    }

    #[test]
    fn test_namespace_override() {
        assert_eq!(resolve_namespace(&config(), None).unwrap(), "skycart");
        assert_eq!(resolve_namespace(&config(), Some("ci_42")).unwrap(), "ci_42");
        assert!(matches!(
            resolve_namespace(&config(), Some("drop table")),
            Err(ConnectError::InvalidNamespace(_))
        ));
    }
}
