//! Provisioning command.
//!
//! # Usage
//!
//! ```bash
//! skycart provision
//! skycart provision --namespace staging_skycart
//! skycart provision --dry-run
//! ```
//!
//! # Environment Variables
//!
//! - `SKYCART_DATABASE_URL` / `DATABASE_URL` - `PostgreSQL` connection string
//! - `SKYCART_DB_NAMESPACE` - Schema holding the collections
//! - `ADMIN_EMAIL`, `ADMIN_NAME` - Seeded admin identity
//! - `ADMIN_PASSWORD_HASH` or `ADMIN_PASSWORD` - Seeded admin password

use std::io::Write;

use thiserror::Error;

use skycart_core::schema::catalog;
use skycart_server::config::{ConfigError, DEFAULT_NAMESPACE, SeedConfig, validate_identifier};
use skycart_server::provision::{AdminSeed, ProvisionError, ProvisionPlan, Provisioner};
use skycart_server::services::auth::AuthError;

use super::ConnectError;

/// Errors that can occur during provisioning.
#[derive(Debug, Error)]
pub enum ProvisionCommandError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The admin password could not be prepared.
    #[error("Admin password error: {0}")]
    Password(#[from] AuthError),

    /// Database connection error.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// A provisioning step failed.
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    /// The dry-run plan could not be written.
    #[error("Failed to write plan: {0}")]
    Output(#[from] std::io::Error),
}

/// Run the standard plan against `PostgreSQL`.
///
/// # Errors
///
/// Returns `ProvisionCommandError` if configuration is invalid, the database
/// is unreachable, or any step fails.
pub async fn run(namespace: Option<&str>) -> Result<(), ProvisionCommandError> {
    let seed = AdminSeed::from_config(&SeedConfig::from_env()?)?;
    let plan = ProvisionPlan::standard(seed);

    let store = super::connect(namespace).await?;
    tracing::info!(steps = plan.steps().len(), namespace = store.namespace(), "Provisioning...");

    let report = Provisioner::new(&store).run(&plan).await?;

    tracing::info!(
        collections = report.collections,
        indexes = report.indexes,
        admin_id = ?report.admin_id.map(i64::from),
        "Database initialized successfully!"
    );
    Ok(())
}

/// Write the SQL the standard plan would run to `out`, without connecting.
///
/// Each statement is terminated with `;` so the output can be fed to `psql`.
/// The admin insert is left out since no seed needs to be configured.
///
/// # Errors
///
/// Returns `ProvisionCommandError::Config` if the namespace is invalid, or
/// `ProvisionCommandError::Output` if writing fails.
pub fn dry_run(namespace: Option<&str>, out: &mut impl Write) -> Result<(), ProvisionCommandError> {
    let _ = dotenvy::dotenv();

    let namespace = namespace
        .map(str::to_owned)
        .or_else(|| std::env::var("SKYCART_DB_NAMESPACE").ok())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned());
    validate_identifier(&namespace)
        .map_err(|reason| ConfigError::InvalidEnvVar("namespace".to_owned(), reason))?;

    let statements = render(&namespace);
    for sql in &statements {
        writeln!(out, "{sql};\n")?;
    }
    out.flush()?;

    tracing::info!(
        statements = statements.len(),
        namespace = %namespace,
        "Dry run complete; nothing was executed"
    );
    Ok(())
}

/// SQL for the standard plan in `namespace`.
fn render(namespace: &str) -> Vec<String> {
    ProvisionPlan::new(&catalog(), None).render_sql(namespace)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_render_has_schema_tables_and_indexes() {
        let sql = render("skycart");
        assert_eq!(sql.first().unwrap(), "CREATE SCHEMA IF NOT EXISTS \"skycart\"");
        assert_eq!(
            sql.iter().filter(|s| s.starts_with("CREATE TABLE")).count(),
            3
        );
        assert_eq!(sql.iter().filter(|s| s.contains(" INDEX ")).count(), 12);
    }

    #[test]
    fn test_dry_run_writes_every_statement() {
        let mut out = Vec::new();
        dry_run(Some("preview"), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("CREATE SCHEMA IF NOT EXISTS \"preview\";\n"));
        assert_eq!(text.matches(";\n").count(), render("preview").len());
        assert!(text.contains("CREATE TABLE IF NOT EXISTS \"preview\".\"users\""));
        assert!(text.contains("\"users_email_key\""));
        assert!(!text.contains("INSERT"));
    }

    #[test]
    fn test_dry_run_rejects_bad_namespace() {
        let mut out = Vec::new();
        assert!(matches!(
            dry_run(Some("Bad-Name"), &mut out),
            Err(ProvisionCommandError::Config(_))
        ));
        assert!(out.is_empty());
    }
}
