//! Post-provisioning verification.
//!
//! # Usage
//!
//! ```bash
//! skycart verify
//! skycart verify --email ops@example.com
//! ```

use thiserror::Error;

use skycart_core::{Email, EmailError};
use skycart_server::config::DEFAULT_ADMIN_EMAIL;
use skycart_server::provision::{VerifyError, verify};

use super::ConnectError;

/// Errors that can occur during verification.
#[derive(Debug, Error)]
pub enum VerifyCommandError {
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Verification failed: {0}")]
    Verify(#[from] VerifyError),
}

/// The admin email to check: the argument, else `ADMIN_EMAIL`, else the default.
fn expected_email(arg: Option<&str>, env: Option<String>) -> Result<Email, EmailError> {
    let email = arg
        .map(str::to_owned)
        .or(env)
        .unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_owned());
    Email::parse(&email)
}

/// Verify the seeded admin.
///
/// # Errors
///
/// Returns `VerifyCommandError` if the database is unreachable or the
/// admin invariants do not hold.
pub async fn run(email: Option<&str>) -> Result<(), VerifyCommandError> {
    dotenvy::dotenv().ok();

    let email = expected_email(email, std::env::var("ADMIN_EMAIL").ok())?;
    let store = super::connect(None).await?;

    let report = verify(&store, &email).await?;

    tracing::info!(
        "Verified: admin {} (ID {}), {} user(s) total",
        report.admin.email,
        report.admin.id,
        report.users
    );
    Ok(())
}
