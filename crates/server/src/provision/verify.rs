//! Post-provisioning checks.

use thiserror::Error;

use skycart_core::{Email, UserRole};

use crate::db::{DocumentStore, StoreError, StoredUser, UserRepository};

/// Errors reported by [`verify`].
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("no admin user found")]
    NoAdmin,

    #[error("expected exactly one admin user, found {0}")]
    MultipleAdmins(u64),

    #[error("the admin user is not {0}")]
    AdminEmailMismatch(Email),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// What a successful verification found.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub admin: StoredUser,
    pub users: u64,
}

/// Check that exactly one admin exists and that it has `email`.
///
/// # Errors
///
/// Returns a `VerifyError` describing the first invariant that does not hold.
#[tracing::instrument(skip(store), fields(email = %email))]
pub async fn verify<S: DocumentStore>(store: &S, email: &Email) -> Result<VerifyReport, VerifyError> {
    let users = UserRepository::new(store);

    match users.count_by_role(UserRole::Admin).await? {
        0 => return Err(VerifyError::NoAdmin),
        1 => {}
        n => return Err(VerifyError::MultipleAdmins(n)),
    }

    let admin = users
        .find_by_email(email)
        .await?
        .filter(|user| user.role == UserRole::Admin)
        .ok_or_else(|| VerifyError::AdminEmailMismatch(email.clone()))?;

    let report = VerifyReport {
        admin,
        users: users.count().await?,
    };

    tracing::info!(admin_id = %report.admin.id, users = report.users, "Verification passed");
    Ok(report)
}
