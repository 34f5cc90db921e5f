//! The seeded administrator.

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;

use skycart_core::{Email, PasswordHash, UserRole};

use crate::config::{AdminPassword, SeedConfig};
use crate::db::NewUser;
use crate::services::auth::{AuthError, hash_password};

/// The admin account inserted at the end of provisioning.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub name: String,
    pub email: Email,
    pub password: PasswordHash,
}

impl AdminSeed {
    /// Build the seed from configuration, hashing a plaintext password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if a plaintext password is shorter
    /// than six characters, or `AuthError::PasswordHash` if hashing fails.
    pub fn from_config(config: &SeedConfig) -> Result<Self, AuthError> {
        let password = match &config.admin_password {
            AdminPassword::Hash(hash) => hash.clone(),
            AdminPassword::Plain(secret) => hash_password(secret.expose_secret())?,
        };

        Ok(Self {
            name: config.admin_name.clone(),
            email: config.admin_email.clone(),
            password,
        })
    }

    /// The user record to insert, stamped with `now`.
    #[must_use]
    pub fn to_new_user(&self, now: DateTime<Utc>) -> NewUser {
        NewUser {
            name: self.name.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            role: UserRole::Admin,
            avatar: None,
            created_at: now,
        }
    }
}
