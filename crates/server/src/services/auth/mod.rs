//! Authentication service.
//!
//! Password hashing (Argon2id, PHC strings) and user registration.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use chrono::Utc;

use skycart_core::{Email, PasswordHash, UserRole, validate_password};

use crate::db::{DocumentStore, NewUser, StoredUser, UserRepository};

/// Authentication service.
pub struct AuthService<'a, S> {
    users: UserRepository<'a, S>,
}

impl<'a, S: DocumentStore> AuthService<'a, S> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self {
            users: UserRepository::new(store),
        }
    }

    /// Register a user with a plaintext password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password is too short,
    /// `AuthError::UserAlreadyExists` if the email is taken, or
    /// `AuthError::Store` for other store failures.
    #[tracing::instrument(skip(self, password), fields(email = %email))]
    pub async fn register(
        &self,
        name: &str,
        email: &Email,
        password: &str,
        role: UserRole,
    ) -> Result<StoredUser, AuthError> {
        let password = hash_password(password)?;

        let user = NewUser {
            name: name.to_owned(),
            email: email.clone(),
            password,
            role,
            avatar: None,
            created_at: Utc::now(),
        };

        let created = self.users.create(&user).await.map_err(|e| {
            if e.is_duplicate_key() {
                AuthError::UserAlreadyExists
            } else {
                AuthError::Store(e)
            }
        })?;

        tracing::info!(user_id = %created.id, role = %created.role, "User registered");
        Ok(created)
    }
}

/// Validate and hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is shorter than
/// [`skycart_core::MIN_PASSWORD_LENGTH`].
pub fn hash_password(password: &str) -> Result<PasswordHash, AuthError> {
    validate_password(password)?;

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let encoded = argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)?;

    PasswordHash::parse(&encoded).map_err(|_| AuthError::PasswordHash)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use argon2::password_hash::PasswordVerifier;
    use skycart_core::schema::users;

    use super::*;
    use crate::db::MemoryStore;

    #[test]
    fn test_hash_is_verifiable_argon2id() {
        let hash = hash_password("hunter22").unwrap();
        assert_eq!(hash.algorithm(), "argon2id");

        let parsed = argon2::password_hash::PasswordHash::new(hash.as_str()).unwrap();
        assert!(Argon2::default().verify_password(b"hunter22", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"hunter23", &parsed).is_err());
    }

    #[test]
    fn test_short_password_rejected_before_hashing() {
        assert!(matches!(
            hash_password("abc12"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(hash_password("abc123").is_ok());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let store = MemoryStore::new();
        let spec = users();
        store.create_collection(&spec).await.unwrap();
        for index in &spec.indexes {
            store.create_index(spec.name, index).await.unwrap();
        }

        let auth = AuthService::new(&store);
        let email = Email::parse("jo@example.com").unwrap();
        let user = auth
            .register("Jo", &email, "secret1", UserRole::User)
            .await
            .unwrap();
        assert_eq!(user.role, UserRole::User);

        assert!(matches!(
            auth.register("Jo", &email, "secret2", UserRole::Admin).await,
            Err(AuthError::UserAlreadyExists)
        ));
    }
}
