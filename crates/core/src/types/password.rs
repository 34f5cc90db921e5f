//! Password rules and the stored-hash wrapper.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Minimum plaintext password length, checked before hashing.
///
/// The `users.password` field carries the same minimum at the storage layer.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Errors from password validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// Plaintext password is shorter than [`MIN_PASSWORD_LENGTH`].
    #[error("password must be at least {min} characters")]
    TooShort {
        /// Required minimum length.
        min: usize,
    },
    /// A pre-computed hash is not a PHC-formatted string.
    #[error("password hash must be a PHC string (e.g. $argon2id$...)")]
    MalformedHash,
}

/// Validate a plaintext password before it is hashed.
///
/// # Errors
///
/// Returns `PasswordError::TooShort` if the password has fewer than
/// [`MIN_PASSWORD_LENGTH`] characters.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

/// A password hash in PHC string format (`$<algorithm>$...`).
///
/// Only the shape is checked here; hashing and verification live with the
/// caller that owns the hashing crate.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a PHC-formatted hash string.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::MalformedHash` unless the input starts with `$`,
    /// names an algorithm, and has at least one further `$`-separated segment.
    pub fn parse(s: &str) -> Result<Self, PasswordError> {
        let mut segments = s.split('$');
        let leading = segments.next();
        let algorithm = segments.next();
        let rest = segments.next();

        match (leading, algorithm, rest) {
            (Some(""), Some(alg), Some(r)) if !alg.is_empty() && !r.is_empty() => {
                Ok(Self(s.to_owned()))
            }
            _ => Err(PasswordError::MalformedHash),
        }
    }

    /// The algorithm identifier, e.g. `argon2id`.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        self.0.split('$').nth(1).unwrap_or("")
    }

    /// Returns the hash as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PasswordHash")
            .field(&format_args!("${}$[REDACTED]", self.algorithm()))
            .finish()
    }
}

impl TryFrom<String> for PasswordHash {
    type Error = PasswordError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PasswordHash> for String {
    fn from(hash: PasswordHash) -> Self {
        hash.0
    }
}
