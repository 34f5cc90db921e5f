//! Core types for SkyCart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod password;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use password::{MIN_PASSWORD_LENGTH, PasswordError, PasswordHash, validate_password};
pub use status::*;
