//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password hashing and user registration

pub mod auth;
