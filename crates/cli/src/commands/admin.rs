//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! SKYCART_NEW_USER_PASSWORD='...' skycart admin create -e jo@example.com -n "Jo" -r admin
//! ```
//!
//! # Environment Variables
//!
//! - `SKYCART_DATABASE_URL` / `DATABASE_URL` - `PostgreSQL` connection string
//! - `SKYCART_NEW_USER_PASSWORD` - Password for the new user (never passed as an argument)

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use skycart_core::{Email, UserId, UserRole};
use skycart_server::services::auth::{AuthError, AuthService};

use super::ConnectError;

/// Environment variable holding the new user's password.
pub const PASSWORD_ENV: &str = "SKYCART_NEW_USER_PASSWORD";

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: user, admin")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    /// Database connection error.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Registration failed.
    #[error("Registration failed: {0}")]
    Auth(AuthError),
}

/// Parsed and validated `admin create` arguments.
#[derive(Debug)]
struct NewUserArgs {
    email: Email,
    role: UserRole,
    password: SecretString,
}

fn parse_args(
    email: &str,
    role: &str,
    password: Option<String>,
) -> Result<NewUserArgs, AdminError> {
    let role: UserRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;

    let email = Email::parse(email).map_err(|e| AdminError::InvalidEmail(e.to_string()))?;

    let password = password
        .filter(|p| !p.is_empty())
        .map(SecretString::from)
        .ok_or(AdminError::MissingEnvVar(PASSWORD_ENV))?;

    Ok(NewUserArgs {
        email,
        role,
        password,
    })
}

/// Create a new user.
///
/// # Arguments
///
/// * `email` - User's email address
/// * `name` - User's display name
/// * `role` - User's role (`user` or `admin`)
///
/// # Returns
///
/// The ID of the created user.
pub async fn create_user(email: &str, name: &str, role: &str) -> Result<UserId, AdminError> {
    dotenvy::dotenv().ok();

    let args = parse_args(email, role, std::env::var(PASSWORD_ENV).ok())?;

    let store = super::connect(None).await?;

    tracing::info!("Creating user: {} ({})", args.email, args.role);

    let user = AuthService::new(&store)
        .register(name, &args.email, args.password.expose_secret(), args.role)
        .await
        .map_err(|e| match e {
            AuthError::UserAlreadyExists => AdminError::UserExists(args.email.to_string()),
            other => AdminError::Auth(other),
        })?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );

    Ok(user.id)
}
