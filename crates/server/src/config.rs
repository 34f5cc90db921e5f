//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Server
//! - `SKYCART_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SKYCART_DB_NAMESPACE` - Schema holding the collections (default: skycart)
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8000)
//! - `APP_NAME` - Name reported by `/health` (default: SkyCart API)
//! - `ENVIRONMENT` - development, staging, or production (default: development)
//! - `ALLOWED_ORIGINS` - Comma-separated CORS origins
//! - `LOG_FORMAT` - `json` or `text` (default: text)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag (default: `ENVIRONMENT`)
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)
//!
//! ## Provisioning
//! - `ADMIN_EMAIL` - Seeded admin email (default: admin@Skycart.com)
//! - `ADMIN_NAME` - Seeded admin display name (default: Admin)
//! - `ADMIN_PASSWORD_HASH` - Pre-computed PHC hash for the admin (preferred)
//! - `ADMIN_PASSWORD` - Plaintext admin password, hashed at provisioning time

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use serde::Serialize;
use thiserror::Error;

use skycart_core::{Email, PasswordHash};

/// Default email of the seeded administrator.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@Skycart.com";

/// Default namespace (`PostgreSQL` schema) for the collections.
pub const DEFAULT_NAMESPACE: &str = "skycart";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "changeme",
    "change_this",
    "replace",
    "placeholder",
    "password",
    "admin123",
    "123456",
    "todo",
    "fixme",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Lowercase name, as reported by `/health`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            _ => Err(format!(
                "must be development, staging, or production (got {s})"
            )),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("must be json or text (got {s})")),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Schema holding the collections
    pub namespace: String,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Name reported by health and root endpoints
    pub app_name: String,
    /// Deployment environment
    pub environment: Environment,
    /// CORS allowed origins
    pub allowed_origins: Vec<String>,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

impl ServerConfig {
    /// Service version reported by health and root endpoints.
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(env);

        let database_url = env.database_url("SKYCART_DATABASE_URL")?;
        let namespace = env.namespace()?;
        let host = env.parse_or("HOST", "0.0.0.0")?;
        let port = env.parse_or("PORT", "8000")?;
        let app_name = env.or_default("APP_NAME", "SkyCart API");
        let environment: Environment = env.parse_or("ENVIRONMENT", "development")?;
        let allowed_origins = env
            .optional("ALLOWED_ORIGINS")
            .map(|v| split_list(&v))
            .unwrap_or_default();
        let log_format = env.parse_or("LOG_FORMAT", "text")?;

        let sentry_dsn = env.optional("SENTRY_DSN");
        let sentry_environment = env
            .optional("SENTRY_ENVIRONMENT")
            .or_else(|| Some(environment.to_string()));
        let sentry_sample_rate = env.parse_or("SENTRY_SAMPLE_RATE", "1.0")?;
        let sentry_traces_sample_rate = env.parse_or("SENTRY_TRACES_SAMPLE_RATE", "0.0")?;

        Ok(Self {
            database_url,
            namespace,
            host,
            port,
            app_name,
            environment,
            allowed_origins,
            log_format,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Database connection settings, for tools that do not serve HTTP.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Schema holding the collections
    pub namespace: String,
}

impl DatabaseConfig {
    /// Load database settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if no database URL is set or the namespace is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load database settings through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`DatabaseConfig::from_env`].
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(env);
        Ok(Self {
            database_url: env.database_url("SKYCART_DATABASE_URL")?,
            namespace: env.namespace()?,
        })
    }
}

/// Where the seeded admin's password hash comes from.
#[derive(Clone)]
pub enum AdminPassword {
    /// Pre-computed PHC hash, stored as-is.
    Hash(PasswordHash),
    /// Plaintext to validate and hash at provisioning time.
    Plain(SecretString),
}

impl fmt::Debug for AdminPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash(hash) => f.debug_tuple("Hash").field(hash).finish(),
            Self::Plain(_) => f.debug_tuple("Plain").field(&"[REDACTED]").finish(),
        }
    }
}

/// Provisioning configuration: who the seeded administrator is.
#[derive(Debug, Clone)]
pub struct SeedConfig {
    /// Admin display name
    pub admin_name: String,
    /// Admin email
    pub admin_email: Email,
    /// Admin password source
    pub admin_password: AdminPassword,
}

impl SeedConfig {
    /// Load provisioning configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if no admin password source is set, the email or
    /// hash is malformed, or a production password looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load provisioning configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`SeedConfig::from_env`].
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(env);

        let admin_name = env.or_default("ADMIN_NAME", "Admin");
        let admin_email = Email::parse(&env.or_default("ADMIN_EMAIL", DEFAULT_ADMIN_EMAIL))
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_EMAIL".to_string(), e.to_string()))?;

        let admin_password = if let Some(hash) = env.optional("ADMIN_PASSWORD_HASH") {
            AdminPassword::Hash(PasswordHash::parse(&hash).map_err(|e| {
                ConfigError::InvalidEnvVar("ADMIN_PASSWORD_HASH".to_string(), e.to_string())
            })?)
        } else if let Some(plain) = env.optional("ADMIN_PASSWORD") {
            let environment: Environment = env.parse_or("ENVIRONMENT", "development")?;
            if environment == Environment::Production {
                reject_placeholder(&plain, "ADMIN_PASSWORD")?;
            }
            AdminPassword::Plain(SecretString::from(plain))
        } else {
            return Err(ConfigError::MissingEnvVar(
                "ADMIN_PASSWORD_HASH or ADMIN_PASSWORD".to_string(),
            ));
        };

        Ok(Self {
            admin_name,
            admin_email,
            admin_password,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with the typed accessors config loading needs.
struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional variable; empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parse_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }

    /// Namespace must be a plain SQL identifier since it is interpolated into DDL.
    fn namespace(&self) -> Result<String, ConfigError> {
        let namespace = self.or_default("SKYCART_DB_NAMESPACE", DEFAULT_NAMESPACE);
        validate_identifier(&namespace).map_err(|reason| {
            ConfigError::InvalidEnvVar("SKYCART_DB_NAMESPACE".to_string(), reason)
        })?;
        Ok(namespace)
    }
}

/// Check that `ident` is a lowercase SQL identifier (`[a-z_][a-z0-9_]*`, max 63 bytes).
///
/// # Errors
///
/// Returns a description of the first problem found.
pub fn validate_identifier(ident: &str) -> Result<(), String> {
    let mut chars = ident.chars();
    let Some(first) = chars.next() else {
        return Err("identifier cannot be empty".to_string());
    };
    if ident.len() > 63 {
        return Err("identifier must be at most 63 characters".to_string());
    }
    if !(first.is_ascii_lowercase() || first == '_') {
        return Err(format!("identifier must start with a-z or _ (got {ident})"));
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(format!("identifier may only contain a-z, 0-9, _ (got {ident})"));
    }
    Ok(())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Reject passwords that look like placeholders.
fn reject_placeholder(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}
