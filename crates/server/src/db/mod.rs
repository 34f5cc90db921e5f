//! Document stores for the SkyCart collections.
//!
//! # Storage: `PostgreSQL` namespace (default `skycart`)
//!
//! Each collection is a table holding one JSONB document per row:
//!
//! ## Tables
//!
//! - `users` - Accounts; the only collection with field rules
//! - `products` - Catalog, unstructured apart from its indexes
//! - `orders` - Orders keyed by user, status, age, and payment transaction
//!
//! Field rules and indexes come from [`skycart_core::schema`]; [`ddl`] renders
//! them into `CHECK` constraints and expression indexes.
//!
//! # Provisioning
//!
//! Tables and the seeded admin are created via:
//! ```bash
//! cargo run -p skycart-cli -- provision
//! ```

pub mod ddl;
pub mod memory;
pub mod postgres;
pub mod users;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use serde_json::{Map, Value};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use skycart_core::EntityId;
use skycart_core::schema::{CollectionSpec, IndexSpec, ValidationError, lookup};

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use users::{NewUser, StoredUser, UserRepository};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The collection has not been created.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// The document failed the collection's field rules.
    #[error("validation failed in {collection}: {source}")]
    Validation {
        collection: String,
        #[source]
        source: ValidationError,
    },

    /// The database rejected the document through a named `CHECK` constraint.
    #[error("constraint {constraint} rejected document in {collection}")]
    CheckViolation {
        collection: String,
        constraint: String,
    },

    /// A unique index already holds the document's key.
    #[error("duplicate key in {collection} for index {index}")]
    DuplicateKey { collection: String, index: String },

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl StoreError {
    /// Whether this error reports a rule violation on field `path`.
    ///
    /// Works for both the in-memory validator and database `CHECK` constraints.
    #[must_use]
    pub fn violates(&self, path: &str) -> bool {
        match self {
            Self::Validation { source, .. } => source.touches(path),
            Self::CheckViolation {
                collection,
                constraint,
            } => *constraint == ddl::check_name(collection, path),
            _ => false,
        }
    }

    /// Whether this error is a unique-index collision.
    #[must_use]
    pub const fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}

/// A stored document and the ID its collection assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: EntityId,
    pub body: Value,
}

/// Conjunction of equality conditions on dotted paths.
///
/// Intended for scalar values; `PgStore` evaluates it with JSONB containment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Filter matching every document.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an equality condition.
    #[must_use]
    pub fn eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((path.into(), value.into()));
        self
    }

    /// Whether `document` satisfies every condition.
    #[must_use]
    pub fn matches(&self, document: &Value) -> bool {
        self.conditions
            .iter()
            .all(|(path, expected)| lookup(document, path) == Some(expected))
    }

    /// Nested object for a JSONB `@>` containment query.
    #[must_use]
    pub fn to_containment(&self) -> Value {
        let mut root = Map::new();
        for (path, value) in &self.conditions {
            let nested = path.rsplit('.').fold(value.clone(), |inner, segment| {
                Value::Object(Map::from_iter([(segment.to_owned(), inner)]))
            });
            if let Value::Object(nested) = nested {
                merge_objects(&mut root, nested);
            }
        }
        Value::Object(root)
    }
}

/// Deep-merge `source` into `target`; non-object values from `source` win.
fn merge_objects(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        match value {
            Value::Object(incoming) => {
                if let Some(Value::Object(existing)) = target.get_mut(&key) {
                    merge_objects(existing, incoming);
                } else {
                    target.insert(key, Value::Object(incoming));
                }
            }
            value => {
                target.insert(key, value);
            }
        }
    }
}

/// A store of JSON documents grouped into collections.
///
/// Implementations enforce the field rules and unique indexes declared by the
/// [`CollectionSpec`] a collection was created with.
pub trait DocumentStore: Send + Sync {
    /// Create a collection and its validator. Creating an existing collection is a no-op.
    fn create_collection(
        &self,
        spec: &CollectionSpec,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Create an index. Creating an existing index is a no-op.
    fn create_index(
        &self,
        collection: &str,
        index: &IndexSpec,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Insert a document, returning its assigned ID.
    fn insert(
        &self,
        collection: &str,
        document: Value,
    ) -> impl Future<Output = Result<EntityId, StoreError>> + Send;

    /// Count documents matching `filter`.
    fn count(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// First matching document in insertion order.
    fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;

    /// Check that the store is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Create a pool that connects on first use.
///
/// The service uses this so it can start (and answer `/health`) before the
/// database is reachable.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection string cannot be parsed.
pub fn create_lazy_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(database_url.expose_secret())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_filter_matches_nested_paths() {
        let doc = json!({"role": "admin", "payment_info": {"id": "pi_1"}});
        assert!(Filter::all().matches(&doc));
        assert!(Filter::all().eq("role", "admin").matches(&doc));
        assert!(Filter::all().eq("payment_info.id", "pi_1").matches(&doc));
        assert!(!Filter::all()
            .eq("role", "admin")
            .eq("payment_info.id", "pi_2")
            .matches(&doc));
        assert!(!Filter::all().eq("missing", Value::Null).matches(&doc));
    }

    #[test]
    fn test_filter_containment_object() {
        let filter = Filter::all()
            .eq("role", "admin")
            .eq("payment_info.id", "pi_1")
            .eq("payment_info.status", "succeeded");
        assert_eq!(
            filter.to_containment(),
            json!({"role": "admin", "payment_info": {"id": "pi_1", "status": "succeeded"}})
        );
        assert_eq!(Filter::all().to_containment(), json!({}));
    }

    #[test]
    fn test_containment_nested_path_replaces_scalar() {
        let filter = Filter::all().eq("payment_info", "none").eq("payment_info.id", "pi_1");
        assert_eq!(filter.to_containment(), json!({"payment_info": {"id": "pi_1"}}));

        let filter = Filter::all().eq("a.b.c", 1).eq("a.b.d", 2).eq("a.e", 3);
        assert_eq!(filter.to_containment(), json!({"a": {"b": {"c": 1, "d": 2}, "e": 3}}));
    }

    #[test]
    fn test_violates_matches_check_constraint_name() {
        let err = StoreError::CheckViolation {
            collection: "users".to_string(),
            constraint: "users_role_check".to_string(),
        };
        assert!(err.violates("role"));
        assert!(!err.violates("password"));
        assert!(!err.is_duplicate_key());
    }
}
