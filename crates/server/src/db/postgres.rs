//! `PostgreSQL` document store.

use serde_json::Value;
use sqlx::PgPool;
use tracing::instrument;

use skycart_core::EntityId;
use skycart_core::schema::{CollectionSpec, IndexSpec};

use super::{Document, DocumentStore, Filter, StoreError, ddl};

const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";
const UNDEFINED_TABLE: &str = "42P01";

/// Collections stored as JSONB tables inside one schema.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    namespace: String,
}

impl PgStore {
    /// Create a store over `pool`, keeping every table in schema `namespace`.
    ///
    /// `namespace` is trusted; validate user input with
    /// [`crate::config::validate_identifier`] first.
    #[must_use]
    pub fn new(pool: PgPool, namespace: impl Into<String>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
        }
    }

    /// Schema holding the collections.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Drop the schema and everything in it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the statement fails.
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn drop_namespace(&self) -> Result<(), StoreError> {
        let sql = format!(
            "DROP SCHEMA IF EXISTS {} CASCADE",
            ddl::quote_ident(&self.namespace)
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }
}

impl std::fmt::Debug for PgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStore")
            .field("namespace", &self.namespace)
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}

/// Translate constraint errors into store errors that name the collection.
fn map_error(collection: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let constraint = db_err.constraint().unwrap_or_default().to_owned();
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                return StoreError::DuplicateKey {
                    collection: collection.to_owned(),
                    index: constraint,
                };
            }
            Some(CHECK_VIOLATION) => {
                return StoreError::CheckViolation {
                    collection: collection.to_owned(),
                    constraint,
                };
            }
            Some(UNDEFINED_TABLE) => {
                return StoreError::UnknownCollection(collection.to_owned());
            }
            _ => {}
        }
    }
    StoreError::Database(err)
}

impl DocumentStore for PgStore {
    #[instrument(skip(self, spec), fields(namespace = %self.namespace, collection = spec.name))]
    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&ddl::create_schema(&self.namespace))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&ddl::create_collection(&self.namespace, spec))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::debug!("Collection ready");
        Ok(())
    }

    #[instrument(skip(self, index), fields(namespace = %self.namespace, index = %index.name(collection)))]
    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<(), StoreError> {
        sqlx::query(&ddl::create_index(&self.namespace, collection, index))
            .execute(&self.pool)
            .await
            .map_err(|e| map_error(collection, e))?;

        tracing::debug!("Index ready");
        Ok(())
    }

    #[instrument(skip(self, document), fields(namespace = %self.namespace))]
    async fn insert(&self, collection: &str, document: Value) -> Result<EntityId, StoreError> {
        if !document.is_object() {
            return Err(StoreError::Validation {
                collection: collection.to_owned(),
                source: skycart_core::schema::ValidationError::NotAnObject,
            });
        }

        let id: i64 = sqlx::query_scalar(&ddl::insert(&self.namespace, collection))
            .bind(&document)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_error(collection, e))?;

        Ok(EntityId::from(id))
    }

    #[instrument(skip(self, filter), fields(namespace = %self.namespace))]
    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(&ddl::count(&self.namespace, collection))
            .bind(filter.to_containment())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_error(collection, e))?;

        u64::try_from(count)
            .map_err(|_| StoreError::DataCorruption(format!("negative count {count}")))
    }

    #[instrument(skip(self, filter), fields(namespace = %self.namespace))]
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let row: Option<(i64, Value)> =
            sqlx::query_as(&ddl::find_one(&self.namespace, collection))
                .bind(filter.to_containment())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_error(collection, e))?;

        Ok(row.map(|(id, body)| Document {
            id: EntityId::from(id),
            body,
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
