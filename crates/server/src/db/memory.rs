//! In-memory document store.
//!
//! Enforces the same field rules and unique indexes as [`super::PgStore`], so
//! provisioning and the HTTP shell can be exercised without a database.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;

use skycart_core::EntityId;
use skycart_core::schema::{CollectionSpec, IndexSpec, lookup, validate_document};

use super::{Document, DocumentStore, Filter, StoreError};

#[derive(Debug)]
struct Collection {
    spec: CollectionSpec,
    indexes: Vec<IndexSpec>,
    documents: Vec<Document>,
}

impl Collection {
    /// Name of the first unique index that `document` would collide on.
    ///
    /// Documents missing the indexed field never collide.
    fn collision(&self, document: &Value) -> Option<String> {
        self.indexes.iter().filter(|i| i.is_unique()).find_map(|index| {
            let IndexSpec::Single { path, .. } = index else {
                return None;
            };
            let key = lookup(document, path)?;
            self.documents
                .iter()
                .any(|existing| lookup(&existing.body, path) == Some(key))
                .then(|| index.name(self.spec.name))
        })
    }
}

#[derive(Debug, Default)]
struct Inner {
    collections: HashMap<String, Collection>,
    next_id: i64,
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of created collections, sorted.
    pub async fn collections(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut names: Vec<_> = inner.collections.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of the indexes on `collection`, in creation order.
    pub async fn indexes(&self, collection: &str) -> Vec<String> {
        let inner = self.inner.read().await;
        inner
            .collections
            .get(collection)
            .map(|c| c.indexes.iter().map(|i| i.name(collection)).collect())
            .unwrap_or_default()
    }
}

impl DocumentStore for MemoryStore {
    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .collections
            .entry(spec.name.to_owned())
            .or_insert_with(|| Collection {
                spec: spec.clone(),
                indexes: Vec::new(),
                documents: Vec::new(),
            });
        Ok(())
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let coll = inner
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_owned()))?;

        let name = index.name(collection);
        if coll.indexes.iter().any(|i| i.name(collection) == name) {
            return Ok(());
        }

        if let IndexSpec::Single {
            path, unique: true, ..
        } = index
        {
            let mut keys: Vec<&Value> = coll
                .documents
                .iter()
                .filter_map(|d| lookup(&d.body, path))
                .collect();
            let total = keys.len();
            keys.sort_by_key(|v| v.to_string());
            keys.dedup();
            if keys.len() != total {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_owned(),
                    index: name,
                });
            }
        }

        coll.indexes.push(index.clone());
        Ok(())
    }

    async fn insert(&self, collection: &str, document: Value) -> Result<EntityId, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = EntityId::from(inner.next_id);

        let coll = inner
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_owned()))?;

        validate_document(&coll.spec, &document).map_err(|source| StoreError::Validation {
            collection: collection.to_owned(),
            source,
        })?;

        if let Some(index) = coll.collision(&document) {
            return Err(StoreError::DuplicateKey {
                collection: collection.to_owned(),
                index,
            });
        }

        coll.documents.push(Document { id, body: document });
        Ok(id)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        let coll = inner
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_owned()))?;

        let matching = coll.documents.iter().filter(|d| filter.matches(&d.body)).count();
        u64::try_from(matching).map_err(|_| StoreError::DataCorruption("count overflow".into()))
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let inner = self.inner.read().await;
        let coll = inner
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_owned()))?;

        Ok(coll
            .documents
            .iter()
            .find(|d| filter.matches(&d.body))
            .cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use skycart_core::schema::{products, users};

    use super::*;

    async fn users_store() -> MemoryStore {
        let store = MemoryStore::new();
        let spec = users();
        store.create_collection(&spec).await.unwrap();
        for index in &spec.indexes {
            store.create_index(spec.name, index).await.unwrap();
        }
        store
    }

    fn user(email: &str) -> Value {
        json!({"name": "A", "email": email, "password": "secret1"})
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = users_store().await;
        let a = store.insert("users", user("a@x.io")).await.unwrap();
        let b = store.insert("users", user("b@x.io")).await.unwrap();
        assert!(b > a);
        assert_eq!(store.count("users", &Filter::all()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = users_store().await;
        store.insert("users", user("a@x.io")).await.unwrap();
        let err = store.insert("users", user("a@x.io")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::DuplicateKey { ref index, .. } if index == "users_email_key"
        ));
        assert_eq!(store.count("users", &Filter::all()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_email_uniqueness_is_case_sensitive() {
        let store = users_store().await;
        store.insert("users", user("a@x.io")).await.unwrap();
        assert!(store.insert("users", user("A@x.io")).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_document_rejected() {
        let store = users_store().await;
        let err = store
            .insert(
                "users",
                json!({"name": "A", "email": "a@x.io", "password": "123"}),
            )
            .await
            .unwrap_err();
        assert!(err.violates("password"));
        assert_eq!(store.count("users", &Filter::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.insert("carts", json!({})).await,
            Err(StoreError::UnknownCollection(_))
        ));
        assert!(matches!(
            store.create_index("carts", &IndexSpec::ascending("user")).await,
            Err(StoreError::UnknownCollection(_))
        ));
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let store = users_store().await;
        store.insert("users", user("a@x.io")).await.unwrap();

        let spec = users();
        store.create_collection(&spec).await.unwrap();
        for index in &spec.indexes {
            store.create_index(spec.name, index).await.unwrap();
        }

        assert_eq!(store.count("users", &Filter::all()).await.unwrap(), 1);
        assert_eq!(
            store.indexes("users").await,
            ["users_email_key", "users_reset_password_token_idx"]
        );
    }

    #[tokio::test]
    async fn test_unique_index_over_existing_duplicates_fails() {
        let store = MemoryStore::new();
        let spec = products();
        store.create_collection(&spec).await.unwrap();
        store.insert("products", json!({"sku": "a"})).await.unwrap();
        store.insert("products", json!({"sku": "a"})).await.unwrap();

        let err = store
            .create_index("products", &IndexSpec::unique("sku"))
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[tokio::test]
    async fn test_find_one_returns_first_match() {
        let store = users_store().await;
        let first = store.insert("users", user("a@x.io")).await.unwrap();
        store.insert("users", user("b@x.io")).await.unwrap();

        let doc = store
            .find_one("users", &Filter::all().eq("name", "A"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.id, first);
        assert!(store
            .find_one("users", &Filter::all().eq("email", "c@x.io"))
            .await
            .unwrap()
            .is_none());
    }
}
