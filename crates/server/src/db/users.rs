//! User repository over a [`DocumentStore`].
//!
//! Users are JSON documents in the `users` collection. This module converts
//! between those documents and typed records.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use skycart_core::schema::{USERS, format_timestamp};
use skycart_core::{Email, PasswordHash, UserId, UserRole};

use super::{Document, DocumentStore, Filter, StoreError};

/// A user about to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password: PasswordHash,
    pub role: UserRole,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    /// The stored document. `avatar` is written as `null` when unset.
    #[must_use]
    pub fn to_document(&self) -> Value {
        json!({
            "name": self.name,
            "email": self.email.as_str(),
            "password": self.password.as_str(),
            "role": self.role.as_str(),
            "avatar": self.avatar,
            "created_at": format_timestamp(self.created_at),
        })
    }
}

/// A user read back from the store. The password hash is never loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    pub avatar: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<Document> for StoredUser {
    type Error = StoreError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| StoreError::DataCorruption(format!("user {}: {what}", doc.id));

        let name = doc
            .body
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| corrupt("missing name"))?
            .to_owned();

        let email = doc
            .body
            .get("email")
            .and_then(Value::as_str)
            .ok_or_else(|| corrupt("missing email"))
            .and_then(|s| Email::parse(s).map_err(|e| corrupt(&format!("invalid email: {e}"))))?;

        // Documents without a role are ordinary users.
        let role = match doc.body.get("role").and_then(Value::as_str) {
            Some(role) => role
                .parse()
                .map_err(|_| corrupt(&format!("invalid role {role:?}")))?,
            None => UserRole::User,
        };

        let avatar = doc
            .body
            .get("avatar")
            .and_then(Value::as_str)
            .map(str::to_owned);

        let created_at = doc
            .body
            .get("created_at")
            .and_then(Value::as_str)
            .map(|s| {
                DateTime::parse_from_rfc3339(s)
                    .map(|at| at.with_timezone(&Utc))
                    .map_err(|e| corrupt(&format!("invalid created_at: {e}")))
            })
            .transpose()?;

        Ok(Self {
            id: UserId::from(doc.id),
            name,
            email,
            role,
            avatar,
            created_at,
        })
    }
}

/// Repository for user documents.
pub struct UserRepository<'a, S> {
    store: &'a S,
}

impl<'a, S: DocumentStore> UserRepository<'a, S> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Insert a user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateKey` if the email is taken, or a
    /// validation error if the collection rejects the document.
    pub async fn create(&self, user: &NewUser) -> Result<StoredUser, StoreError> {
        let id = self.store.insert(USERS, user.to_document()).await?;

        Ok(StoredUser {
            id: UserId::from(id),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            avatar: user.avatar.clone(),
            created_at: Some(user.created_at),
        })
    }

    /// Find a user by exact email.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DataCorruption` if the stored document is malformed.
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<StoredUser>, StoreError> {
        self.store
            .find_one(USERS, &Filter::all().eq("email", email.as_str()))
            .await?
            .map(StoredUser::try_from)
            .transpose()
    }

    /// Count users holding `role`.
    ///
    /// Only documents with an explicit role field are counted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    pub async fn count_by_role(&self, role: UserRole) -> Result<u64, StoreError> {
        self.store
            .count(USERS, &Filter::all().eq("role", role.as_str()))
            .await
    }

    /// Count all users.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    pub async fn count(&self) -> Result<u64, StoreError> {
        self.store.count(USERS, &Filter::all()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use skycart_core::EntityId;
    use skycart_core::schema::users;

    use super::*;
    use crate::db::MemoryStore;

    fn new_user(email: &str, role: UserRole) -> NewUser {
        NewUser {
            name: "Test".to_string(),
            email: Email::parse(email).unwrap(),
            password: PasswordHash::parse("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA").unwrap(),
            role,
            avatar: None,
            created_at: Utc::now(),
        }
    }

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        let spec = users();
        store.create_collection(&spec).await.unwrap();
        for index in &spec.indexes {
            store.create_index(spec.name, index).await.unwrap();
        }
        store
    }

    #[test]
    fn test_document_shape() {
        let doc = new_user("a@x.io", UserRole::Admin).to_document();
        assert_eq!(doc["role"], "admin");
        assert_eq!(doc["avatar"], Value::Null);
        assert!(doc["created_at"].as_str().unwrap().ends_with('Z'));
        assert!(doc["password"].as_str().unwrap().starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = store().await;
        let repo = UserRepository::new(&store);

        let created = repo.create(&new_user("a@x.io", UserRole::Admin)).await.unwrap();
        let found = repo
            .find_by_email(&Email::parse("a@x.io").unwrap())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.id, created.id);
        assert_eq!(found.role, UserRole::Admin);
        assert_eq!(found.avatar, None);
    }

    #[tokio::test]
    async fn test_count_by_role() {
        let store = store().await;
        let repo = UserRepository::new(&store);
        repo.create(&new_user("a@x.io", UserRole::Admin)).await.unwrap();
        repo.create(&new_user("b@x.io", UserRole::User)).await.unwrap();
        repo.create(&new_user("c@x.io", UserRole::User)).await.unwrap();

        assert_eq!(repo.count_by_role(UserRole::Admin).await.unwrap(), 1);
        assert_eq!(repo.count_by_role(UserRole::User).await.unwrap(), 2);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_duplicate_key() {
        let store = store().await;
        let repo = UserRepository::new(&store);
        repo.create(&new_user("a@x.io", UserRole::Admin)).await.unwrap();
        let err = repo
            .create(&new_user("a@x.io", UserRole::User))
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[test]
    fn test_missing_role_reads_as_user() {
        let doc = Document {
            id: EntityId::from(7),
            body: json!({"name": "N", "email": "n@x.io", "password": "secret"}),
        };
        let user = StoredUser::try_from(doc).unwrap();
        assert_eq!(user.role, UserRole::User);
        assert_eq!(user.created_at, None);
    }

    #[test]
    fn test_corrupt_document_rejected() {
        let doc = Document {
            id: EntityId::from(7),
            body: json!({"name": "N", "email": "nope"}),
        };
        assert!(matches!(
            StoredUser::try_from(doc),
            Err(StoreError::DataCorruption(_))
        ));
    }
}
