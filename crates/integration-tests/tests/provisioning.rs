//! Provisioning against `PostgreSQL`.
//!
//! These tests require:
//! - A running `PostgreSQL` database
//! - `SKYCART_TEST_DATABASE_URL` pointing at it
//!
//! Run with: cargo test -p skycart-integration-tests -- --ignored

use serde_json::json;

use skycart_core::schema::{PRODUCTS, USERS};
use skycart_core::{Email, PasswordHash};
use skycart_integration_tests::TestDatabase;
use skycart_server::config::DEFAULT_ADMIN_EMAIL;
use skycart_server::db::{DocumentStore, Filter, StoreError};
use skycart_server::provision::{AdminSeed, ProvisionPlan, Provisioner, verify};

fn seed() -> AdminSeed {
    AdminSeed {
        name: "Admin".to_string(),
        email: Email::parse(DEFAULT_ADMIN_EMAIL).expect("valid email"),
        password: PasswordHash::parse("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA")
            .expect("valid hash"),
    }
}

async fn provisioned() -> TestDatabase {
    let db = TestDatabase::new().await;
    Provisioner::new(&db.store)
        .run(&ProvisionPlan::standard(seed()))
        .await
        .expect("Provisioning failed");
    db
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SKYCART_TEST_DATABASE_URL)"]
async fn test_exactly_one_admin_after_provisioning() {
    let db = provisioned().await;

    let report = verify(&db.store, &Email::parse(DEFAULT_ADMIN_EMAIL).expect("valid email"))
        .await
        .expect("Verification failed");
    assert_eq!(report.admin.email.as_str(), DEFAULT_ADMIN_EMAIL);
    assert_eq!(report.users, 1);

    let doc = db
        .store
        .find_one(USERS, &Filter::all().eq("role", "admin"))
        .await
        .expect("Query failed")
        .expect("Admin missing");
    assert_eq!(doc.body["avatar"], serde_json::Value::Null);

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SKYCART_TEST_DATABASE_URL)"]
async fn test_duplicate_email_rejected() {
    let db = provisioned().await;

    let err = db
        .store
        .insert(
            USERS,
            json!({"name": "Other", "email": DEFAULT_ADMIN_EMAIL, "password": "secret1"}),
        )
        .await
        .expect_err("Duplicate email accepted");
    assert!(matches!(
        err,
        StoreError::DuplicateKey { ref index, .. } if index == "users_email_key"
    ));

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SKYCART_TEST_DATABASE_URL)"]
async fn test_invalid_role_rejected() {
    let db = provisioned().await;

    for role in [json!("superuser"), json!(null), json!(1)] {
        let err = db
            .store
            .insert(
                USERS,
                json!({"name": "R", "email": "r@x.io", "password": "secret1", "role": role}),
            )
            .await
            .expect_err("Invalid role accepted");
        assert!(err.violates("role"), "unexpected error: {err}");
    }

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SKYCART_TEST_DATABASE_URL)"]
async fn test_short_password_rejected() {
    let db = provisioned().await;

    let err = db
        .store
        .insert(
            USERS,
            json!({"name": "P", "email": "p@x.io", "password": "12345"}),
        )
        .await
        .expect_err("Short password accepted");
    assert!(err.violates("password"));

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SKYCART_TEST_DATABASE_URL)"]
async fn test_email_pattern_enforced() {
    let db = provisioned().await;

    for email in ["no-at-sign", "a@nodot", "spaced out@x.io"] {
        let err = db
            .store
            .insert(
                USERS,
                json!({"name": "E", "email": email, "password": "secret1"}),
            )
            .await
            .expect_err("Invalid email accepted");
        assert!(err.violates("email"), "{email}: {err}");
    }

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SKYCART_TEST_DATABASE_URL)"]
async fn test_rerun_fails_only_on_seed() {
    let db = provisioned().await;

    let err = Provisioner::new(&db.store)
        .run(&ProvisionPlan::standard(seed()))
        .await
        .expect_err("Second seed accepted");
    assert_eq!(err.step, format!("seed admin {DEFAULT_ADMIN_EMAIL}"));

    let result = verify(&db.store, &Email::parse(DEFAULT_ADMIN_EMAIL).expect("valid email")).await;
    assert!(result.is_ok());

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SKYCART_TEST_DATABASE_URL)"]
async fn test_products_accept_any_object() {
    let db = provisioned().await;

    db.store
        .insert(
            PRODUCTS,
            json!({"name": "Kite", "description": "Red kite", "price": 19.5, "ratings": 4}),
        )
        .await
        .expect("Product insert failed");
    let count = db
        .store
        .count(PRODUCTS, &Filter::all().eq("name", "Kite"))
        .await
        .expect("Count failed");
    assert_eq!(count, 1);

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SKYCART_TEST_DATABASE_URL)"]
async fn test_unknown_collection() {
    let db = provisioned().await;

    let err = db
        .store
        .insert("carts", json!({}))
        .await
        .expect_err("Insert into missing table accepted");
    assert!(matches!(err, StoreError::UnknownCollection(_)));

    db.cleanup().await;
}
