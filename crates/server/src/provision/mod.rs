//! Database provisioning.
//!
//! Provisioning is an ordered plan of steps run once against a fresh store:
//!
//! 1. create every collection (with its validator)
//! 2. create every index
//! 3. insert the administrator
//!
//! Steps run strictly in order and the first failure aborts the run.
//! Collection and index steps are idempotent; the admin insert is not, so a
//! second run fails on the unique email.

mod seed;
mod verify;

pub use seed::AdminSeed;
pub use verify::{VerifyError, VerifyReport, verify};

use core::fmt;

use chrono::Utc;
use thiserror::Error;

use skycart_core::UserId;
use skycart_core::schema::{CollectionSpec, IndexSpec, USERS, catalog};

use crate::db::{DocumentStore, StoreError, UserRepository, ddl};

/// One provisioning step.
#[derive(Debug, Clone)]
pub enum ProvisionStep {
    CreateCollection(CollectionSpec),
    CreateIndex {
        collection: &'static str,
        index: IndexSpec,
    },
    SeedAdmin(AdminSeed),
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateCollection(spec) => write!(f, "create collection {}", spec.name),
            Self::CreateIndex { collection, index } => {
                write!(f, "create index {}", index.name(collection))
            }
            Self::SeedAdmin(seed) => write!(f, "seed admin {}", seed.email),
        }
    }
}

/// An ordered list of steps.
#[derive(Debug, Clone)]
pub struct ProvisionPlan {
    steps: Vec<ProvisionStep>,
}

impl ProvisionPlan {
    /// The SkyCart plan: the full catalog followed by the admin seed.
    #[must_use]
    pub fn standard(seed: AdminSeed) -> Self {
        Self::new(&catalog(), Some(seed))
    }

    /// All collections, then all their indexes, then the optional seed.
    #[must_use]
    pub fn new(collections: &[CollectionSpec], seed: Option<AdminSeed>) -> Self {
        let creates = collections
            .iter()
            .cloned()
            .map(ProvisionStep::CreateCollection);

        let indexes = collections.iter().flat_map(|spec| {
            spec.indexes.iter().map(|index| ProvisionStep::CreateIndex {
                collection: spec.name,
                index: index.clone(),
            })
        });

        let steps = creates
            .chain(indexes)
            .chain(seed.map(ProvisionStep::SeedAdmin))
            .collect();

        Self { steps }
    }

    #[must_use]
    pub fn steps(&self) -> &[ProvisionStep] {
        &self.steps
    }

    /// SQL a `PgStore` in `namespace` runs for each step, in order.
    ///
    /// The admin insert is rendered with its parameter placeholder.
    #[must_use]
    pub fn render_sql(&self, namespace: &str) -> Vec<String> {
        let mut statements = vec![ddl::create_schema(namespace)];
        statements.extend(self.steps.iter().map(|step| match step {
            ProvisionStep::CreateCollection(spec) => ddl::create_collection(namespace, spec),
            ProvisionStep::CreateIndex { collection, index } => {
                ddl::create_index(namespace, collection, index)
            }
            ProvisionStep::SeedAdmin(_) => ddl::insert(namespace, USERS),
        }));
        statements
    }
}

/// Provisioning failed at `step`.
#[derive(Debug, Error)]
#[error("provisioning step '{step}' failed: {source}")]
pub struct ProvisionError {
    pub step: String,
    #[source]
    pub source: StoreError,
}

/// What a completed run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub collections: usize,
    pub indexes: usize,
    pub admin_id: Option<UserId>,
}

/// Runs provisioning plans against a store.
pub struct Provisioner<'a, S> {
    store: &'a S,
}

impl<'a, S: DocumentStore> Provisioner<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Execute every step of `plan` in order.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError` naming the first step that failed. Later
    /// steps are not attempted.
    pub async fn run(&self, plan: &ProvisionPlan) -> Result<ProvisionReport, ProvisionError> {
        let mut report = ProvisionReport::default();
        let total = plan.steps().len();

        for (n, step) in plan.steps().iter().enumerate() {
            tracing::info!(step = n + 1, total, "Running: {step}");

            self.run_step(step, &mut report).await.map_err(|source| {
                tracing::error!(error = %source, "Step failed: {step}");
                ProvisionError {
                    step: step.to_string(),
                    source,
                }
            })?;
        }

        tracing::info!(
            collections = report.collections,
            indexes = report.indexes,
            "Provisioning complete"
        );
        Ok(report)
    }

    async fn run_step(
        &self,
        step: &ProvisionStep,
        report: &mut ProvisionReport,
    ) -> Result<(), StoreError> {
        match step {
            ProvisionStep::CreateCollection(spec) => {
                self.store.create_collection(spec).await?;
                report.collections += 1;
            }
            ProvisionStep::CreateIndex { collection, index } => {
                self.store.create_index(collection, index).await?;
                report.indexes += 1;
            }
            ProvisionStep::SeedAdmin(seed) => {
                let admin = UserRepository::new(self.store)
                    .create(&seed.to_new_user(Utc::now()))
                    .await?;
                tracing::info!(admin_id = %admin.id, email = %admin.email, "Admin seeded");
                report.admin_id = Some(admin.id);
            }
        }
        Ok(())
    }
}
