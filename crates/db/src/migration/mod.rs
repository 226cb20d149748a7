//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration and written with the schema
//! builder, so the same set runs on Postgres and on `SQLite`.

pub use sea_orm_migration::prelude::*;

mod m20261019_000001_catalog;
mod m20261019_000002_subscriptions;
mod m20261019_000003_referrals;
mod m20261019_000004_seed_catalog;

pub use m20261019_000004_seed_catalog::{DEFAULT_MODEL_ID, PREMIUM_MODEL_ID};

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261019_000001_catalog::Migration),
            Box::new(m20261019_000002_subscriptions::Migration),
            Box::new(m20261019_000003_referrals::Migration),
            Box::new(m20261019_000004_seed_catalog::Migration),
        ]
    }
}
