//! Database layer with `SeaORM` entities, repositories and lifecycle handlers.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository abstractions for data access
//! - The in-transaction event bus driving activation and referral awards
//! - Database migrations and the catalog seed

pub mod entities;
pub mod lifecycle;
pub mod migration;
pub mod repositories;

pub use lifecycle::{DispatchReport, EventBus, LifecycleError};
pub use repositories::{
    AiModelRepository, PaymentRepository, ReferralRepository, SubscriptionRepository,
    TierRepository,
};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use studyhub_shared::config::DatabaseConfig;

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    // Every connection to an in-memory SQLite URL opens a separate database.
    let in_memory = config.url.contains(":memory:") || config.url.contains("mode=memory");
    let max_connections = if in_memory { 1 } else { config.max_connections };

    let mut options = ConnectOptions::new(config.url.as_str());
    options
        .max_connections(max_connections)
        .min_connections(config.min_connections.min(max_connections))
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
