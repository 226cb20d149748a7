//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes for payments, referrals, entitlements and AI models
//! - Error mapping from repository errors to JSON responses
//!
//! There is no authentication here: user ids in paths come from a trusted
//! identity layer in front of the service.

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use studyhub_core::referral::AwardPolicy;
use studyhub_db::{
    AiModelRepository, PaymentRepository, ReferralRepository, SubscriptionRepository,
    TierRepository,
};
use studyhub_shared::SubscriptionConfig;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Referral award rules.
    pub policy: Arc<AwardPolicy>,
}

impl AppState {
    /// Builds the state from a connection and the subscription settings.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &SubscriptionConfig) -> Self {
        Self {
            db: Arc::new(db),
            policy: Arc::new(AwardPolicy::new(config.free_tier_name.clone())),
        }
    }

    /// Tier catalog repository.
    #[must_use]
    pub fn tiers(&self) -> TierRepository {
        TierRepository::new((*self.db).clone())
    }

    /// Payment repository.
    #[must_use]
    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new((*self.db).clone(), (*self.policy).clone())
    }

    /// Referral and points repository.
    #[must_use]
    pub fn referrals(&self) -> ReferralRepository {
        ReferralRepository::new((*self.db).clone(), (*self.policy).clone())
    }

    /// Subscription repository.
    #[must_use]
    pub fn subscriptions(&self) -> SubscriptionRepository {
        SubscriptionRepository::new((*self.db).clone())
    }

    /// AI model repository.
    #[must_use]
    pub fn ai_models(&self) -> AiModelRepository {
        AiModelRepository::new((*self.db).clone())
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
