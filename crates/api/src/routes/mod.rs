//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod ai_models;
pub mod health;
pub mod payments;
pub mod referrals;
pub mod tiers;
pub mod users;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(tiers::routes())
        .merge(payments::routes())
        .merge(referrals::routes())
        .merge(users::routes())
        .merge(ai_models::routes())
}
