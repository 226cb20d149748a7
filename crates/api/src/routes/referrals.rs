//! Referral and referral points routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use studyhub_core::referral::PointsBalance;
use studyhub_core::subscription::BillingCycle;
use studyhub_db::entities::{referral_transactions, referrals};
use studyhub_db::repositories::PointsSummary;
use studyhub_shared::types::{PageRequest, PageResponse};

use crate::{ApiError, AppState};

/// Creates the referral routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/referrals", post(create_referral))
        .route("/users/{user_id}/referrals", get(list_referrals))
        .route("/users/{user_id}/referral-points", get(get_points))
        .route(
            "/users/{user_id}/referral-points/transactions",
            get(list_transactions),
        )
        .route("/users/{user_id}/referral-points/redeem", post(redeem_points))
}

/// Request body for recording a referral.
#[derive(Debug, Deserialize)]
pub struct CreateReferralRequest {
    /// User who shared the invite.
    pub referrer_id: Uuid,
    /// User who signed up with it.
    pub referred_id: Uuid,
}

/// Request body for redeeming points.
#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    /// Tier to buy.
    pub tier_id: Uuid,
    /// Billing cycle to buy.
    pub billing_cycle: BillingCycle,
}

/// Response for a redemption.
#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    /// The `redeemed` ledger entry.
    pub transaction: referral_transactions::Model,
    /// Balance after the redemption.
    pub balance: PointsBalance,
    /// Payment recorded for the redemption.
    pub payment_id: Uuid,
    /// Subscription activated by it.
    pub subscription_id: Option<Uuid>,
}

/// POST `/referrals` - Record that one user referred another.
async fn create_referral(
    State(state): State<AppState>,
    Json(payload): Json<CreateReferralRequest>,
) -> Result<(StatusCode, Json<referrals::Model>), ApiError> {
    let referral = state
        .referrals()
        .create_referral(payload.referrer_id, payload.referred_id)
        .await?;
    Ok((StatusCode::CREATED, Json(referral)))
}

/// GET `/users/{user_id}/referrals` - Referrals made by a user.
async fn list_referrals(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<referrals::Model>>, ApiError> {
    Ok(Json(state.referrals().list_referrals(user_id).await?))
}

/// GET `/users/{user_id}/referral-points` - Points balance summary.
async fn get_points(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<PointsSummary>, ApiError> {
    Ok(Json(state.referrals().summary(user_id).await?))
}

/// GET `/users/{user_id}/referral-points/transactions` - Ledger history, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(page): Query<PageRequest>,
) -> Result<Json<PageResponse<referral_transactions::Model>>, ApiError> {
    Ok(Json(
        state.referrals().list_transactions(user_id, &page).await?,
    ))
}

/// POST `/users/{user_id}/referral-points/redeem` - Buy a tier with points.
async fn redeem_points(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<RedeemRequest>,
) -> Result<Json<RedeemResponse>, ApiError> {
    let redemption = state
        .referrals()
        .redeem(user_id, payload.tier_id, payload.billing_cycle)
        .await?;

    let subscription_id = redemption.transaction.subscription_id;
    info!(%user_id, tier_id = %payload.tier_id, ?subscription_id, "Points redeemed via API");

    Ok(Json(RedeemResponse {
        payment_id: redemption.completion.payment().id,
        subscription_id,
        balance: redemption.balance,
        transaction: redemption.transaction,
    }))
}
