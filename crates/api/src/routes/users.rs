//! Per-user entitlement, usage and subscription routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use studyhub_core::selection::{SelectionRequest, SelectionUpdateResult};
use studyhub_core::subscription::TokenBudget;
use studyhub_db::entities::user_subscriptions;
use studyhub_db::lifecycle::AwardRecord;
use studyhub_db::repositories::{EntitlementSnapshot, LimitCheckResult, PaperAccess};

use crate::{ApiError, AppState};

/// Creates the user routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/{user_id}/entitlement", get(get_entitlement))
        .route("/users/{user_id}/selection", put(update_selection))
        .route("/users/{user_id}/usage/tokens", post(record_tokens))
        .route("/users/{user_id}/usage/tokens/check", get(check_tokens))
        .route("/users/{user_id}/usage/papers", post(record_paper))
        .route("/users/{user_id}/subscription/cancel", post(cancel))
        .route("/users/{user_id}/subscription/reactivate", post(reactivate))
}

/// Request body for metering tokens.
#[derive(Debug, Deserialize)]
pub struct TokenUsageRequest {
    /// Tokens consumed.
    pub tokens: i64,
    /// Model that consumed them.
    pub ai_model_id: Option<Uuid>,
}

/// Query for a budget check.
#[derive(Debug, Deserialize)]
pub struct TokenCheckQuery {
    /// Tokens about to be consumed.
    pub tokens: i64,
}

/// Budget after metering.
#[derive(Debug, Serialize)]
pub struct TokenUsageResponse {
    /// Tokens used this period.
    pub tokens_used: i64,
    /// Effective limit (None = unlimited).
    pub token_limit: Option<i64>,
    /// Tokens left (None = unlimited).
    pub tokens_remaining: Option<i64>,
}

impl From<TokenBudget> for TokenUsageResponse {
    fn from(budget: TokenBudget) -> Self {
        Self {
            tokens_used: budget.used,
            token_limit: budget.limit,
            tokens_remaining: budget.remaining(),
        }
    }
}

/// Request body for a paper access.
#[derive(Debug, Deserialize)]
pub struct PaperAccessRequest {
    /// Paper opened.
    pub paper_id: Uuid,
}

/// Response for a reactivation.
#[derive(Debug, Serialize)]
pub struct ReactivationResponse {
    /// Subscription as stored.
    pub subscription: user_subscriptions::Model,
    /// Referral award attempt.
    pub award: Option<AwardRecord>,
}

/// GET `/users/{user_id}/entitlement` - Current entitlement snapshot.
async fn get_entitlement(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<EntitlementSnapshot>, ApiError> {
    Ok(Json(state.subscriptions().entitlement(user_id).await?))
}

/// PUT `/users/{user_id}/selection` - Change grade and/or subjects.
///
/// Rule violations come back as `200` with `success: false`.
async fn update_selection(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SelectionRequest>,
) -> Result<Json<SelectionUpdateResult>, ApiError> {
    Ok(Json(
        state
            .subscriptions()
            .update_selection(user_id, &payload)
            .await?,
    ))
}

/// POST `/users/{user_id}/usage/tokens` - Meter consumed tokens.
async fn record_tokens(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<TokenUsageRequest>,
) -> Result<Json<TokenUsageResponse>, ApiError> {
    let budget = state
        .subscriptions()
        .record_token_usage(user_id, payload.tokens, payload.ai_model_id)
        .await?;
    Ok(Json(budget.into()))
}

/// GET `/users/{user_id}/usage/tokens/check` - Check a request against the budget.
async fn check_tokens(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<TokenCheckQuery>,
) -> Result<Json<LimitCheckResult>, ApiError> {
    Ok(Json(
        state
            .subscriptions()
            .check_token_budget(user_id, query.tokens)
            .await?,
    ))
}

/// POST `/users/{user_id}/usage/papers` - Record a paper access.
async fn record_paper(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<PaperAccessRequest>,
) -> Result<Json<PaperAccess>, ApiError> {
    Ok(Json(
        state
            .subscriptions()
            .record_paper_access(user_id, payload.paper_id)
            .await?,
    ))
}

/// POST `/users/{user_id}/subscription/cancel` - Cancel the active subscription.
async fn cancel(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<user_subscriptions::Model>, ApiError> {
    Ok(Json(state.subscriptions().cancel(user_id).await?))
}

/// POST `/users/{user_id}/subscription/reactivate` - Reactivate on the current tier.
async fn reactivate(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ReactivationResponse>, ApiError> {
    let (subscription, report) = state
        .subscriptions()
        .reactivate(user_id, &state.policy)
        .await?;
    Ok(Json(ReactivationResponse {
        subscription,
        award: report.award().copied(),
    }))
}
