//! Payment routes.
//!
//! Completing a payment is what drives the subscription lifecycle: the
//! response reports the activation and the referral award it caused.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use studyhub_core::subscription::BillingCycle;
use studyhub_db::entities::payment_transactions;
use studyhub_db::lifecycle::{ActivationOutcome, ActivationSkip, AwardRecord};
use studyhub_db::repositories::{CreatePaymentInput, PaymentCompletion};

use crate::{ApiError, AppState};

/// Creates the payment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments", post(create_payment))
        .route("/payments/{payment_id}/complete", post(complete_payment))
        .route("/payments/{payment_id}/fail", post(fail_payment))
}

/// Request body for recording a pending payment.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    /// Paying user.
    pub user_id: Uuid,
    /// Tier being bought.
    pub tier_id: Uuid,
    /// Billing cycle being bought.
    pub billing_cycle: BillingCycle,
    /// Gateway name.
    pub payment_provider: Option<String>,
    /// Gateway payment method reference.
    pub payment_method_id: Option<String>,
    /// Grade chosen at checkout.
    pub selected_grade_id: Option<Uuid>,
    /// Subjects chosen at checkout.
    #[serde(default)]
    pub selected_subject_ids: Vec<Uuid>,
}

/// Request body for failing a payment.
#[derive(Debug, Deserialize)]
pub struct FailPaymentRequest {
    /// Gateway failure reason.
    pub reason: Option<String>,
}

/// What activation did for a completed payment.
#[derive(Debug, Serialize)]
pub struct ActivationResponse {
    /// `activated` or `skipped`.
    pub status: &'static str,
    /// Subscription written.
    pub subscription_id: Option<Uuid>,
    /// Unused tokens carried from the previous period.
    pub carried_tokens: i64,
    /// Override stored on the subscription.
    pub token_limit_override: Option<i64>,
    /// Why nothing was written.
    pub skip_reason: Option<&'static str>,
}

impl From<&ActivationOutcome> for ActivationResponse {
    fn from(outcome: &ActivationOutcome) -> Self {
        match outcome {
            ActivationOutcome::Activated {
                subscription,
                carryover,
                ..
            } => Self {
                status: "activated",
                subscription_id: Some(subscription.id),
                carried_tokens: carryover.carried_tokens,
                token_limit_override: carryover.token_limit_override,
                skip_reason: None,
            },
            ActivationOutcome::Skipped(skip) => Self {
                status: "skipped",
                subscription_id: None,
                carried_tokens: 0,
                token_limit_override: None,
                skip_reason: Some(match skip {
                    ActivationSkip::TierNotFound(_) => "tier_not_found",
                    ActivationSkip::PaymentNotFound(_) => "payment_not_found",
                }),
            },
        }
    }
}

/// Response for a completion request.
#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    /// Payment as stored.
    pub payment: payment_transactions::Model,
    /// True when the payment had already been completed and nothing ran.
    pub already_completed: bool,
    /// Activation outcome.
    pub activation: Option<ActivationResponse>,
    /// Referral award attempt.
    pub award: Option<AwardRecord>,
}

impl From<PaymentCompletion> for CompletionResponse {
    fn from(completion: PaymentCompletion) -> Self {
        match completion {
            PaymentCompletion::Completed { payment, report } => Self {
                payment,
                already_completed: false,
                activation: report.activation().map(ActivationResponse::from),
                award: report.award().copied(),
            },
            PaymentCompletion::AlreadyCompleted { payment } => Self {
                payment,
                already_completed: true,
                activation: None,
                award: None,
            },
        }
    }
}

/// POST `/payments` - Record a pending payment.
async fn create_payment(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<payment_transactions::Model>), ApiError> {
    let payment = state
        .payments()
        .create_pending(CreatePaymentInput {
            user_id: payload.user_id,
            tier_id: payload.tier_id,
            billing_cycle: payload.billing_cycle,
            payment_provider: payload.payment_provider,
            payment_method_id: payload.payment_method_id,
            selected_grade_id: payload.selected_grade_id,
            selected_subject_ids: payload.selected_subject_ids,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

/// POST `/payments/{payment_id}/complete` - Complete a payment and run the lifecycle.
async fn complete_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let completion = state.payments().complete(payment_id).await?;
    let response = CompletionResponse::from(completion);

    info!(
        %payment_id,
        already_completed = response.already_completed,
        award = ?response.award.map(|a| a.reason.as_str()),
        "Payment completion handled"
    );

    Ok(Json(response))
}

/// POST `/payments/{payment_id}/fail` - Mark a pending payment failed.
async fn fail_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
    Json(payload): Json<FailPaymentRequest>,
) -> Result<Json<payment_transactions::Model>, ApiError> {
    let payment = state.payments().fail(payment_id, payload.reason).await?;
    Ok(Json(payment))
}
