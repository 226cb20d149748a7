//! Mapping from repository errors to HTTP responses.
//!
//! Every error body has the shape `{ "error": CODE, "message": text }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde_json::json;
use tracing::error;

use studyhub_core::ai_model::AiModelError;
use studyhub_core::referral::ReferralError;
use studyhub_core::subscription::SubscriptionError;
use studyhub_db::LifecycleError;
use studyhub_db::repositories::{
    AiModelRepoError, PaymentError, ReferralLedgerError, SubscriptionRepoError,
};
use studyhub_shared::AppError;

/// An `AppError` on its way out as a JSON response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        let body = json!({
            "error": self.0.error_code(),
            "message": self.0.public_message(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        Self(e)
    }
}

impl From<DbErr> for ApiError {
    fn from(e: DbErr) -> Self {
        Self(AppError::Database(e.to_string()))
    }
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::Database(db) => db.into(),
            LifecycleError::Subscription(_) | LifecycleError::AwardFailed(_) => {
                Self(AppError::Internal(e.to_string()))
            }
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::Database(db) => db.into(),
            PaymentError::Lifecycle(lifecycle) => lifecycle.into(),
            PaymentError::NotFound(_) | PaymentError::TierNotFound(_) => {
                Self(AppError::NotFound(e.to_string()))
            }
            PaymentError::TierInactive(_) => Self(AppError::BusinessRule(e.to_string())),
            PaymentError::InvalidSelection(_) => Self(AppError::Validation(e.to_string())),
            PaymentError::InvalidTransition { .. } => Self(AppError::Conflict(e.to_string())),
        }
    }
}

impl From<ReferralError> for ApiError {
    fn from(e: ReferralError) -> Self {
        let message = e.to_string();
        Self(match e {
            ReferralError::SelfReferral | ReferralError::NonPositivePoints(_) => {
                AppError::Validation(message)
            }
            ReferralError::InsufficientPoints { .. } | ReferralError::NotRedeemable(_) => {
                AppError::BusinessRule(message)
            }
            ReferralError::PointsOverflow
            | ReferralError::BalanceAfterMismatch { .. }
            | ReferralError::LedgerMismatch { .. } => AppError::Internal(message),
        })
    }
}

impl From<ReferralLedgerError> for ApiError {
    fn from(e: ReferralLedgerError) -> Self {
        match e {
            ReferralLedgerError::Database(db) => db.into(),
            ReferralLedgerError::Referral(referral) => referral.into(),
            ReferralLedgerError::Payment(payment) => payment.into(),
            ReferralLedgerError::AlreadyReferred(_) => Self(AppError::Conflict(e.to_string())),
            ReferralLedgerError::TierNotFound(_) => Self(AppError::NotFound(e.to_string())),
        }
    }
}

impl From<SubscriptionRepoError> for ApiError {
    fn from(e: SubscriptionRepoError) -> Self {
        match e {
            SubscriptionRepoError::Database(db) => db.into(),
            SubscriptionRepoError::Lifecycle(lifecycle) => lifecycle.into(),
            SubscriptionRepoError::NoActiveSubscription(_)
            | SubscriptionRepoError::NotFound(_)
            | SubscriptionRepoError::TierNotFound(_) => Self(AppError::NotFound(e.to_string())),
            SubscriptionRepoError::AlreadyActive(_) | SubscriptionRepoError::PeriodEnded(_) => {
                Self(AppError::Conflict(e.to_string()))
            }
            SubscriptionRepoError::Subscription(SubscriptionError::NonPositiveTokens(_)) => {
                Self(AppError::Validation(e.to_string()))
            }
            SubscriptionRepoError::Subscription(_) => Self(AppError::Internal(e.to_string())),
        }
    }
}

impl From<AiModelRepoError> for ApiError {
    fn from(e: AiModelRepoError) -> Self {
        match e {
            AiModelRepoError::Database(db) => db.into(),
            AiModelRepoError::Model(AiModelError::NoDefaultModel) => {
                Self(AppError::Configuration(e.to_string()))
            }
            AiModelRepoError::Model(AiModelError::ModelUnavailable(_)) => {
                Self(AppError::Validation(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyhub_core::selection::SelectionViolation;
    use uuid::Uuid;

    fn status_of(error: impl Into<ApiError>) -> StatusCode {
        error.into().into_response().status()
    }

    #[test]
    fn test_payment_errors() {
        assert_eq!(
            status_of(PaymentError::NotFound(Uuid::nil())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(PaymentError::InvalidTransition {
                id: Uuid::nil(),
                status: "completed",
                target: "failed",
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(PaymentError::TierInactive("legacy".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(PaymentError::InvalidSelection(
                SelectionViolation::SubjectSelectionNotAllowed
            )),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_referral_errors() {
        assert_eq!(
            status_of(ReferralLedgerError::Referral(ReferralError::SelfReferral)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ReferralLedgerError::Referral(
                ReferralError::InsufficientPoints {
                    balance: 10,
                    cost: 100
                }
            )),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(ReferralLedgerError::AlreadyReferred(Uuid::nil())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_reactivation_after_period_end_conflicts() {
        assert_eq!(
            status_of(SubscriptionRepoError::PeriodEnded(Uuid::nil())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_missing_default_model_is_configuration_error() {
        assert_eq!(
            status_of(AiModelRepoError::Model(AiModelError::NoDefaultModel)),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_database_error_is_opaque() {
        let ApiError(error) = DbErr::Custom("disk full".into()).into();
        assert_eq!(error.public_message(), "An error occurred");
    }
}
