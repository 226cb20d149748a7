//! Payment transactions and their completion.
//!
//! Completing a payment is the entry point of the lifecycle: the status moves
//! to `completed` exactly once, and that transition publishes
//! `PaymentCompleted` inside the same database transaction.

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::DateTimeWithTimeZone,
};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use studyhub_core::events::{DomainEvent, PaymentCompleted};
use studyhub_core::referral::AwardPolicy;
use studyhub_core::selection::{SelectionRequest, SelectionViolation, validate_selection};
use studyhub_core::subscription::{BillingCycle, PaymentStatus as CoreStatus};
use studyhub_shared::types::{PaymentId, TierId, UserId};

use crate::entities::{
    grades, id_list::IdList, payment_transactions, sea_orm_active_enums::PaymentStatus,
    subjects, subscription_tiers,
};
use crate::lifecycle::{DispatchReport, EventBus, LifecycleError, record_award_failure};

/// Payment provider recorded for tiers bought with referral points.
pub const REFERRAL_POINTS_PROVIDER: &str = "referral_points";

/// Input for creating a pending payment.
#[derive(Debug, Clone)]
pub struct CreatePaymentInput {
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
    pub selected_subject_ids: Vec<Uuid>,
}

/// Result of completing a payment.
#[derive(Debug, Clone)]
pub enum PaymentCompletion {
    /// This call moved the payment to `completed` and ran the lifecycle.
    Completed {
        /// Payment as stored.
        payment: payment_transactions::Model,
        /// What the lifecycle handlers did.
        report: DispatchReport,
    },
    /// The payment was already completed; nothing ran.
    AlreadyCompleted {
        /// Payment as stored.
        payment: payment_transactions::Model,
    },
}

impl PaymentCompletion {
    /// The payment row.
    #[must_use]
    pub const fn payment(&self) -> &payment_transactions::Model {
        match self {
            Self::Completed { payment, .. } | Self::AlreadyCompleted { payment } => payment,
        }
    }

    /// The lifecycle report, when this call ran the lifecycle.
    #[must_use]
    pub const fn report(&self) -> Option<&DispatchReport> {
        match self {
            Self::Completed { report, .. } => Some(report),
            Self::AlreadyCompleted { .. } => None,
        }
    }
}

/// Errors from payment operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Payment id unknown.
    #[error("Payment {0} not found")]
    NotFound(Uuid),

    /// Tier id unknown.
    #[error("Tier {0} not found")]
    TierNotFound(Uuid),

    /// Tier is no longer sold.
    #[error("Tier {0} is not available")]
    TierInactive(String),

    /// Checkout grade/subject selection breaks the tier rules or the catalog.
    #[error("Invalid selection: {0}")]
    InvalidSelection(SelectionViolation),

    /// Status change not allowed from the current status.
    #[error("Payment {id} is {status} and cannot be marked {target}")]
    InvalidTransition {
        /// Payment id.
        id: Uuid,
        /// Current status.
        status: &'static str,
        /// Requested status.
        target: &'static str,
    },

    /// Lifecycle handler failure.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl PaymentError {
    /// The award failure carried by this error, if any.
    #[must_use]
    pub const fn award_failure(&self) -> Option<&crate::lifecycle::AwardFailure> {
        match self {
            Self::Lifecycle(LifecycleError::AwardFailed(failure)) => Some(failure),
            _ => None,
        }
    }
}

/// Repository for payment transactions.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    db: DatabaseConnection,
    policy: AwardPolicy,
}

impl PaymentRepository {
    /// Creates a new payment repository using `policy` for referral awards.
    #[must_use]
    pub const fn new(db: DatabaseConnection, policy: AwardPolicy) -> Self {
        Self { db, policy }
    }

    /// Finds a payment by id.
    pub async fn find_by_id(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<payment_transactions::Model>, DbErr> {
        payment_transactions::Entity::find_by_id(payment_id)
            .one(&self.db)
            .await
    }

    /// A user's payments, newest first.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<payment_transactions::Model>, DbErr> {
        payment_transactions::Entity::find()
            .filter(payment_transactions::Column::UserId.eq(user_id))
            .order_by_desc(payment_transactions::Column::Id)
            .all(&self.db)
            .await
    }

    /// Records a pending payment for an active tier.
    pub async fn create_pending(
        &self,
        input: CreatePaymentInput,
    ) -> Result<payment_transactions::Model, PaymentError> {
        let payment = insert_pending(&self.db, input).await?;
        info!(
            payment_id = %payment.id,
            user_id = %payment.user_id,
            tier_id = %payment.tier_id,
            "Payment created"
        );
        Ok(payment)
    }

    /// Marks a payment completed and runs the subscription lifecycle.
    ///
    /// Idempotent: completing an already completed payment runs nothing. If
    /// the referral award fails, everything is rolled back, the payment stays
    /// as it was so it can be retried, and an error log row is kept.
    pub async fn complete(&self, payment_id: Uuid) -> Result<PaymentCompletion, PaymentError> {
        let txn = self.db.begin().await?;

        match complete_in(&txn, &self.policy, payment_id).await {
            Ok(completion) => {
                txn.commit().await?;
                Ok(completion)
            }
            Err(e) => {
                if let Err(rollback) = txn.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                if let Some(failure) = e.award_failure() {
                    record_award_failure(&self.db, failure).await;
                }
                Err(e)
            }
        }
    }

    /// Marks a pending payment failed.
    pub async fn fail(
        &self,
        payment_id: Uuid,
        reason: Option<String>,
    ) -> Result<payment_transactions::Model, PaymentError> {
        let txn = self.db.begin().await?;

        let payment = payment_transactions::Entity::find_by_id(payment_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(PaymentError::NotFound(payment_id))?;

        if payment.status != PaymentStatus::Pending {
            return Err(PaymentError::InvalidTransition {
                id: payment_id,
                status: CoreStatus::from(payment.status).as_str(),
                target: CoreStatus::Failed.as_str(),
            });
        }

        let mut active: payment_transactions::ActiveModel = payment.into();
        active.status = Set(PaymentStatus::Failed);
        active.failure_reason = Set(reason);
        active.updated_at = Set(Utc::now().into());
        let failed = active.update(&txn).await?;

        txn.commit().await?;
        info!(%payment_id, "Payment failed");
        Ok(failed)
    }
}

/// Inserts a pending payment after checking the tier is on sale and the
/// checkout selection is allowed on it.
pub(crate) async fn insert_pending<C: sea_orm::ConnectionTrait>(
    conn: &C,
    input: CreatePaymentInput,
) -> Result<payment_transactions::Model, PaymentError> {
    let tier = subscription_tiers::Entity::find_by_id(input.tier_id)
        .one(conn)
        .await?
        .ok_or(PaymentError::TierNotFound(input.tier_id))?;
    if !tier.is_active {
        return Err(PaymentError::TierInactive(tier.name));
    }

    let (selected_grade_id, selected_subject_ids) = checkout_selection(conn, &tier, &input)
        .await?
        .map_err(|violation| {
            info!(
                user_id = %input.user_id,
                tier = %tier.name,
                reason = %violation,
                "Checkout selection rejected"
            );
            PaymentError::InvalidSelection(violation)
        })?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    let payment = payment_transactions::ActiveModel {
        id: Set(Uuid::now_v7()),
        user_id: Set(input.user_id),
        tier_id: Set(tier.id),
        billing_cycle: Set(input.billing_cycle.into()),
        status: Set(PaymentStatus::Pending),
        payment_provider: Set(input.payment_provider),
        payment_method_id: Set(input.payment_method_id),
        selected_grade_id: Set(selected_grade_id),
        selected_subject_ids: Set(IdList(selected_subject_ids)),
        failure_reason: Set(None),
        completed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;

    Ok(payment)
}

/// Validates the grade and subjects chosen at checkout against `tier`.
///
/// Returns the selection to store, subjects de-duplicated. An empty checkout
/// selection is always valid.
async fn checkout_selection<C: sea_orm::ConnectionTrait>(
    conn: &C,
    tier: &subscription_tiers::Model,
    input: &CreatePaymentInput,
) -> Result<Result<(Option<Uuid>, Vec<Uuid>), SelectionViolation>, DbErr> {
    let request = SelectionRequest {
        grade_id: input.selected_grade_id,
        subject_ids: (!input.selected_subject_ids.is_empty())
            .then(|| input.selected_subject_ids.clone()),
    };
    if request.grade_id.is_none() && request.subject_ids.is_none() {
        return Ok(Ok((None, Vec::new())));
    }

    let grade_found = match request.grade_id {
        Some(grade_id) => grades::Entity::find_by_id(grade_id)
            .filter(grades::Column::IsActive.eq(true))
            .one(conn)
            .await?
            .is_some(),
        None => false,
    };
    let known_subjects: HashSet<Uuid> = match &request.subject_ids {
        Some(ids) => subjects::Entity::find()
            .filter(subjects::Column::Id.is_in(ids.iter().copied()))
            .filter(subjects::Column::IsActive.eq(true))
            .all(conn)
            .await?
            .into_iter()
            .map(|subject| subject.id)
            .collect(),
        None => HashSet::new(),
    };

    Ok(validate_selection(
        &tier.selection_rules(),
        &request,
        |id| grade_found && request.grade_id == Some(id),
        |id| known_subjects.contains(&id),
    )
    .map(|valid| (valid.grade_id, valid.subject_ids.unwrap_or_default())))
}

/// Completes `payment_id` inside `txn` and publishes `PaymentCompleted`.
///
/// The status moves with a compare-and-swap, so concurrent completions of the
/// same payment publish the event once.
pub(crate) async fn complete_in(
    txn: &DatabaseTransaction,
    policy: &AwardPolicy,
    payment_id: Uuid,
) -> Result<PaymentCompletion, PaymentError> {
    let payment = payment_transactions::Entity::find_by_id(payment_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or(PaymentError::NotFound(payment_id))?;

    if !CoreStatus::is_completion(Some(payment.status.into()), CoreStatus::Completed) {
        return Ok(PaymentCompletion::AlreadyCompleted { payment });
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    let swapped = payment_transactions::Entity::update_many()
        .set(payment_transactions::ActiveModel {
            status: Set(PaymentStatus::Completed),
            completed_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(payment_transactions::Column::Id.eq(payment_id))
        .filter(payment_transactions::Column::Status.ne(PaymentStatus::Completed))
        .exec(txn)
        .await?;

    let payment = payment_transactions::Entity::find_by_id(payment_id)
        .one(txn)
        .await?
        .ok_or(PaymentError::NotFound(payment_id))?;

    if swapped.rows_affected == 0 {
        return Ok(PaymentCompletion::AlreadyCompleted { payment });
    }

    info!(%payment_id, user_id = %payment.user_id, "Payment completed");

    let report = EventBus::new(txn, policy)
        .publish(DomainEvent::PaymentCompleted(PaymentCompleted {
            payment_id: PaymentId::from_uuid(payment.id),
            user_id: UserId::from_uuid(payment.user_id),
            tier_id: TierId::from_uuid(payment.tier_id),
            billing_cycle: payment.billing_cycle.into(),
        }))
        .await?;

    Ok(PaymentCompletion::Completed { payment, report })
}
