//! Subscription activation on payment completion.
//!
//! Creates or updates the user's single subscription row. When the user is
//! already active, unused tokens of the current period carry into the new one.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QuerySelect,
    Set, prelude::DateTimeWithTimeZone, sea_query::OnConflict,
};
use tracing::{info, warn};
use uuid::Uuid;

use studyhub_core::events::{PaymentCompleted, SubscriptionActivated};
use studyhub_core::subscription::{
    BillingPeriod, Carryover, PreviousBudget, SubscriptionStatus as CoreStatus, compute_carryover,
};
use studyhub_shared::types::{PaymentId, SubscriptionId, TierId};

use crate::entities::{
    id_list::IdList,
    payment_transactions, subscription_tiers,
    sea_orm_active_enums::{BillingCycle, SubscriptionStatus},
    user_subscriptions,
};

use super::LifecycleError;

/// Why an activation did not write anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationSkip {
    /// The purchased tier no longer exists.
    TierNotFound(TierId),
    /// The completed payment row could not be read back.
    PaymentNotFound(PaymentId),
}

/// Result of handling a `PaymentCompleted` event.
#[derive(Debug, Clone)]
pub enum ActivationOutcome {
    /// The subscription row was written with status `active`.
    Activated {
        /// Row as stored.
        subscription: user_subscriptions::Model,
        /// Tokens carried over from the previous period.
        carryover: Carryover,
        /// Event published for the write.
        event: SubscriptionActivated,
    },
    /// Nothing was written.
    Skipped(ActivationSkip),
}

impl ActivationOutcome {
    /// The `SubscriptionActivated` event to publish, if any.
    #[must_use]
    pub const fn event(&self) -> Option<SubscriptionActivated> {
        match self {
            Self::Activated { event, .. } => Some(*event),
            Self::Skipped(_) => None,
        }
    }

    /// The written subscription, if any.
    #[must_use]
    pub const fn subscription(&self) -> Option<&user_subscriptions::Model> {
        match self {
            Self::Activated { subscription, .. } => Some(subscription),
            Self::Skipped(_) => None,
        }
    }
}

/// Activates (or renews, or changes the tier of) the paying user's subscription.
///
/// # Errors
///
/// Returns an error if a query fails or the billing period cannot be computed.
pub async fn on_payment_completed(
    txn: &DatabaseTransaction,
    event: &PaymentCompleted,
) -> Result<ActivationOutcome, LifecycleError> {
    let user_id = event.user_id.into_inner();

    let Some(tier) = subscription_tiers::Entity::find_by_id(event.tier_id.into_inner())
        .one(txn)
        .await?
    else {
        warn!(
            payment_id = %event.payment_id,
            tier_id = %event.tier_id,
            "Completed payment references an unknown tier, subscription not activated"
        );
        return Ok(ActivationOutcome::Skipped(ActivationSkip::TierNotFound(
            event.tier_id,
        )));
    };

    let Some(payment) = payment_transactions::Entity::find_by_id(event.payment_id.into_inner())
        .one(txn)
        .await?
    else {
        warn!(payment_id = %event.payment_id, "Completed payment vanished before activation");
        return Ok(ActivationOutcome::Skipped(ActivationSkip::PaymentNotFound(
            event.payment_id,
        )));
    };

    let existing = user_subscriptions::Entity::find()
        .filter(user_subscriptions::Column::UserId.eq(user_id))
        .lock_exclusive()
        .one(txn)
        .await?;

    let previous_status: Option<CoreStatus> = existing.as_ref().map(|sub| sub.status.into());

    let previous_budget = match existing.as_ref() {
        Some(sub) if sub.status == SubscriptionStatus::Active => {
            let old_limit = if sub.tier_id == tier.id {
                tier.token_limit
            } else {
                subscription_tiers::Entity::find_by_id(sub.tier_id)
                    .one(txn)
                    .await?
                    .and_then(|old| old.token_limit)
            };
            Some(PreviousBudget::new(
                sub.token_limit_override,
                old_limit,
                sub.tokens_used_current_period,
            ))
        }
        _ => None,
    };
    let tier_changed = existing
        .as_ref()
        .is_some_and(|sub| sub.status == SubscriptionStatus::Active && sub.tier_id != tier.id);

    let carryover = compute_carryover(previous_budget, tier.token_limit);
    let period = BillingPeriod::starting_at(event.billing_cycle.into(), Utc::now())?;
    let billing_cycle: BillingCycle = event.billing_cycle.into();

    let purchased_selection =
        payment.selected_grade_id.is_some() || !payment.selected_subject_ids.is_empty();
    let now: DateTimeWithTimeZone = Utc::now().into();

    let subscription = if let Some(sub) = existing {
        let (grade, subjects) = if purchased_selection {
            (payment.selected_grade_id, payment.selected_subject_ids.clone())
        } else {
            (sub.selected_grade_id, sub.selected_subject_ids.clone())
        };
        let mut active: user_subscriptions::ActiveModel = sub.into();
        active.tier_id = Set(tier.id);
        active.status = Set(SubscriptionStatus::Active);
        active.billing_cycle = Set(billing_cycle);
        active.period_start_date = Set(period.start.into());
        active.period_end_date = Set(period.end.map(Into::into));
        active.token_limit_override = Set(carryover.token_limit_override);
        active.tokens_used_current_period = Set(0);
        active.papers_accessed_current_period = Set(0);
        active.accessed_paper_ids = Set(IdList::default());
        active.selected_grade_id = Set(grade);
        active.selected_subject_ids = Set(subjects);
        active.payment_provider = Set(payment.payment_provider.clone());
        active.last_payment_id = Set(Some(payment.id));
        active.updated_at = Set(now);
        active.update(txn).await?
    } else {
        let row = user_subscriptions::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(user_id),
            tier_id: Set(tier.id),
            status: Set(SubscriptionStatus::Active),
            billing_cycle: Set(billing_cycle),
            period_start_date: Set(period.start.into()),
            period_end_date: Set(period.end.map(Into::into)),
            token_limit_override: Set(carryover.token_limit_override),
            tokens_used_current_period: Set(0),
            papers_accessed_current_period: Set(0),
            accessed_paper_ids: Set(IdList::default()),
            selected_grade_id: Set(payment.selected_grade_id),
            selected_subject_ids: Set(payment.selected_subject_ids.clone()),
            payment_provider: Set(payment.payment_provider.clone()),
            last_payment_id: Set(Some(payment.id)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // A concurrent first activation for the same user lands on the unique
        // user_id and turns into an update of the same row.
        user_subscriptions::Entity::insert(row)
            .on_conflict(
                OnConflict::column(user_subscriptions::Column::UserId)
                    .update_columns([
                        user_subscriptions::Column::TierId,
                        user_subscriptions::Column::Status,
                        user_subscriptions::Column::BillingCycle,
                        user_subscriptions::Column::PeriodStartDate,
                        user_subscriptions::Column::PeriodEndDate,
                        user_subscriptions::Column::TokenLimitOverride,
                        user_subscriptions::Column::TokensUsedCurrentPeriod,
                        user_subscriptions::Column::PapersAccessedCurrentPeriod,
                        user_subscriptions::Column::AccessedPaperIds,
                        user_subscriptions::Column::SelectedGradeId,
                        user_subscriptions::Column::SelectedSubjectIds,
                        user_subscriptions::Column::PaymentProvider,
                        user_subscriptions::Column::LastPaymentId,
                        user_subscriptions::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(txn)
            .await?;

        user_subscriptions::Entity::find()
            .filter(user_subscriptions::Column::UserId.eq(user_id))
            .one(txn)
            .await?
            .ok_or_else(|| {
                LifecycleError::Database(sea_orm::DbErr::RecordNotFound(format!(
                    "subscription for user {user_id} after upsert"
                )))
            })?
    };

    let activated = SubscriptionActivated {
        subscription_id: SubscriptionId::from_uuid(subscription.id),
        user_id: event.user_id,
        tier_id: event.tier_id,
        previous_status,
        tier_changed,
    };

    info!(
        user_id = %event.user_id,
        subscription_id = %subscription.id,
        tier = %tier.name,
        carried_tokens = carryover.carried_tokens,
        tier_changed,
        "Subscription activated"
    );

    Ok(ActivationOutcome::Activated {
        subscription,
        carryover,
        event: activated,
    })
}
