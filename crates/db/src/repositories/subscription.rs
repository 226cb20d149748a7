//! Subscription entitlements and usage metering.
//!
//! Handles the entitlement snapshot, token budget checks, usage counters,
//! grade/subject selection and status changes outside of payments.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
    prelude::DateTimeWithTimeZone,
    sea_query::Expr,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use studyhub_core::events::{DomainEvent, SubscriptionActivated};
use studyhub_core::referral::AwardPolicy;
use studyhub_core::selection::{
    SelectionRequest, SelectionUpdateResult, SelectionViolation, validate_selection,
};
use studyhub_core::subscription::{
    BillingCycle, SubscriptionError, SubscriptionStatus as CoreStatus, TokenBudget,
};
use studyhub_shared::types::{SubscriptionId, TierId, UserId};

use crate::entities::{
    grades, id_list::IdList,
    sea_orm_active_enums::SubscriptionStatus,
    subjects, subscription_tiers, token_usage_logs, user_subscriptions,
};
use crate::lifecycle::{DispatchReport, EventBus, LifecycleError, record_award_failure};

/// Result of a limit check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimitCheckResult {
    /// Whether the operation is allowed.
    pub allowed: bool,
    /// Current usage count.
    pub current: i64,
    /// Maximum limit (None = unlimited).
    pub limit: Option<i64>,
    /// Remaining allowance (None = unlimited).
    pub remaining: Option<i64>,
    /// Human-readable message if limit exceeded.
    pub message: Option<String>,
}

/// Read-only view of what a user is entitled to right now.
///
/// Users without an active subscription get zero defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitlementSnapshot {
    /// The user.
    pub user_id: Uuid,
    /// Whether an active subscription backs this snapshot.
    pub active: bool,
    /// Subscription row id.
    pub subscription_id: Option<Uuid>,
    /// Tier name.
    pub tier_name: Option<String>,
    /// Billing cycle.
    pub billing_cycle: Option<BillingCycle>,
    /// Current period start.
    pub period_start: Option<DateTime<Utc>>,
    /// Current period end (None for lifetime or no subscription).
    pub period_end: Option<DateTime<Utc>>,
    /// Effective token limit (None = unlimited).
    pub token_limit: Option<i64>,
    /// Tokens consumed this period.
    pub tokens_used: i64,
    /// Tokens left this period (None = unlimited).
    pub tokens_remaining: Option<i64>,
    /// Distinct papers accessed this period.
    pub papers_accessed: i32,
    /// Selected grade.
    pub selected_grade_id: Option<Uuid>,
    /// Selected subjects.
    pub selected_subject_ids: Vec<Uuid>,
    /// Tier allows choosing a grade.
    pub can_select_grade: bool,
    /// Tier allows choosing subjects.
    pub can_select_subjects: bool,
    /// Maximum number of subjects.
    pub max_subjects: i32,
}

impl EntitlementSnapshot {
    fn none(user_id: Uuid) -> Self {
        let budget = TokenBudget::empty();
        Self {
            user_id,
            active: false,
            subscription_id: None,
            tier_name: None,
            billing_cycle: None,
            period_start: None,
            period_end: None,
            token_limit: budget.limit,
            tokens_used: budget.used,
            tokens_remaining: budget.remaining(),
            papers_accessed: 0,
            selected_grade_id: None,
            selected_subject_ids: Vec::new(),
            can_select_grade: false,
            can_select_subjects: false,
            max_subjects: 0,
        }
    }

    fn from_rows(sub: &user_subscriptions::Model, tier: &subscription_tiers::Model) -> Self {
        let budget = sub.token_budget(tier.token_limit);
        let period = sub.period();
        Self {
            user_id: sub.user_id,
            active: true,
            subscription_id: Some(sub.id),
            tier_name: Some(tier.name.clone()),
            billing_cycle: Some(sub.billing_cycle.into()),
            period_start: Some(period.start),
            period_end: period.end,
            token_limit: budget.limit,
            tokens_used: budget.used,
            tokens_remaining: budget.remaining(),
            papers_accessed: sub.papers_accessed_current_period,
            selected_grade_id: sub.selected_grade_id,
            selected_subject_ids: sub.selected_subject_ids.0.clone(),
            can_select_grade: tier.can_select_grade,
            can_select_subjects: tier.can_select_subjects,
            max_subjects: tier.max_subjects,
        }
    }
}

/// Outcome of recording a paper access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaperAccess {
    /// Whether this was the first access to the paper this period.
    pub first_access: bool,
    /// Distinct papers accessed this period.
    pub papers_accessed: i32,
}

/// Errors from subscription operations.
#[derive(Debug, Error)]
pub enum SubscriptionRepoError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// User has no active subscription.
    #[error("No active subscription for user {0}")]
    NoActiveSubscription(Uuid),

    /// User has never subscribed.
    #[error("Subscription for user {0} not found")]
    NotFound(Uuid),

    /// Reactivation requested for an active subscription.
    #[error("Subscription for user {0} is already active")]
    AlreadyActive(Uuid),

    /// The paid period is over; only a new payment can start another one.
    #[error("Subscription period for user {0} has ended, a new payment is required")]
    PeriodEnded(Uuid),

    /// The subscription's tier no longer exists.
    #[error("Tier {0} not found")]
    TierNotFound(Uuid),

    /// Domain rule violation.
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    /// Lifecycle handler failure.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Repository for subscription entitlements and usage.
#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    db: DatabaseConnection,
}

impl SubscriptionRepository {
    /// Creates a new subscription repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The user's subscription row in any status.
    pub async fn find_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<user_subscriptions::Model>, DbErr> {
        user_subscriptions::Entity::find()
            .filter(user_subscriptions::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
    }

    /// The user's active subscription and its tier.
    pub async fn find_active(
        &self,
        user_id: Uuid,
    ) -> Result<Option<(user_subscriptions::Model, subscription_tiers::Model)>, DbErr> {
        let row = user_subscriptions::Entity::find()
            .filter(user_subscriptions::Column::UserId.eq(user_id))
            .filter(user_subscriptions::Column::Status.eq(SubscriptionStatus::Active))
            .find_also_related(subscription_tiers::Entity)
            .one(&self.db)
            .await?;

        Ok(row.and_then(|(sub, tier)| tier.map(|tier| (sub, tier))))
    }

    /// Entitlement snapshot, with zero defaults when nothing is active.
    pub async fn entitlement(&self, user_id: Uuid) -> Result<EntitlementSnapshot, DbErr> {
        Ok(match self.find_active(user_id).await? {
            Some((sub, tier)) => EntitlementSnapshot::from_rows(&sub, &tier),
            None => EntitlementSnapshot::none(user_id),
        })
    }

    /// Checks whether `requested` more tokens fit in the current period.
    pub async fn check_token_budget(
        &self,
        user_id: Uuid,
        requested: i64,
    ) -> Result<LimitCheckResult, SubscriptionRepoError> {
        if requested <= 0 {
            return Err(SubscriptionError::NonPositiveTokens(requested).into());
        }

        let budget = match self.find_active(user_id).await? {
            Some((sub, tier)) => sub.token_budget(tier.token_limit),
            None => TokenBudget::empty(),
        };

        let allowed = budget.allows(requested);
        let message = (!allowed).then(|| match budget.limit {
            Some(limit) => format!(
                "Token limit reached: {} of {limit} tokens used this period, {requested} requested",
                budget.used
            ),
            None => "Token limit reached".to_string(),
        });

        Ok(LimitCheckResult {
            allowed,
            current: budget.used,
            limit: budget.limit,
            remaining: budget.remaining(),
            message,
        })
    }

    /// Adds `tokens` to the period counter and appends a usage log row.
    ///
    /// Usage is recorded even past the limit; gating is the caller's job via
    /// [`Self::check_token_budget`].
    pub async fn record_token_usage(
        &self,
        user_id: Uuid,
        tokens: i64,
        ai_model_id: Option<Uuid>,
    ) -> Result<TokenBudget, SubscriptionRepoError> {
        if tokens <= 0 {
            return Err(SubscriptionError::NonPositiveTokens(tokens).into());
        }

        let txn = self.db.begin().await?;
        let sub = lock_active(&txn, user_id).await?;
        let now: DateTimeWithTimeZone = Utc::now().into();

        user_subscriptions::Entity::update_many()
            .col_expr(
                user_subscriptions::Column::TokensUsedCurrentPeriod,
                Expr::col(user_subscriptions::Column::TokensUsedCurrentPeriod).add(tokens),
            )
            .col_expr(user_subscriptions::Column::UpdatedAt, Expr::value(now))
            .filter(user_subscriptions::Column::Id.eq(sub.id))
            .exec(&txn)
            .await?;

        token_usage_logs::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(user_id),
            subscription_id: Set(sub.id),
            ai_model_id: Set(ai_model_id),
            tokens: Set(tokens),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let updated = user_subscriptions::Entity::find_by_id(sub.id)
            .one(&txn)
            .await?
            .ok_or(SubscriptionRepoError::NoActiveSubscription(user_id))?;
        let tier_limit = subscription_tiers::Entity::find_by_id(updated.tier_id)
            .one(&txn)
            .await?
            .and_then(|tier| tier.token_limit);

        txn.commit().await?;

        let budget = updated.token_budget(tier_limit);
        if budget.remaining() == Some(0) {
            warn!(%user_id, used = budget.used, limit = ?budget.limit, "Token budget exhausted");
        }
        Ok(budget)
    }

    /// Records access to a paper. Counts each paper once per period.
    pub async fn record_paper_access(
        &self,
        user_id: Uuid,
        paper_id: Uuid,
    ) -> Result<PaperAccess, SubscriptionRepoError> {
        let txn = self.db.begin().await?;
        let sub = lock_active(&txn, user_id).await?;

        if sub.accessed_paper_ids.contains(paper_id) {
            txn.commit().await?;
            return Ok(PaperAccess {
                first_access: false,
                papers_accessed: sub.papers_accessed_current_period,
            });
        }

        let mut papers = sub.accessed_paper_ids.clone();
        papers.insert(paper_id);
        let papers_accessed = sub.papers_accessed_current_period.saturating_add(1);

        let mut active: user_subscriptions::ActiveModel = sub.into();
        active.accessed_paper_ids = Set(papers);
        active.papers_accessed_current_period = Set(papers_accessed);
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?;

        txn.commit().await?;

        Ok(PaperAccess {
            first_access: true,
            papers_accessed,
        })
    }

    /// Changes the grade and/or subjects of the user's active subscription.
    ///
    /// Violations come back as `success: false` with a user-facing message.
    pub async fn update_selection(
        &self,
        user_id: Uuid,
        request: &SelectionRequest,
    ) -> Result<SelectionUpdateResult, DbErr> {
        let Some((sub, tier)) = self.find_active(user_id).await? else {
            return Ok(SelectionUpdateResult::rejected(
                &SelectionViolation::NoActiveSubscription,
            ));
        };

        let grade_found = match request.grade_id {
            Some(grade_id) => grades::Entity::find_by_id(grade_id)
                .filter(grades::Column::IsActive.eq(true))
                .one(&self.db)
                .await?
                .is_some(),
            None => false,
        };

        let known_subjects: HashSet<Uuid> = match &request.subject_ids {
            Some(ids) if !ids.is_empty() => subjects::Entity::find()
                .filter(subjects::Column::Id.is_in(ids.iter().copied()))
                .filter(subjects::Column::IsActive.eq(true))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|subject| subject.id)
                .collect(),
            _ => HashSet::new(),
        };

        let valid = match validate_selection(
            &tier.selection_rules(),
            request,
            |id| grade_found && request.grade_id == Some(id),
            |id| known_subjects.contains(&id),
        ) {
            Ok(valid) => valid,
            Err(violation) => {
                info!(%user_id, reason = %violation, "Selection update rejected");
                return Ok(SelectionUpdateResult::rejected(&violation));
            }
        };

        let mut active: user_subscriptions::ActiveModel = sub.into();
        if let Some(grade_id) = valid.grade_id {
            active.selected_grade_id = Set(Some(grade_id));
        }
        if let Some(subject_ids) = valid.subject_ids {
            active.selected_subject_ids = Set(IdList(subject_ids));
        }
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await?;

        Ok(SelectionUpdateResult::updated())
    }

    /// Cancels the user's active subscription.
    pub async fn cancel(
        &self,
        user_id: Uuid,
    ) -> Result<user_subscriptions::Model, SubscriptionRepoError> {
        let txn = self.db.begin().await?;
        let sub = lock_active(&txn, user_id).await?;

        let mut active: user_subscriptions::ActiveModel = sub.into();
        active.status = Set(SubscriptionStatus::Cancelled);
        active.updated_at = Set(Utc::now().into());
        let cancelled = active.update(&txn).await?;

        txn.commit().await?;
        info!(%user_id, subscription_id = %cancelled.id, "Subscription cancelled");
        Ok(cancelled)
    }

    /// Marks every active subscription whose period ended by `now` as expired.
    ///
    /// Returns the number of rows expired.
    pub async fn expire_lapsed(&self, now: DateTime<Utc>) -> Result<u64, DbErr> {
        let cutoff: DateTimeWithTimeZone = now.into();
        let result = user_subscriptions::Entity::update_many()
            .set(user_subscriptions::ActiveModel {
                status: Set(SubscriptionStatus::Expired),
                updated_at: Set(cutoff),
                ..Default::default()
            })
            .filter(user_subscriptions::Column::Status.eq(SubscriptionStatus::Active))
            .filter(user_subscriptions::Column::PeriodEndDate.is_not_null())
            .filter(user_subscriptions::Column::PeriodEndDate.lte(cutoff))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            info!(expired = result.rows_affected, "Expired lapsed subscriptions");
        }
        Ok(result.rows_affected)
    }

    /// Moves a cancelled subscription back to `active` within its paid period
    /// and publishes the activation.
    ///
    /// Period bounds, usage counters and any carried-over limit are kept as
    /// they were; only a payment starts a new period.
    pub async fn reactivate(
        &self,
        user_id: Uuid,
        policy: &AwardPolicy,
    ) -> Result<(user_subscriptions::Model, DispatchReport), SubscriptionRepoError> {
        let txn = self.db.begin().await?;

        match reactivate_in(&txn, policy, user_id).await {
            Ok(result) => {
                txn.commit().await?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback) = txn.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                if let SubscriptionRepoError::Lifecycle(LifecycleError::AwardFailed(failure)) = &e {
                    record_award_failure(&self.db, failure).await;
                }
                Err(e)
            }
        }
    }
}

async fn reactivate_in(
    txn: &DatabaseTransaction,
    policy: &AwardPolicy,
    user_id: Uuid,
) -> Result<(user_subscriptions::Model, DispatchReport), SubscriptionRepoError> {
    let sub = user_subscriptions::Entity::find()
        .filter(user_subscriptions::Column::UserId.eq(user_id))
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or(SubscriptionRepoError::NotFound(user_id))?;

    if sub.status == SubscriptionStatus::Active {
        return Err(SubscriptionRepoError::AlreadyActive(user_id));
    }
    if subscription_tiers::Entity::find_by_id(sub.tier_id)
        .one(txn)
        .await?
        .is_none()
    {
        return Err(SubscriptionRepoError::TierNotFound(sub.tier_id));
    }

    let now = Utc::now();
    if sub
        .period_end_date
        .is_some_and(|end| end.with_timezone(&Utc) <= now)
    {
        return Err(SubscriptionRepoError::PeriodEnded(user_id));
    }

    let previous_status: CoreStatus = sub.status.into();

    let mut active: user_subscriptions::ActiveModel = sub.into();
    active.status = Set(SubscriptionStatus::Active);
    active.updated_at = Set(now.into());
    let reactivated = active.update(txn).await?;

    info!(%user_id, subscription_id = %reactivated.id, from = previous_status.as_str(), "Subscription reactivated");

    let report = EventBus::new(txn, policy)
        .publish(DomainEvent::SubscriptionActivated(SubscriptionActivated {
            subscription_id: SubscriptionId::from_uuid(reactivated.id),
            user_id: UserId::from_uuid(user_id),
            tier_id: TierId::from_uuid(reactivated.tier_id),
            previous_status: Some(previous_status),
            tier_changed: false,
        }))
        .await?;

    Ok((reactivated, report))
}

async fn lock_active(
    txn: &DatabaseTransaction,
    user_id: Uuid,
) -> Result<user_subscriptions::Model, SubscriptionRepoError> {
    user_subscriptions::Entity::find()
        .filter(user_subscriptions::Column::UserId.eq(user_id))
        .filter(user_subscriptions::Column::Status.eq(SubscriptionStatus::Active))
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or(SubscriptionRepoError::NoActiveSubscription(user_id))
}
