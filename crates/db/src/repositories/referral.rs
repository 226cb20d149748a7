//! Referral relationships and the points ledger.
//!
//! The balance row in `user_referral_points` is a running total of the
//! append-only `referral_transactions` log. Every write here changes both in
//! one transaction, and [`ReferralRepository::reconcile`] checks they agree.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
    prelude::DateTimeWithTimeZone, sea_query::Expr,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use studyhub_core::referral::{
    AwardPolicy, LedgerEntry, PointsBalance, PointsTransactionType, ReferralError, reconcile,
};
use studyhub_core::subscription::BillingCycle;
use studyhub_shared::types::{PageRequest, PageResponse};

use crate::entities::{
    referral_points_logs, referral_transactions, referrals,
    sea_orm_active_enums::{self, ReferralStatus},
    subscription_tiers, user_referral_points,
};
use crate::lifecycle::record_award_failure;

use super::payment::{
    CreatePaymentInput, PaymentCompletion, PaymentError, REFERRAL_POINTS_PROVIDER, complete_in,
    insert_pending,
};

/// Errors from referral and points operations.
#[derive(Debug, Error)]
pub enum ReferralLedgerError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Domain rule violation.
    #[error(transparent)]
    Referral(#[from] ReferralError),

    /// The referred user already has a referrer.
    #[error("User {0} has already been referred")]
    AlreadyReferred(Uuid),

    /// Tier id unknown.
    #[error("Tier {0} not found")]
    TierNotFound(Uuid),

    /// The redemption's payment could not be completed.
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

/// Result of redeeming points for a tier.
#[derive(Debug, Clone)]
pub struct Redemption {
    /// The `redeemed` ledger entry.
    pub transaction: referral_transactions::Model,
    /// Balance after the redemption.
    pub balance: PointsBalance,
    /// The points payment and what its completion did.
    pub completion: PaymentCompletion,
}

/// Referral dashboard summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointsSummary {
    /// The user.
    pub user_id: Uuid,
    /// Totals (zero when the user never earned anything).
    #[serde(flatten)]
    pub balance: PointsBalance,
    /// Referrals still waiting for a paid subscription.
    pub pending_referrals: u64,
}

/// Repository for referrals and referral points.
#[derive(Debug, Clone)]
pub struct ReferralRepository {
    db: DatabaseConnection,
    policy: AwardPolicy,
}

impl ReferralRepository {
    /// Creates a new referral repository using `policy` for referral awards.
    #[must_use]
    pub const fn new(db: DatabaseConnection, policy: AwardPolicy) -> Self {
        Self { db, policy }
    }

    /// Records that `referrer_id` referred `referred_id`.
    pub async fn create_referral(
        &self,
        referrer_id: Uuid,
        referred_id: Uuid,
    ) -> Result<referrals::Model, ReferralLedgerError> {
        if referrer_id == referred_id {
            return Err(ReferralError::SelfReferral.into());
        }

        let existing = referrals::Entity::find()
            .filter(referrals::Column::ReferredId.eq(referred_id))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(ReferralLedgerError::AlreadyReferred(referred_id));
        }

        let created = referrals::ActiveModel {
            id: Set(Uuid::now_v7()),
            referrer_id: Set(referrer_id),
            referred_id: Set(referred_id),
            status: Set(ReferralStatus::Pending),
            points_awarded: Set(0),
            subscription_tier_id: Set(None),
            completed_at: Set(None),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                ReferralLedgerError::AlreadyReferred(referred_id)
            }
            _ => ReferralLedgerError::Database(e),
        })?;

        info!(%referrer_id, %referred_id, referral_id = %created.id, "Referral created");
        Ok(created)
    }

    /// Referrals made by `referrer_id`, newest first.
    pub async fn list_referrals(&self, referrer_id: Uuid) -> Result<Vec<referrals::Model>, DbErr> {
        referrals::Entity::find()
            .filter(referrals::Column::ReferrerId.eq(referrer_id))
            .order_by_desc(referrals::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    /// The user's points balance row, if any.
    pub async fn balance(
        &self,
        user_id: Uuid,
    ) -> Result<Option<user_referral_points::Model>, DbErr> {
        user_referral_points::Entity::find()
            .filter(user_referral_points::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
    }

    /// Dashboard summary with zero defaults.
    pub async fn summary(&self, user_id: Uuid) -> Result<PointsSummary, DbErr> {
        let balance = self
            .balance(user_id)
            .await?
            .map(|row| PointsBalance::from(&row))
            .unwrap_or_default();

        let pending_referrals = referrals::Entity::find()
            .filter(referrals::Column::ReferrerId.eq(user_id))
            .filter(referrals::Column::Status.eq(ReferralStatus::Pending))
            .count(&self.db)
            .await?;

        Ok(PointsSummary {
            user_id,
            balance,
            pending_referrals,
        })
    }

    /// The user's ledger, newest first.
    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        page: &PageRequest,
    ) -> Result<PageResponse<referral_transactions::Model>, DbErr> {
        let query = referral_transactions::Entity::find()
            .filter(referral_transactions::Column::UserId.eq(user_id));

        let total = query.clone().count(&self.db).await?;
        let data = query
            .order_by_desc(referral_transactions::Column::CreatedAt)
            .order_by_desc(referral_transactions::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        let per_page = u32::try_from(page.limit()).unwrap_or(u32::MAX);
        Ok(PageResponse::new(data, page.page.max(1), per_page, total))
    }

    /// Award attempts logged for a subscription, oldest first.
    pub async fn award_logs(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<referral_points_logs::Model>, DbErr> {
        referral_points_logs::Entity::find()
            .filter(referral_points_logs::Column::SubscriptionId.eq(subscription_id))
            .order_by_asc(referral_points_logs::Column::Id)
            .all(&self.db)
            .await
    }

    /// Checks that the user's balance agrees with their ledger.
    pub async fn reconcile(&self, user_id: Uuid) -> Result<(), ReferralLedgerError> {
        let balance = self
            .balance(user_id)
            .await?
            .map_or(0, |row| row.points_balance);

        let entries: Vec<LedgerEntry> = referral_transactions::Entity::find()
            .filter(referral_transactions::Column::UserId.eq(user_id))
            .order_by_asc(referral_transactions::Column::Id)
            .all(&self.db)
            .await?
            .iter()
            .map(LedgerEntry::from)
            .collect();

        reconcile(balance, &entries)?;
        Ok(())
    }

    /// Buys `tier_id` with referral points.
    ///
    /// Debits the tier's `points_cost`, records a `redeemed` ledger entry and
    /// completes a `referral_points` payment through the regular lifecycle,
    /// all in one transaction.
    pub async fn redeem(
        &self,
        user_id: Uuid,
        tier_id: Uuid,
        billing_cycle: BillingCycle,
    ) -> Result<Redemption, ReferralLedgerError> {
        let txn = self.db.begin().await?;

        match redeem_in(&txn, &self.policy, user_id, tier_id, billing_cycle).await {
            Ok(redemption) => {
                txn.commit().await?;
                info!(
                    %user_id,
                    %tier_id,
                    cost = -redemption.transaction.points,
                    balance = redemption.balance.points_balance,
                    "Referral points redeemed"
                );
                Ok(redemption)
            }
            Err(e) => {
                if let Err(rollback) = txn.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                if let ReferralLedgerError::Payment(payment) = &e
                    && let Some(failure) = payment.award_failure()
                {
                    record_award_failure(&self.db, failure).await;
                }
                Err(e)
            }
        }
    }
}

async fn redeem_in(
    txn: &DatabaseTransaction,
    policy: &AwardPolicy,
    user_id: Uuid,
    tier_id: Uuid,
    billing_cycle: BillingCycle,
) -> Result<Redemption, ReferralLedgerError> {
    let tier = subscription_tiers::Entity::find_by_id(tier_id)
        .one(txn)
        .await?
        .ok_or(ReferralLedgerError::TierNotFound(tier_id))?;
    if !tier.is_active || tier.points_cost <= 0 {
        return Err(ReferralError::NotRedeemable(tier.name).into());
    }
    let cost = tier.points_cost;

    let current = user_referral_points::Entity::find()
        .filter(user_referral_points::Column::UserId.eq(user_id))
        .lock_exclusive()
        .one(txn)
        .await?;
    let balance = current
        .as_ref()
        .map(PointsBalance::from)
        .unwrap_or_default()
        .redeem(cost)?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    let debited = user_referral_points::Entity::update_many()
        .col_expr(
            user_referral_points::Column::PointsBalance,
            Expr::col(user_referral_points::Column::PointsBalance).sub(cost),
        )
        .col_expr(
            user_referral_points::Column::TotalRedeemed,
            Expr::col(user_referral_points::Column::TotalRedeemed).add(cost),
        )
        .col_expr(user_referral_points::Column::UpdatedAt, Expr::value(now))
        .filter(user_referral_points::Column::UserId.eq(user_id))
        .filter(user_referral_points::Column::PointsBalance.gte(cost))
        .exec(txn)
        .await?;
    if debited.rows_affected == 0 {
        return Err(ReferralError::InsufficientPoints {
            balance: current.map_or(0, |row| row.points_balance),
            cost,
        }
        .into());
    }

    let payment = insert_pending(
        txn,
        CreatePaymentInput {
            user_id,
            tier_id,
            billing_cycle,
            payment_provider: Some(REFERRAL_POINTS_PROVIDER.to_string()),
            payment_method_id: None,
            selected_grade_id: None,
            selected_subject_ids: Vec::new(),
        },
    )
    .await?;
    let completion = complete_in(txn, policy, payment.id).await?;
    let subscription_id = completion
        .report()
        .and_then(|report| report.activation())
        .and_then(|activation| activation.subscription())
        .map(|sub| sub.id);

    let transaction = referral_transactions::ActiveModel {
        id: Set(Uuid::now_v7()),
        user_id: Set(user_id),
        transaction_type: Set(sea_orm_active_enums::PointsTransactionType::Redeemed),
        points: Set(PointsTransactionType::Redeemed.signed(cost)),
        balance_after: Set(balance.points_balance),
        referral_id: Set(None),
        subscription_id: Set(subscription_id),
        description: Set(format!("Redeemed {cost} points for {}", tier.display_name)),
        created_at: Set(now),
    }
    .insert(txn)
    .await?;

    Ok(Redemption {
        transaction,
        balance,
        completion,
    })
}
