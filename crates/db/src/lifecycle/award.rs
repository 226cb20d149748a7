//! Referral points award on subscription activation.
//!
//! Every attempt leaves exactly one row in `referral_points_logs`. The pending
//! referral is locked, then completed with a compare-and-swap on its status,
//! so a referral pays out at most once no matter how many activations race
//! for it.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
    prelude::DateTimeWithTimeZone,
    sea_query::{Expr, OnConflict},
};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use studyhub_core::events::SubscriptionActivated;
use studyhub_core::referral::{
    AwardDecision, AwardOutcome, AwardPolicy, AwardReason, AwardSubject,
};
use studyhub_shared::types::ReferralId;

use crate::entities::{
    referral_points_logs, referral_transactions, referrals,
    sea_orm_active_enums::{self, PointsTransactionType, ReferralStatus},
    subscription_tiers, user_referral_points, user_subscriptions,
};

use super::LifecycleError;

/// What an award attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AwardRecord {
    /// Activated subscription.
    pub subscription_id: Uuid,
    /// Outcome class.
    pub outcome: AwardOutcome,
    /// Reason code.
    pub reason: AwardReason,
    /// Referral involved, when one was found.
    pub referral_id: Option<Uuid>,
    /// Referrer credited, on success.
    pub referrer_id: Option<Uuid>,
    /// Points credited (0 unless successful).
    pub points: i32,
    /// Referrer balance right after the credit, on success.
    pub balance_after: Option<i32>,
}

impl AwardRecord {
    fn skipped(subscription_id: Uuid, reason: AwardReason, referral_id: Option<Uuid>) -> Self {
        Self {
            subscription_id,
            outcome: reason.outcome(),
            reason,
            referral_id,
            referrer_id: None,
            points: 0,
            balance_after: None,
        }
    }
}

/// Details of a failed award, persisted after the enclosing rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardFailure {
    /// Activated subscription.
    pub subscription_id: Uuid,
    /// Subscriber.
    pub user_id: Uuid,
    /// Referral being completed.
    pub referral_id: Option<Uuid>,
    /// Underlying error text.
    pub message: String,
}

/// Awards referral points for a subscription activation.
///
/// Skips are logged in `txn`. The award itself runs in a savepoint; if it
/// fails the savepoint is rolled back and `LifecycleError::AwardFailed` is
/// returned so the caller can abort and persist the error log.
///
/// # Errors
///
/// Returns `AwardFailed` when the award sequence fails, or a database error
/// if the pre-award reads or the skip log fail.
pub async fn on_subscription_activated(
    txn: &DatabaseTransaction,
    policy: &AwardPolicy,
    event: &SubscriptionActivated,
) -> Result<AwardRecord, LifecycleError> {
    let subscription_id = event.subscription_id.into_inner();
    let user_id = event.user_id.into_inner();

    let subscription = user_subscriptions::Entity::find_by_id(subscription_id)
        .one(txn)
        .await?;
    let tier = match subscription.as_ref() {
        Some(sub) => subscription_tiers::Entity::find_by_id(sub.tier_id)
            .one(txn)
            .await?,
        None => None,
    };
    let subject = tier.as_ref().map(|tier| AwardSubject {
        tier_name: tier.name.clone(),
        referral_points_awarded: tier.referral_points_awarded,
    });

    if let Err(reason) = policy.screen(subject.as_ref()) {
        let record = AwardRecord::skipped(subscription_id, reason, None);
        write_log(txn, &record, Some(user_id), None).await?;
        debug!(%subscription_id, reason = reason.as_str(), "Referral award skipped");
        return Ok(record);
    }

    let referral = referrals::Entity::find()
        .filter(referrals::Column::ReferredId.eq(user_id))
        .filter(referrals::Column::Status.eq(ReferralStatus::Pending))
        .lock_exclusive()
        .one(txn)
        .await?;

    let decision = policy.decide(
        subject.as_ref(),
        referral.as_ref().map(|r| ReferralId::from_uuid(r.id)),
    );

    let (referral, tier, points) = match (decision, referral, tier) {
        (AwardDecision::Award { points, .. }, Some(referral), Some(tier)) => {
            (referral, tier, points)
        }
        (AwardDecision::Skip(reason), referral, _) => {
            let referral_id = referral.as_ref().map(|r| r.id);
            let record = AwardRecord::skipped(subscription_id, reason, referral_id);
            write_log(txn, &record, Some(user_id), None).await?;
            debug!(%subscription_id, reason = reason.as_str(), "Referral award skipped");
            return Ok(record);
        }
        // `decide` only awards when both the referral and the tier resolved.
        (AwardDecision::Award { .. }, _, _) => {
            let record =
                AwardRecord::skipped(subscription_id, AwardReason::SubscriptionNotFound, None);
            write_log(txn, &record, Some(user_id), None).await?;
            return Ok(record);
        }
    };

    let savepoint = txn.begin().await?;
    match apply_award(&savepoint, subscription_id, user_id, &referral, &tier, points).await {
        Ok(record) => {
            savepoint.commit().await?;
            Ok(record)
        }
        Err(e) => {
            error!(
                error = %e,
                %subscription_id,
                referral_id = %referral.id,
                "Referral award failed, rolling back"
            );
            if let Err(rollback) = savepoint.rollback().await {
                warn!(error = %rollback, "Savepoint rollback failed");
            }
            Err(LifecycleError::AwardFailed(AwardFailure {
                subscription_id,
                user_id,
                referral_id: Some(referral.id),
                message: e.to_string(),
            }))
        }
    }
}

/// Completes the referral, credits the referrer, and appends ledger and log rows.
async fn apply_award(
    txn: &DatabaseTransaction,
    subscription_id: Uuid,
    user_id: Uuid,
    referral: &referrals::Model,
    tier: &subscription_tiers::Model,
    points: i32,
) -> Result<AwardRecord, DbErr> {
    let now: DateTimeWithTimeZone = Utc::now().into();

    let completed = referrals::Entity::update_many()
        .set(referrals::ActiveModel {
            status: Set(ReferralStatus::Completed),
            points_awarded: Set(points),
            subscription_tier_id: Set(Some(tier.id)),
            completed_at: Set(Some(now)),
            ..Default::default()
        })
        .filter(referrals::Column::Id.eq(referral.id))
        .filter(referrals::Column::Status.eq(ReferralStatus::Pending))
        .exec(txn)
        .await?;

    if completed.rows_affected == 0 {
        let record = AwardRecord::skipped(
            subscription_id,
            AwardReason::AlreadyAwarded,
            Some(referral.id),
        );
        write_log(txn, &record, Some(user_id), None).await?;
        info!(%subscription_id, referral_id = %referral.id, "Referral already awarded concurrently");
        return Ok(record);
    }

    let balance_after = credit_points(txn, referral.referrer_id, points, now).await?;

    referral_transactions::ActiveModel {
        id: Set(Uuid::now_v7()),
        user_id: Set(referral.referrer_id),
        transaction_type: Set(PointsTransactionType::Earned),
        points: Set(points),
        balance_after: Set(balance_after),
        referral_id: Set(Some(referral.id)),
        subscription_id: Set(Some(subscription_id)),
        description: Set(format!(
            "Referral reward: referred user subscribed to {}",
            tier.display_name
        )),
        created_at: Set(now),
    }
    .insert(txn)
    .await?;

    let record = AwardRecord {
        subscription_id,
        outcome: AwardOutcome::Success,
        reason: AwardReason::Awarded,
        referral_id: Some(referral.id),
        referrer_id: Some(referral.referrer_id),
        points,
        balance_after: Some(balance_after),
    };
    write_log(txn, &record, Some(user_id), None).await?;

    info!(
        %subscription_id,
        referral_id = %referral.id,
        referrer_id = %referral.referrer_id,
        points,
        balance_after,
        "Referral points awarded"
    );

    Ok(record)
}

/// Adds `points` to the referrer's balance row, creating it when missing.
///
/// Returns the balance after the credit.
async fn credit_points(
    txn: &DatabaseTransaction,
    referrer_id: Uuid,
    points: i32,
    now: DateTimeWithTimeZone,
) -> Result<i32, DbErr> {
    user_referral_points::Entity::insert(user_referral_points::ActiveModel {
        id: Set(Uuid::now_v7()),
        user_id: Set(referrer_id),
        points_balance: Set(0),
        total_earned: Set(0),
        total_redeemed: Set(0),
        successful_referrals: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    })
    .on_conflict(
        OnConflict::column(user_referral_points::Column::UserId)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(txn)
    .await?;

    user_referral_points::Entity::update_many()
        .col_expr(
            user_referral_points::Column::PointsBalance,
            Expr::col(user_referral_points::Column::PointsBalance).add(points),
        )
        .col_expr(
            user_referral_points::Column::TotalEarned,
            Expr::col(user_referral_points::Column::TotalEarned).add(points),
        )
        .col_expr(
            user_referral_points::Column::SuccessfulReferrals,
            Expr::col(user_referral_points::Column::SuccessfulReferrals).add(1),
        )
        .col_expr(user_referral_points::Column::UpdatedAt, Expr::value(now))
        .filter(user_referral_points::Column::UserId.eq(referrer_id))
        .exec(txn)
        .await?;

    let balance = user_referral_points::Entity::find()
        .filter(user_referral_points::Column::UserId.eq(referrer_id))
        .one(txn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("points balance for {referrer_id}")))?;

    Ok(balance.points_balance)
}

/// Appends one row to the award log.
pub(crate) async fn write_log<C: ConnectionTrait>(
    conn: &C,
    record: &AwardRecord,
    user_id: Option<Uuid>,
    detail: Option<String>,
) -> Result<(), DbErr> {
    referral_points_logs::ActiveModel {
        id: Set(Uuid::now_v7()),
        subscription_id: Set(record.subscription_id),
        user_id: Set(user_id),
        referral_id: Set(record.referral_id),
        outcome: Set(sea_orm_active_enums::AwardOutcome::from(record.outcome)),
        reason: Set(sea_orm_active_enums::AwardReason::from(record.reason)),
        detail: Set(detail.or_else(|| Some(record.reason.describe().to_string()))),
        points: Set(record.points),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseConnection, PaginatorTrait};
    use sea_orm_migration::MigratorTrait;
    use studyhub_core::subscription::BillingCycle;
    use studyhub_shared::config::DatabaseConfig;

    use super::*;
    use crate::migration::Migrator;
    use crate::repositories::{CreatePaymentInput, PaymentRepository, ReferralRepository};

    async fn setup_db() -> DatabaseConnection {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            auto_migrate: false,
        };
        let db = crate::connect(&config).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn tier(db: &DatabaseConnection, name: &str) -> subscription_tiers::Model {
        subscription_tiers::Entity::find()
            .filter(subscription_tiers::Column::Name.eq(name))
            .one(db)
            .await
            .unwrap()
            .unwrap()
    }

    /// Loses the status swap the way a second activation does when another
    /// transaction completed the referral after it was read as pending.
    #[tokio::test]
    async fn test_lost_referral_swap_logs_already_awarded() {
        let db = setup_db().await;
        let policy = AwardPolicy::default();
        let referrals_repo = ReferralRepository::new(db.clone(), policy.clone());
        let payments = PaymentRepository::new(db.clone(), policy);

        let referrer = Uuid::now_v7();
        let referred = Uuid::now_v7();
        let stale = referrals_repo
            .create_referral(referrer, referred)
            .await
            .unwrap();

        // Free activation gives the referred user a subscription without paying out.
        let free = tier(&db, "free").await;
        let payment = payments
            .create_pending(CreatePaymentInput {
                user_id: referred,
                tier_id: free.id,
                billing_cycle: BillingCycle::Monthly,
                payment_provider: None,
                payment_method_id: None,
                selected_grade_id: None,
                selected_subject_ids: Vec::new(),
            })
            .await
            .unwrap();
        payments.complete(payment.id).await.unwrap();
        let subscription = user_subscriptions::Entity::find()
            .filter(user_subscriptions::Column::UserId.eq(referred))
            .one(&db)
            .await
            .unwrap()
            .unwrap();

        referrals::Entity::update_many()
            .set(referrals::ActiveModel {
                status: Set(ReferralStatus::Completed),
                ..Default::default()
            })
            .filter(referrals::Column::Id.eq(stale.id))
            .exec(&db)
            .await
            .unwrap();
        assert_eq!(stale.status, ReferralStatus::Pending);

        let pro = tier(&db, "pro").await;
        let txn = db.begin().await.unwrap();
        let record = apply_award(&txn, subscription.id, referred, &stale, &pro, 250)
            .await
            .unwrap();
        txn.commit().await.unwrap();

        assert_eq!(record.reason, AwardReason::AlreadyAwarded);
        assert_eq!(record.outcome, AwardReason::AlreadyAwarded.outcome());
        assert_eq!(record.points, 0);
        assert_eq!(record.referral_id, Some(stale.id));
        assert!(record.referrer_id.is_none());

        let balance = user_referral_points::Entity::find()
            .filter(user_referral_points::Column::UserId.eq(referrer))
            .one(&db)
            .await
            .unwrap();
        assert!(balance.is_none());

        let ledger_rows = referral_transactions::Entity::find()
            .filter(referral_transactions::Column::UserId.eq(referrer))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(ledger_rows, 0);

        let logs = referral_points_logs::Entity::find()
            .filter(referral_points_logs::Column::SubscriptionId.eq(subscription.id))
            .filter(
                referral_points_logs::Column::Reason
                    .eq(sea_orm_active_enums::AwardReason::AlreadyAwarded),
            )
            .all(&db)
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].referral_id, Some(stale.id));
        assert_eq!(logs[0].points, 0);

        let referral = referrals::Entity::find_by_id(stale.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(referral.points_awarded, stale.points_awarded);
        assert!(referral.subscription_tier_id.is_none());
    }
}
