//! Integration tests for the payment → activation → award lifecycle.
//!
//! Each test runs against a fresh in-memory SQLite database with the catalog
//! seed applied.

#![allow(clippy::similar_names)]

mod common;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use uuid::Uuid;

use studyhub_core::referral::{AwardOutcome, AwardReason};
use studyhub_core::subscription::BillingCycle;
use studyhub_db::entities::{
    id_list::IdList,
    payment_transactions, referral_transactions, referrals,
    sea_orm_active_enums::{
        BillingCycle as DbBillingCycle, PaymentStatus, ReferralStatus, SubscriptionStatus,
    },
    user_referral_points, user_subscriptions,
};
use studyhub_db::lifecycle::{ActivationOutcome, ActivationSkip, LifecycleError};
use studyhub_db::repositories::{CreatePaymentInput, PaymentCompletion, PaymentError};
use studyhub_shared::types::TierId;

use common::setup;

#[tokio::test]
async fn test_first_purchase_activates_subscription() {
    let repos = setup().await;
    let user = Uuid::now_v7();

    let completion = repos.purchase(user, "basic", BillingCycle::Monthly).await;
    let report = completion.report().expect("lifecycle should have run");

    let ActivationOutcome::Activated {
        subscription,
        carryover,
        event,
    } = report.activation().expect("activation outcome")
    else {
        panic!("expected activation");
    };
    assert_eq!(subscription.user_id, user);
    assert_eq!(subscription.status, SubscriptionStatus::Active);
    assert_eq!(subscription.billing_cycle, DbBillingCycle::Monthly);
    assert_eq!(subscription.token_limit_override, None);
    assert_eq!(subscription.last_payment_id, Some(completion.payment().id));
    assert!(subscription.period_end_date.is_some());
    assert_eq!(carryover.carried_tokens, 0);
    assert_eq!(event.previous_status, None);
    assert!(!event.tier_changed);

    assert_eq!(completion.payment().status, PaymentStatus::Completed);
    assert!(completion.payment().completed_at.is_some());

    // Not referred: one skipped log row.
    let award = report.award().expect("award attempt");
    assert_eq!(award.reason, AwardReason::NoPendingReferral);
    assert_eq!(award.outcome, AwardOutcome::Skipped);
    let logs = repos.referrals.award_logs(subscription.id).await.unwrap();
    assert_eq!(logs.len(), 1);
}

#[tokio::test]
async fn test_upgrade_carries_unused_tokens() {
    let repos = setup().await;
    let user = Uuid::now_v7();

    repos.purchase(user, "basic", BillingCycle::Monthly).await;
    repos
        .subscriptions
        .record_token_usage(user, 40_000, None)
        .await
        .unwrap();

    let completion = repos.purchase(user, "pro", BillingCycle::Monthly).await;
    let ActivationOutcome::Activated {
        subscription,
        carryover,
        event,
    } = completion.report().unwrap().activation().unwrap()
    else {
        panic!("expected activation");
    };

    assert_eq!(carryover.carried_tokens, 60_000);
    assert_eq!(subscription.token_limit_override, Some(560_000));
    assert_eq!(subscription.tokens_used_current_period, 0);
    assert!(event.tier_changed);

    let snapshot = repos.subscriptions.entitlement(user).await.unwrap();
    assert_eq!(snapshot.tier_name.as_deref(), Some("pro"));
    assert_eq!(snapshot.token_limit, Some(560_000));
    assert_eq!(snapshot.tokens_remaining, Some(560_000));
}

#[tokio::test]
async fn test_fully_used_budget_carries_nothing() {
    let repos = setup().await;
    let user = Uuid::now_v7();

    repos.purchase(user, "basic", BillingCycle::Monthly).await;
    repos
        .subscriptions
        .record_token_usage(user, 100_000, None)
        .await
        .unwrap();

    let completion = repos.purchase(user, "pro", BillingCycle::Monthly).await;
    let sub = completion
        .report()
        .and_then(|r| r.activation())
        .and_then(ActivationOutcome::subscription)
        .unwrap();
    assert_eq!(sub.token_limit_override, None);
}

#[tokio::test]
async fn test_upgrade_to_unlimited_tier_drops_override() {
    let repos = setup().await;
    let user = Uuid::now_v7();

    repos.purchase(user, "basic", BillingCycle::Monthly).await;
    let completion = repos.purchase(user, "premium", BillingCycle::Yearly).await;
    let sub = completion
        .report()
        .and_then(|r| r.activation())
        .and_then(ActivationOutcome::subscription)
        .unwrap();

    assert_eq!(sub.token_limit_override, None);
    let snapshot = repos.subscriptions.entitlement(user).await.unwrap();
    assert_eq!(snapshot.token_limit, None);
    assert_eq!(snapshot.tokens_remaining, None);
}

#[tokio::test]
async fn test_lifetime_purchase_has_no_period_end() {
    let repos = setup().await;
    let user = Uuid::now_v7();

    repos.purchase(user, "pro", BillingCycle::Lifetime).await;
    let sub = repos.subscriptions.find_by_user(user).await.unwrap().unwrap();
    assert_eq!(sub.period_end_date, None);
}

#[tokio::test]
async fn test_one_subscription_row_per_user() {
    let repos = setup().await;
    let user = Uuid::now_v7();

    repos.purchase(user, "basic", BillingCycle::Monthly).await;
    repos.purchase(user, "pro", BillingCycle::Monthly).await;
    repos.purchase(user, "basic", BillingCycle::Yearly).await;

    let rows = user_subscriptions::Entity::find()
        .filter(user_subscriptions::Column::UserId.eq(user))
        .count(&repos.db)
        .await
        .unwrap();
    assert_eq!(rows, 1);

    let sub = repos.subscriptions.find_by_user(user).await.unwrap().unwrap();
    assert_eq!(sub.billing_cycle, DbBillingCycle::Yearly);
    assert_eq!(sub.tier_id, repos.tier("basic").await.id);
}

#[tokio::test]
async fn test_referral_award_end_to_end() {
    let repos = setup().await;
    let referrer = Uuid::now_v7();
    let referred = Uuid::now_v7();

    let referral = repos
        .referrals
        .create_referral(referrer, referred)
        .await
        .unwrap();
    assert_eq!(referral.status, ReferralStatus::Pending);

    let completion = repos.purchase(referred, "pro", BillingCycle::Monthly).await;
    let award = *completion.report().unwrap().award().unwrap();
    assert_eq!(award.outcome, AwardOutcome::Success);
    assert_eq!(award.reason, AwardReason::Awarded);
    assert_eq!(award.referrer_id, Some(referrer));
    assert_eq!(award.points, 250);
    assert_eq!(award.balance_after, Some(250));

    let balance = repos.referrals.balance(referrer).await.unwrap().unwrap();
    assert_eq!(balance.points_balance, 250);
    assert_eq!(balance.total_earned, 250);
    assert_eq!(balance.total_redeemed, 0);
    assert_eq!(balance.successful_referrals, 1);

    let ledger = referral_transactions::Entity::find()
        .filter(referral_transactions::Column::UserId.eq(referrer))
        .all(&repos.db)
        .await
        .unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].points, 250);
    assert_eq!(ledger[0].balance_after, 250);
    assert_eq!(ledger[0].referral_id, Some(referral.id));

    let referral = referrals::Entity::find_by_id(referral.id)
        .one(&repos.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(referral.status, ReferralStatus::Completed);
    assert_eq!(referral.points_awarded, 250);
    assert_eq!(referral.subscription_tier_id, Some(repos.tier("pro").await.id));
    assert!(referral.completed_at.is_some());

    repos.referrals.reconcile(referrer).await.unwrap();
}

#[tokio::test]
async fn test_free_tier_activation_skips_award() {
    let repos = setup().await;
    let referrer = Uuid::now_v7();
    let referred = Uuid::now_v7();
    let referral = repos
        .referrals
        .create_referral(referrer, referred)
        .await
        .unwrap();

    let completion = repos.purchase(referred, "free", BillingCycle::Monthly).await;
    let award = completion.report().unwrap().award().unwrap();
    assert_eq!(award.reason, AwardReason::FreeTier);
    assert_eq!(award.outcome, AwardOutcome::Skipped);

    let referral = referrals::Entity::find_by_id(referral.id)
        .one(&repos.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(referral.status, ReferralStatus::Pending);
    assert!(repos.referrals.balance(referrer).await.unwrap().is_none());

    // The later paid upgrade still pays the referrer.
    let completion = repos.purchase(referred, "basic", BillingCycle::Monthly).await;
    let award = completion.report().unwrap().award().unwrap();
    assert_eq!(award.reason, AwardReason::Awarded);
    assert_eq!(award.points, 100);
}

#[tokio::test]
async fn test_renewal_does_not_award_twice() {
    let repos = setup().await;
    let referrer = Uuid::now_v7();
    let referred = Uuid::now_v7();
    repos
        .referrals
        .create_referral(referrer, referred)
        .await
        .unwrap();

    repos.purchase(referred, "pro", BillingCycle::Monthly).await;
    let renewal = repos.purchase(referred, "pro", BillingCycle::Monthly).await;

    let award = renewal.report().unwrap().award().unwrap();
    assert_eq!(award.reason, AwardReason::NoPendingReferral);

    let balance = repos.referrals.balance(referrer).await.unwrap().unwrap();
    assert_eq!(balance.points_balance, 250);
    assert_eq!(balance.successful_referrals, 1);
}

#[tokio::test]
async fn test_completing_twice_is_idempotent() {
    let repos = setup().await;
    let referrer = Uuid::now_v7();
    let referred = Uuid::now_v7();
    repos
        .referrals
        .create_referral(referrer, referred)
        .await
        .unwrap();

    let first = repos.purchase(referred, "basic", BillingCycle::Monthly).await;
    let again = repos.payments.complete(first.payment().id).await.unwrap();

    assert!(matches!(again, PaymentCompletion::AlreadyCompleted { .. }));
    assert!(again.report().is_none());
    assert_eq!(again.payment().id, first.payment().id);

    let balance = repos.referrals.balance(referrer).await.unwrap().unwrap();
    assert_eq!(balance.points_balance, 100);
}

#[tokio::test]
async fn test_missing_tier_skips_activation() {
    let repos = setup().await;
    let user = Uuid::now_v7();
    let ghost_tier = Uuid::now_v7();
    let now = Utc::now();

    let payment = payment_transactions::ActiveModel {
        id: Set(Uuid::now_v7()),
        user_id: Set(user),
        tier_id: Set(ghost_tier),
        billing_cycle: Set(DbBillingCycle::Monthly),
        status: Set(PaymentStatus::Pending),
        payment_provider: Set(None),
        payment_method_id: Set(None),
        selected_grade_id: Set(None),
        selected_subject_ids: Set(IdList::default()),
        failure_reason: Set(None),
        completed_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&repos.db)
    .await
    .unwrap();

    let completion = repos.payments.complete(payment.id).await.unwrap();
    let report = completion.report().unwrap();

    assert!(matches!(
        report.activation(),
        Some(ActivationOutcome::Skipped(ActivationSkip::TierNotFound(id)))
            if *id == TierId::from_uuid(ghost_tier)
    ));
    assert!(report.awards.is_empty());
    assert_eq!(completion.payment().status, PaymentStatus::Completed);
    assert!(repos.subscriptions.find_by_user(user).await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_award_rolls_back_completion() {
    let repos = setup().await;
    let referrer = Uuid::now_v7();
    let referred = Uuid::now_v7();
    let referral = repos
        .referrals
        .create_referral(referrer, referred)
        .await
        .unwrap();

    let tier = repos.tier("pro").await;
    let payment = repos
        .payments
        .create_pending(CreatePaymentInput {
            user_id: referred,
            tier_id: tier.id,
            billing_cycle: BillingCycle::Monthly,
            payment_provider: Some("stripe".to_string()),
            payment_method_id: None,
            selected_grade_id: None,
            selected_subject_ids: Vec::new(),
        })
        .await
        .unwrap();

    // Break the ledger so the award's insert fails after the referral CAS.
    repos
        .db
        .execute_unprepared("DROP TABLE referral_transactions")
        .await
        .unwrap();

    let err = repos.payments.complete(payment.id).await.unwrap_err();
    let failure = err.award_failure().cloned().expect("award failure");
    assert!(matches!(
        err,
        PaymentError::Lifecycle(LifecycleError::AwardFailed(_))
    ));
    assert_eq!(failure.user_id, referred);
    assert_eq!(failure.referral_id, Some(referral.id));

    // Nothing from the attempt survived.
    let payment = repos.payments.find_by_id(payment.id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert!(repos.subscriptions.find_by_user(referred).await.unwrap().is_none());
    let referral = referrals::Entity::find_by_id(referral.id)
        .one(&repos.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(referral.status, ReferralStatus::Pending);
    let balances = user_referral_points::Entity::find()
        .count(&repos.db)
        .await
        .unwrap();
    assert_eq!(balances, 0);

    // Except the error log, written after the rollback.
    let logs = repos
        .referrals
        .award_logs(failure.subscription_id)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(
        logs[0].reason,
        studyhub_db::entities::sea_orm_active_enums::AwardReason::AwardFailed
    );
    assert_eq!(
        logs[0].outcome,
        studyhub_db::entities::sea_orm_active_enums::AwardOutcome::Error
    );
    assert_eq!(logs[0].detail.as_deref(), Some(failure.message.as_str()));
}

#[tokio::test]
async fn test_fail_only_from_pending() {
    let repos = setup().await;
    let tier = repos.tier("basic").await;
    let payment = repos
        .payments
        .create_pending(CreatePaymentInput {
            user_id: Uuid::now_v7(),
            tier_id: tier.id,
            billing_cycle: BillingCycle::Monthly,
            payment_provider: None,
            payment_method_id: None,
            selected_grade_id: None,
            selected_subject_ids: Vec::new(),
        })
        .await
        .unwrap();

    let failed = repos
        .payments
        .fail(payment.id, Some("card declined".to_string()))
        .await
        .unwrap();
    assert_eq!(failed.status, PaymentStatus::Failed);
    assert_eq!(failed.failure_reason.as_deref(), Some("card declined"));

    let err = repos.payments.fail(payment.id, None).await.unwrap_err();
    assert!(matches!(err, PaymentError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_create_payment_rejects_unknown_tier() {
    let repos = setup().await;
    let tier_id = Uuid::now_v7();

    let err = repos
        .payments
        .create_pending(CreatePaymentInput {
            user_id: Uuid::now_v7(),
            tier_id,
            billing_cycle: BillingCycle::Monthly,
            payment_provider: None,
            payment_method_id: None,
            selected_grade_id: None,
            selected_subject_ids: Vec::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::TierNotFound(id) if id == tier_id));
}

#[tokio::test]
async fn test_complete_unknown_payment() {
    let repos = setup().await;
    let id = Uuid::now_v7();
    let err = repos.payments.complete(id).await.unwrap_err();
    assert!(matches!(err, PaymentError::NotFound(missing) if missing == id));
}
