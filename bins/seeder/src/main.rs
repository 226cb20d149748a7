//! Demo data seeder for StudyHub development and testing.
//!
//! The tier, grade, subject and AI model catalog is seeded by the migrator.
//! This binary adds a small referral network on top of it by driving the
//! same repositories the API uses, so awards and ledger rows are real:
//!
//! - a referrer with two referred users
//! - one referred user on `pro` (earns the referrer 250 points)
//! - one referred user on `free` (referral stays pending)
//!
//! Usage: cargo run --bin seeder

use anyhow::{Context, bail};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use studyhub_core::referral::AwardPolicy;
use studyhub_core::subscription::BillingCycle;
use studyhub_db::repositories::{
    CreatePaymentInput, PaymentRepository, ReferralLedgerError, ReferralRepository,
    SubscriptionRepository, TierRepository,
};
use studyhub_shared::AppConfig;

/// Referrer shared by all seeded referrals.
const DEMO_REFERRER_ID: &str = "00000000-0000-0000-0000-000000000001";
/// Referred user who buys `pro`.
const DEMO_PRO_USER_ID: &str = "00000000-0000-0000-0000-000000000002";
/// Referred user who stays on `free`.
const DEMO_FREE_USER_ID: &str = "00000000-0000-0000-0000-000000000003";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    println!("Connecting to database...");
    let db = studyhub_db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let policy = AwardPolicy::new(config.subscription.free_tier_name.clone());

    let referrer = Uuid::parse_str(DEMO_REFERRER_ID)?;
    let pro_user = Uuid::parse_str(DEMO_PRO_USER_ID)?;
    let free_user = Uuid::parse_str(DEMO_FREE_USER_ID)?;

    println!("Seeding referrals...");
    let referrals = ReferralRepository::new(db.clone(), policy.clone());
    for referred in [pro_user, free_user] {
        match referrals.create_referral(referrer, referred).await {
            Ok(referral) => println!("  Created referral {}", referral.id),
            Err(ReferralLedgerError::AlreadyReferred(_)) => {
                println!("  {referred} already referred, skipping...");
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("Seeding purchases...");
    seed_purchase(&db, &policy, pro_user, "pro", BillingCycle::Monthly).await?;
    seed_purchase(&db, &policy, free_user, "free", BillingCycle::Lifetime).await?;

    let summary = referrals.summary(referrer).await?;
    println!(
        "  Referrer balance: {} points ({} successful, {} pending)",
        summary.balance.points_balance,
        summary.balance.successful_referrals,
        summary.pending_referrals
    );

    println!("Seeding complete!");
    Ok(())
}

/// Buys `tier_name` for `user_id` unless the user already has a subscription.
async fn seed_purchase(
    db: &DatabaseConnection,
    policy: &AwardPolicy,
    user_id: Uuid,
    tier_name: &str,
    billing_cycle: BillingCycle,
) -> anyhow::Result<()> {
    let subscriptions = SubscriptionRepository::new(db.clone());
    if subscriptions.find_by_user(user_id).await?.is_some() {
        println!("  {user_id} already subscribed, skipping...");
        return Ok(());
    }

    let Some(tier) = TierRepository::new(db.clone())
        .find_by_name(tier_name)
        .await?
    else {
        bail!("Tier {tier_name} is not seeded; run the migrator first");
    };

    let payments = PaymentRepository::new(db.clone(), policy.clone());
    let payment = payments
        .create_pending(CreatePaymentInput {
            user_id,
            tier_id: tier.id,
            billing_cycle,
            payment_provider: Some("seed".to_string()),
            payment_method_id: None,
            selected_grade_id: None,
            selected_subject_ids: Vec::new(),
        })
        .await?;
    let completion = payments.complete(payment.id).await?;

    let award = completion.report().and_then(|report| report.award());
    println!("  {user_id} bought {tier_name}: award {award:?}");
    Ok(())
}
