//! Migration to seed the catalog: AI models, subscription tiers, grades and
//! subjects.
//!
//! Ids are fixed so environments agree on them.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm_migration::prelude::*;
use uuid::Uuid;

use super::m20261019_000001_catalog::{AiModels, Grades, Subjects, SubscriptionTiers};

/// Catalog default model.
pub const DEFAULT_MODEL_ID: Uuid = Uuid::from_u128(0x0199_f000_0000_7000_8000_0000_0000_0001);
/// Model assigned to the premium tier.
pub const PREMIUM_MODEL_ID: Uuid = Uuid::from_u128(0x0199_f000_0000_7000_8000_0000_0000_0002);

const TIER_BASE: u128 = 0x0199_f000_0000_7000_8000_0000_0001_0000;
const GRADE_BASE: u128 = 0x0199_f000_0000_7000_8000_0000_0002_0000;
const SUBJECT_BASE: u128 = 0x0199_f000_0000_7000_8000_0000_0003_0000;

struct TierSeed {
    name: &'static str,
    display_name: &'static str,
    token_limit: Option<i64>,
    max_subjects: i32,
    can_select: bool,
    referral_points_awarded: i32,
    points_cost: i32,
    ai_model_id: Option<Uuid>,
}

const TIERS: [TierSeed; 4] = [
    TierSeed {
        name: "free",
        display_name: "Free",
        token_limit: Some(10_000),
        max_subjects: 1,
        can_select: false,
        referral_points_awarded: 0,
        points_cost: 0,
        ai_model_id: None,
    },
    TierSeed {
        name: "basic",
        display_name: "Basic",
        token_limit: Some(100_000),
        max_subjects: 3,
        can_select: true,
        referral_points_awarded: 100,
        points_cost: 1_000,
        ai_model_id: None,
    },
    TierSeed {
        name: "pro",
        display_name: "Pro",
        token_limit: Some(500_000),
        max_subjects: 6,
        can_select: true,
        referral_points_awarded: 250,
        points_cost: 2_500,
        ai_model_id: None,
    },
    TierSeed {
        name: "premium",
        display_name: "Premium",
        token_limit: None,
        max_subjects: 12,
        can_select: true,
        referral_points_awarded: 500,
        points_cost: 5_000,
        ai_model_id: Some(PREMIUM_MODEL_ID),
    },
];

const GRADES: [&str; 3] = ["Grade 10", "Grade 11", "Grade 12"];
const SUBJECTS: [&str; 4] = ["Mathematics", "Physical Sciences", "Life Sciences", "English"];

fn seed_err(e: impl std::fmt::Display) -> DbErr {
    DbErr::Custom(format!("catalog seed: {e}"))
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let now = Utc::now().fixed_offset();

        let mut models = Query::insert()
            .into_table(AiModels::Table)
            .columns([
                AiModels::Id,
                AiModels::Provider,
                AiModels::ModelName,
                AiModels::DisplayName,
                AiModels::SupportsVision,
                AiModels::SupportsStreaming,
                AiModels::MaxContextTokens,
                AiModels::TokenMultiplier,
                AiModels::IsDefault,
                AiModels::IsActive,
                AiModels::CreatedAt,
                AiModels::UpdatedAt,
            ])
            .to_owned();
        models
            .values([
                DEFAULT_MODEL_ID.into(),
                "openai".into(),
                "gpt-4o-mini".into(),
                "GPT-4o mini".into(),
                true.into(),
                true.into(),
                128_000.into(),
                Decimal::ONE.into(),
                true.into(),
                true.into(),
                now.into(),
                now.into(),
            ])
            .map_err(seed_err)?;
        models
            .values([
                PREMIUM_MODEL_ID.into(),
                "anthropic".into(),
                "claude-sonnet-4".into(),
                "Claude Sonnet 4".into(),
                true.into(),
                true.into(),
                200_000.into(),
                Decimal::new(3, 0).into(),
                false.into(),
                true.into(),
                now.into(),
                now.into(),
            ])
            .map_err(seed_err)?;
        manager.exec_stmt(models).await?;

        let mut tiers = Query::insert()
            .into_table(SubscriptionTiers::Table)
            .columns([
                SubscriptionTiers::Id,
                SubscriptionTiers::Name,
                SubscriptionTiers::DisplayName,
                SubscriptionTiers::TokenLimit,
                SubscriptionTiers::MaxSubjects,
                SubscriptionTiers::CanSelectGrade,
                SubscriptionTiers::CanSelectSubjects,
                SubscriptionTiers::ReferralPointsAwarded,
                SubscriptionTiers::PointsCost,
                SubscriptionTiers::AiModelId,
                SubscriptionTiers::SortOrder,
                SubscriptionTiers::IsActive,
                SubscriptionTiers::CreatedAt,
                SubscriptionTiers::UpdatedAt,
            ])
            .to_owned();
        for (order, tier) in (0_i32..).zip(TIERS.iter()) {
            tiers
                .values([
                    Uuid::from_u128(TIER_BASE + u128::from(order.unsigned_abs())).into(),
                    tier.name.into(),
                    tier.display_name.into(),
                    tier.token_limit.into(),
                    tier.max_subjects.into(),
                    tier.can_select.into(),
                    tier.can_select.into(),
                    tier.referral_points_awarded.into(),
                    tier.points_cost.into(),
                    tier.ai_model_id.into(),
                    order.into(),
                    true.into(),
                    now.into(),
                    now.into(),
                ])
                .map_err(seed_err)?;
        }
        manager.exec_stmt(tiers).await?;

        let mut grades = Query::insert()
            .into_table(Grades::Table)
            .columns([
                Grades::Id,
                Grades::Name,
                Grades::SortOrder,
                Grades::IsActive,
                Grades::CreatedAt,
            ])
            .to_owned();
        let mut subjects = Query::insert()
            .into_table(Subjects::Table)
            .columns([
                Subjects::Id,
                Subjects::GradeId,
                Subjects::Name,
                Subjects::IsActive,
                Subjects::CreatedAt,
            ])
            .to_owned();
        let mut subject_seq: u128 = 0;
        for (order, grade) in (0_i32..).zip(GRADES) {
            let grade_id = Uuid::from_u128(GRADE_BASE + u128::from(order.unsigned_abs()));
            grades
                .values([
                    grade_id.into(),
                    grade.into(),
                    order.into(),
                    true.into(),
                    now.into(),
                ])
                .map_err(seed_err)?;
            for subject in SUBJECTS {
                subjects
                    .values([
                        Uuid::from_u128(SUBJECT_BASE + subject_seq).into(),
                        grade_id.into(),
                        subject.into(),
                        true.into(),
                        now.into(),
                    ])
                    .map_err(seed_err)?;
                subject_seq += 1;
            }
        }
        manager.exec_stmt(grades).await?;
        manager.exec_stmt(subjects).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(Query::delete().from_table(Subjects::Table).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(Grades::Table).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(SubscriptionTiers::Table).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(AiModels::Table).to_owned())
            .await
    }
}
