//! `SeaORM` Entity for user_subscriptions table.
//!
//! One row per user (`user_id` is unique). Rows are never deleted; a
//! cancelled or expired status is the soft delete.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use studyhub_core::subscription::{BillingPeriod, TokenBudget};

use super::id_list::IdList;
use super::sea_orm_active_enums::{BillingCycle, SubscriptionStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "user_subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    pub tier_id: Uuid,
    pub status: SubscriptionStatus,
    pub billing_cycle: BillingCycle,
    pub period_start_date: DateTimeWithTimeZone,
    pub period_end_date: Option<DateTimeWithTimeZone>,
    /// Carried-over limit for this period; wins over the tier limit.
    pub token_limit_override: Option<i64>,
    pub tokens_used_current_period: i64,
    pub papers_accessed_current_period: i32,
    #[sea_orm(column_type = "Json")]
    pub accessed_paper_ids: IdList,
    pub selected_grade_id: Option<Uuid>,
    #[sea_orm(column_type = "Json")]
    pub selected_subject_ids: IdList,
    pub payment_provider: Option<String>,
    pub last_payment_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subscription_tiers::Entity",
        from = "Column::TierId",
        to = "super::subscription_tiers::Column::Id"
    )]
    SubscriptionTiers,
    #[sea_orm(
        belongs_to = "super::grades::Entity",
        from = "Column::SelectedGradeId",
        to = "super::grades::Column::Id",
        on_delete = "SetNull"
    )]
    Grades,
    #[sea_orm(has_many = "super::token_usage_logs::Entity")]
    TokenUsageLogs,
}

impl Related<super::subscription_tiers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubscriptionTiers.def()
    }
}

impl Related<super::grades::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Grades.def()
    }
}

impl Related<super::token_usage_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TokenUsageLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Effective token budget given the tier's limit.
    #[must_use]
    pub fn token_budget(&self, tier_token_limit: Option<i64>) -> TokenBudget {
        TokenBudget::new(
            self.token_limit_override,
            tier_token_limit,
            self.tokens_used_current_period,
        )
    }

    /// Current billing period in UTC.
    #[must_use]
    pub fn period(&self) -> BillingPeriod {
        BillingPeriod {
            start: self.period_start_date.to_utc(),
            end: self.period_end_date.map(|end| end.to_utc()),
        }
    }
}
