//! `SeaORM` Entity for payment_transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::id_list::IdList;
use super::sea_orm_active_enums::{BillingCycle, PaymentStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub tier_id: Uuid,
    pub billing_cycle: BillingCycle,
    pub status: PaymentStatus,
    pub payment_provider: Option<String>,
    pub payment_method_id: Option<String>,
    pub selected_grade_id: Option<Uuid>,
    #[sea_orm(column_type = "Json")]
    pub selected_subject_ids: IdList,
    pub failure_reason: Option<String>,
    pub completed_at: Option<DateTimeWithTimeZone>,
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
}

impl Related<super::subscription_tiers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubscriptionTiers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
