//! `SeaORM` Entity for referrals table.
//!
//! A user can be referred at most once (`referred_id` is unique).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ReferralStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "referrals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub referrer_id: Uuid,
    #[sea_orm(unique)]
    pub referred_id: Uuid,
    pub status: ReferralStatus,
    pub points_awarded: i32,
    pub subscription_tier_id: Option<Uuid>,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subscription_tiers::Entity",
        from = "Column::SubscriptionTierId",
        to = "super::subscription_tiers::Column::Id",
        on_delete = "SetNull"
    )]
    SubscriptionTiers,
    #[sea_orm(has_many = "super::referral_transactions::Entity")]
    ReferralTransactions,
}

impl Related<super::subscription_tiers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubscriptionTiers.def()
    }
}

impl Related<super::referral_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReferralTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
