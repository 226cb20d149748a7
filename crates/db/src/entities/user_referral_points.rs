//! `SeaORM` Entity for user_referral_points table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use studyhub_core::referral::PointsBalance;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "user_referral_points")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    pub points_balance: i32,
    pub total_earned: i32,
    pub total_redeemed: i32,
    pub successful_referrals: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Model> for PointsBalance {
    fn from(row: &Model) -> Self {
        Self {
            points_balance: row.points_balance,
            total_earned: row.total_earned,
            total_redeemed: row.total_redeemed,
            successful_referrals: row.successful_referrals,
        }
    }
}
