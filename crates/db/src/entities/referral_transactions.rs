//! `SeaORM` Entity for referral_transactions table.
//!
//! Append-only. `points` is signed: earned entries are positive, redeemed
//! entries negative.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use studyhub_core::referral::LedgerEntry;

use super::sea_orm_active_enums::PointsTransactionType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "referral_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub transaction_type: PointsTransactionType,
    pub points: i32,
    pub balance_after: i32,
    pub referral_id: Option<Uuid>,
    pub subscription_id: Option<Uuid>,
    pub description: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::referrals::Entity",
        from = "Column::ReferralId",
        to = "super::referrals::Column::Id",
        on_delete = "SetNull"
    )]
    Referrals,
}

impl Related<super::referrals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Referrals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Model> for LedgerEntry {
    fn from(row: &Model) -> Self {
        Self {
            kind: row.transaction_type.into(),
            points: row.points,
            balance_after: row.balance_after,
        }
    }
}
