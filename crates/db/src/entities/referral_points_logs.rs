//! `SeaORM` Entity for referral_points_logs table.
//!
//! One row per award attempt. `subscription_id` is deliberately not a foreign
//! key: a log can name a subscription that no longer resolves.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{AwardOutcome, AwardReason};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "referral_points_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub user_id: Option<Uuid>,
    pub referral_id: Option<Uuid>,
    pub outcome: AwardOutcome,
    pub reason: AwardReason,
    #[sea_orm(column_type = "Text", nullable)]
    pub detail: Option<String>,
    pub points: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
