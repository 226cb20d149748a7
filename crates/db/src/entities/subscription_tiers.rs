//! `SeaORM` Entity for subscription_tiers table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use studyhub_core::selection::SelectionRules;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "subscription_tiers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    /// `None` means unlimited.
    pub token_limit: Option<i64>,
    pub max_subjects: i32,
    pub can_select_grade: bool,
    pub can_select_subjects: bool,
    pub referral_points_awarded: i32,
    /// Points needed to redeem this tier; 0 means not redeemable.
    pub points_cost: i32,
    pub ai_model_id: Option<Uuid>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ai_models::Entity",
        from = "Column::AiModelId",
        to = "super::ai_models::Column::Id",
        on_delete = "SetNull"
    )]
    AiModels,
    #[sea_orm(has_many = "super::user_subscriptions::Entity")]
    UserSubscriptions,
}

impl Related<super::ai_models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AiModels.def()
    }
}

impl Related<super::user_subscriptions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserSubscriptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Selection permissions granted by this tier.
    #[must_use]
    pub const fn selection_rules(&self) -> SelectionRules {
        SelectionRules {
            can_select_grade: self.can_select_grade,
            can_select_subjects: self.can_select_subjects,
            max_subjects: self.max_subjects,
        }
    }
}
