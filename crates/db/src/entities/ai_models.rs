//! `SeaORM` Entity for ai_models table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use studyhub_core::ai_model::CatalogModel;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "ai_models")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub provider: String,
    #[sea_orm(unique)]
    pub model_name: String,
    pub display_name: String,
    pub supports_vision: bool,
    pub supports_streaming: bool,
    pub max_context_tokens: Option<i32>,
    pub input_price_per_million: Option<Decimal>,
    pub output_price_per_million: Option<Decimal>,
    pub token_multiplier: Decimal,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::subscription_tiers::Entity")]
    SubscriptionTiers,
    #[sea_orm(has_many = "super::user_ai_preferences::Entity")]
    UserAiPreferences,
}

impl Related<super::subscription_tiers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubscriptionTiers.def()
    }
}

impl Related<super::user_ai_preferences::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserAiPreferences.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl CatalogModel for Model {
    fn is_active(&self) -> bool {
        self.is_active
    }
}
