//! Subscription tier catalog.

use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::entities::subscription_tiers;

/// Read access to the tier catalog.
#[derive(Debug, Clone)]
pub struct TierRepository {
    db: DatabaseConnection,
}

impl TierRepository {
    /// Creates a new tier repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Active tiers in display order.
    pub async fn list_active(&self) -> Result<Vec<subscription_tiers::Model>, DbErr> {
        subscription_tiers::Entity::find()
            .filter(subscription_tiers::Column::IsActive.eq(true))
            .order_by_asc(subscription_tiers::Column::SortOrder)
            .order_by_asc(subscription_tiers::Column::Name)
            .all(&self.db)
            .await
    }

    /// Finds a tier by id, active or not.
    pub async fn find_by_id(&self, tier_id: Uuid) -> Result<Option<subscription_tiers::Model>, DbErr> {
        subscription_tiers::Entity::find_by_id(tier_id)
            .one(&self.db)
            .await
    }

    /// Finds a tier by its unique name.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<subscription_tiers::Model>, DbErr> {
        subscription_tiers::Entity::find()
            .filter(subscription_tiers::Column::Name.eq(name))
            .one(&self.db)
            .await
    }
}
