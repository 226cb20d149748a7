//! AI model catalog, user preferences and model resolution.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, prelude::DateTimeWithTimeZone, sea_query::OnConflict,
};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use studyhub_core::ai_model::{AiModelError, ResolvedModel, resolve_model};

use crate::entities::{
    ai_models, sea_orm_active_enums::SubscriptionStatus, subscription_tiers, user_ai_preferences,
    user_subscriptions,
};

/// Errors from AI model operations.
#[derive(Debug, Error)]
pub enum AiModelRepoError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Resolution or selection rule violation.
    #[error(transparent)]
    Model(#[from] AiModelError),
}

/// Repository for AI models and per-user preferences.
#[derive(Debug, Clone)]
pub struct AiModelRepository {
    db: DatabaseConnection,
}

impl AiModelRepository {
    /// Creates a new AI model repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Active models, default first.
    pub async fn list_active(&self) -> Result<Vec<ai_models::Model>, DbErr> {
        ai_models::Entity::find()
            .filter(ai_models::Column::IsActive.eq(true))
            .order_by_desc(ai_models::Column::IsDefault)
            .order_by_asc(ai_models::Column::DisplayName)
            .all(&self.db)
            .await
    }

    /// Resolves the model serving `user_id`: preference, then tier model, then
    /// catalog default.
    pub async fn resolve_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<ResolvedModel<ai_models::Model>, AiModelRepoError> {
        let preference = user_ai_preferences::Entity::find()
            .filter(user_ai_preferences::Column::UserId.eq(user_id))
            .filter(user_ai_preferences::Column::IsActive.eq(true))
            .find_also_related(ai_models::Entity)
            .one(&self.db)
            .await?
            .and_then(|(_, model)| model);

        let tier_model = match user_subscriptions::Entity::find()
            .filter(user_subscriptions::Column::UserId.eq(user_id))
            .filter(user_subscriptions::Column::Status.eq(SubscriptionStatus::Active))
            .find_also_related(subscription_tiers::Entity)
            .one(&self.db)
            .await?
            .and_then(|(_, tier)| tier)
            .and_then(|tier| tier.ai_model_id)
        {
            Some(model_id) => ai_models::Entity::find_by_id(model_id).one(&self.db).await?,
            None => None,
        };

        let system_default = ai_models::Entity::find()
            .filter(ai_models::Column::IsDefault.eq(true))
            .filter(ai_models::Column::IsActive.eq(true))
            .order_by_desc(ai_models::Column::UpdatedAt)
            .one(&self.db)
            .await?;

        Ok(resolve_model(preference, tier_model, system_default)?)
    }

    /// Sets the user's preferred model. The model must exist and be active.
    pub async fn set_preference(
        &self,
        user_id: Uuid,
        model_id: Uuid,
    ) -> Result<user_ai_preferences::Model, AiModelRepoError> {
        let model = ai_models::Entity::find_by_id(model_id)
            .one(&self.db)
            .await?
            .filter(|model| model.is_active)
            .ok_or_else(|| AiModelError::ModelUnavailable(model_id.to_string()))?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        user_ai_preferences::Entity::insert(user_ai_preferences::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(user_id),
            ai_model_id: Set(model.id),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        })
        .on_conflict(
            OnConflict::column(user_ai_preferences::Column::UserId)
                .update_columns([
                    user_ai_preferences::Column::AiModelId,
                    user_ai_preferences::Column::IsActive,
                    user_ai_preferences::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;

        info!(%user_id, model = %model.model_name, "AI model preference set");

        user_ai_preferences::Entity::find()
            .filter(user_ai_preferences::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                DbErr::RecordNotFound(format!("AI preference for user {user_id}")).into()
            })
    }

    /// Removes the user's preference. Returns whether one existed.
    pub async fn clear_preference(&self, user_id: Uuid) -> Result<bool, DbErr> {
        let result = user_ai_preferences::Entity::delete_many()
            .filter(user_ai_preferences::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Retires a model from the catalog without deleting it.
    pub async fn deactivate(&self, model_id: Uuid) -> Result<Option<ai_models::Model>, DbErr> {
        let Some(model) = ai_models::Entity::find_by_id(model_id).one(&self.db).await? else {
            return Ok(None);
        };
        let mut active: ai_models::ActiveModel = model.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now().into());
        Ok(Some(active.update(&self.db).await?))
    }
}
