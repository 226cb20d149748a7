//! AI model catalog and preference routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use studyhub_core::ai_model::ModelSource;
use studyhub_db::entities::{ai_models, user_ai_preferences};

use crate::{ApiError, AppState};

/// Creates the AI model routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ai-models", get(list_models))
        .route(
            "/users/{user_id}/ai-model",
            get(resolve_model).put(set_preference).delete(clear_preference),
        )
}

/// Request body for choosing a model.
#[derive(Debug, Deserialize)]
pub struct SetPreferenceRequest {
    /// Model to use.
    pub ai_model_id: Uuid,
}

/// The model serving a user and where it came from.
#[derive(Debug, Serialize)]
pub struct ResolvedModelResponse {
    /// The model.
    pub model: ai_models::Model,
    /// Cascade level that produced it.
    pub source: ModelSource,
}

/// GET `/ai-models` - Active models, default first.
async fn list_models(
    State(state): State<AppState>,
) -> Result<Json<Vec<ai_models::Model>>, ApiError> {
    Ok(Json(state.ai_models().list_active().await?))
}

/// GET `/users/{user_id}/ai-model` - Resolve the model for a user.
async fn resolve_model(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ResolvedModelResponse>, ApiError> {
    let resolved = state.ai_models().resolve_for_user(user_id).await?;
    Ok(Json(ResolvedModelResponse {
        model: resolved.model,
        source: resolved.source,
    }))
}

/// PUT `/users/{user_id}/ai-model` - Set the preferred model.
async fn set_preference(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SetPreferenceRequest>,
) -> Result<Json<user_ai_preferences::Model>, ApiError> {
    Ok(Json(
        state
            .ai_models()
            .set_preference(user_id, payload.ai_model_id)
            .await?,
    ))
}

/// DELETE `/users/{user_id}/ai-model` - Drop the preference.
async fn clear_preference(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.ai_models().clear_preference(user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}
