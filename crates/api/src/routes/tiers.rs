//! Tier catalog routes.

use axum::{Json, Router, extract::State, routing::get};

use studyhub_db::entities::subscription_tiers;

use crate::{ApiError, AppState};

/// Creates the tier routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/tiers", get(list_tiers))
}

/// GET `/tiers` - Active tiers in display order.
async fn list_tiers(
    State(state): State<AppState>,
) -> Result<Json<Vec<subscription_tiers::Model>>, ApiError> {
    Ok(Json(state.tiers().list_active().await?))
}
