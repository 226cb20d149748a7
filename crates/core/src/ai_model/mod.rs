//! AI model resolution cascade.
//!
//! Resolution order: the user's personal preference, then the model assigned
//! to the tier of the user's active subscription, then the catalog default.
//! Inactive models are skipped at every level.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a resolved model came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    /// User's personal preference.
    UserPreference,
    /// Model assigned to the subscription tier.
    TierDefault,
    /// Catalog-wide default model.
    SystemDefault,
}

/// Anything that can sit in the model catalog.
pub trait CatalogModel {
    /// Whether the model may be served.
    fn is_active(&self) -> bool;
}

/// A resolved model and its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel<M> {
    /// The model.
    pub model: M,
    /// Cascade level that produced it.
    pub source: ModelSource,
}

/// AI model resolution errors.
#[derive(Debug, Error)]
pub enum AiModelError {
    /// No level of the cascade produced an active model.
    #[error("No active default AI model is configured")]
    NoDefaultModel,

    /// The model a user tried to select is unknown or inactive.
    #[error("AI model {0} is not available")]
    ModelUnavailable(String),
}

/// Runs the cascade over already-loaded candidates.
///
/// # Errors
///
/// Returns `AiModelError::NoDefaultModel` when all three levels are empty or inactive.
pub fn resolve_model<M: CatalogModel>(
    preference: Option<M>,
    tier_model: Option<M>,
    system_default: Option<M>,
) -> Result<ResolvedModel<M>, AiModelError> {
    [
        (preference, ModelSource::UserPreference),
        (tier_model, ModelSource::TierDefault),
        (system_default, ModelSource::SystemDefault),
    ]
    .into_iter()
    .find_map(|(candidate, source)| {
        candidate
            .filter(|model| model.is_active())
            .map(|model| ResolvedModel { model, source })
    })
    .ok_or(AiModelError::NoDefaultModel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Model {
        name: &'static str,
        active: bool,
    }

    impl CatalogModel for Model {
        fn is_active(&self) -> bool {
            self.active
        }
    }

    fn model(name: &'static str, active: bool) -> Option<Model> {
        Some(Model { name, active })
    }

    #[test]
    fn test_preference_wins() {
        let resolved =
            resolve_model(model("pref", true), model("tier", true), model("default", true))
                .unwrap();
        assert_eq!(resolved.model.name, "pref");
        assert_eq!(resolved.source, ModelSource::UserPreference);
    }

    #[test]
    fn test_inactive_preference_falls_through_to_tier() {
        let resolved =
            resolve_model(model("pref", false), model("tier", true), model("default", true))
                .unwrap();
        assert_eq!(resolved.model.name, "tier");
        assert_eq!(resolved.source, ModelSource::TierDefault);
    }

    #[test]
    fn test_system_default_last() {
        let resolved = resolve_model(None, None, model("default", true)).unwrap();
        assert_eq!(resolved.source, ModelSource::SystemDefault);
    }

    #[test]
    fn test_nothing_configured() {
        let result = resolve_model::<Model>(None, model("tier", false), None);
        assert!(matches!(result, Err(AiModelError::NoDefaultModel)));
    }
}
