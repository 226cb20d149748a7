//! Integration tests for AI model resolution and preferences.

mod common;

use uuid::Uuid;

use studyhub_core::ai_model::{AiModelError, ModelSource};
use studyhub_core::subscription::BillingCycle;
use studyhub_db::migration::{DEFAULT_MODEL_ID, PREMIUM_MODEL_ID};
use studyhub_db::repositories::{AiModelRepoError, AiModelRepository};

use common::setup;

#[tokio::test]
async fn test_catalog_default_without_subscription() {
    let repos = setup().await;
    let models = AiModelRepository::new(repos.db.clone());

    let resolved = models.resolve_for_user(Uuid::now_v7()).await.unwrap();
    assert_eq!(resolved.model.id, DEFAULT_MODEL_ID);
    assert_eq!(resolved.source, ModelSource::SystemDefault);

    let active = models.list_active().await.unwrap();
    assert_eq!(active.len(), 2);
    assert!(active[0].is_default);
}

#[tokio::test]
async fn test_tier_model_and_fallback() {
    let repos = setup().await;
    let models = AiModelRepository::new(repos.db.clone());
    let premium_user = Uuid::now_v7();
    let basic_user = Uuid::now_v7();
    repos.purchase(premium_user, "premium", BillingCycle::Monthly).await;
    repos.purchase(basic_user, "basic", BillingCycle::Monthly).await;

    let resolved = models.resolve_for_user(premium_user).await.unwrap();
    assert_eq!(resolved.model.id, PREMIUM_MODEL_ID);
    assert_eq!(resolved.source, ModelSource::TierDefault);

    // Basic has no tier model.
    let resolved = models.resolve_for_user(basic_user).await.unwrap();
    assert_eq!(resolved.source, ModelSource::SystemDefault);

    // An inactive tier model falls through to the default.
    models.deactivate(PREMIUM_MODEL_ID).await.unwrap();
    let resolved = models.resolve_for_user(premium_user).await.unwrap();
    assert_eq!(resolved.model.id, DEFAULT_MODEL_ID);
    assert_eq!(resolved.source, ModelSource::SystemDefault);
}

#[tokio::test]
async fn test_preference_wins_until_cleared() {
    let repos = setup().await;
    let models = AiModelRepository::new(repos.db.clone());
    let user = Uuid::now_v7();

    let preference = models.set_preference(user, PREMIUM_MODEL_ID).await.unwrap();
    assert_eq!(preference.ai_model_id, PREMIUM_MODEL_ID);
    assert!(preference.is_active);

    let resolved = models.resolve_for_user(user).await.unwrap();
    assert_eq!(resolved.model.id, PREMIUM_MODEL_ID);
    assert_eq!(resolved.source, ModelSource::UserPreference);

    // Setting again replaces rather than duplicates.
    let replaced = models.set_preference(user, DEFAULT_MODEL_ID).await.unwrap();
    assert_eq!(replaced.id, preference.id);
    assert_eq!(replaced.ai_model_id, DEFAULT_MODEL_ID);

    assert!(models.clear_preference(user).await.unwrap());
    assert!(!models.clear_preference(user).await.unwrap());
    let resolved = models.resolve_for_user(user).await.unwrap();
    assert_eq!(resolved.source, ModelSource::SystemDefault);
}

#[tokio::test]
async fn test_inactive_preference_is_skipped() {
    let repos = setup().await;
    let models = AiModelRepository::new(repos.db.clone());
    let user = Uuid::now_v7();

    models.set_preference(user, PREMIUM_MODEL_ID).await.unwrap();
    models.deactivate(PREMIUM_MODEL_ID).await.unwrap();

    let resolved = models.resolve_for_user(user).await.unwrap();
    assert_eq!(resolved.model.id, DEFAULT_MODEL_ID);
    assert_eq!(resolved.source, ModelSource::SystemDefault);

    let err = models
        .set_preference(user, PREMIUM_MODEL_ID)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AiModelRepoError::Model(AiModelError::ModelUnavailable(_))
    ));
}

#[tokio::test]
async fn test_no_active_model_anywhere() {
    let repos = setup().await;
    let models = AiModelRepository::new(repos.db.clone());

    models.deactivate(DEFAULT_MODEL_ID).await.unwrap();
    models.deactivate(PREMIUM_MODEL_ID).await.unwrap();

    let err = models.resolve_for_user(Uuid::now_v7()).await.unwrap_err();
    assert!(matches!(err, AiModelRepoError::Model(AiModelError::NoDefaultModel)));
    assert!(models.deactivate(Uuid::now_v7()).await.unwrap().is_none());
}
