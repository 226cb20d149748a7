//! HTTP-level tests driving the full router with `tower::ServiceExt::oneshot`
//! against an in-memory SQLite database.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use rstest::rstest;
use sea_orm_migration::MigratorTrait;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use studyhub_api::{AppState, create_router};
use studyhub_db::migration::Migrator;
use studyhub_shared::SubscriptionConfig;
use studyhub_shared::config::DatabaseConfig;

// ─── Helpers ─────────────────────────────────────────────────────

async fn build_app() -> Router {
    let db = studyhub_db::connect(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        auto_migrate: false,
    })
    .await
    .expect("Failed to open in-memory SQLite");
    Migrator::up(&db, None).await.expect("Failed to run migrations");

    create_router(AppState::new(db, &SubscriptionConfig::default()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn tier_id(app: &Router, name: &str) -> String {
    let (status, tiers) = send(app, "GET", "/api/v1/tiers", None).await;
    assert_eq!(status, StatusCode::OK);
    tiers
        .as_array()
        .unwrap()
        .iter()
        .find(|tier| tier["name"] == name)
        .and_then(|tier| tier["id"].as_str())
        .unwrap_or_else(|| panic!("tier {name} not listed"))
        .to_string()
}

async fn buy(app: &Router, user: Uuid, tier: &str) -> Value {
    let tier_id = tier_id(app, tier).await;
    let (status, payment) = send(
        app,
        "POST",
        "/api/v1/payments",
        Some(json!({
            "user_id": user,
            "tier_id": tier_id,
            "billing_cycle": "monthly",
            "payment_provider": "stripe"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/v1/payments/{}/complete", payment["id"].as_str().unwrap());
    let (status, completion) = send(app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK, "{completion}");
    completion
}

// ─── Tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_health() {
    let app = build_app().await;
    let (status, body) = send(&app, "GET", "/api/v1/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn test_tiers_are_listed_in_order() {
    let app = build_app().await;
    let (status, tiers) = send(&app, "GET", "/api/v1/tiers", None).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = tiers
        .as_array()
        .unwrap()
        .iter()
        .map(|tier| tier["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["free", "basic", "pro", "premium"]);
}

#[tokio::test]
async fn test_referral_award_through_api() {
    let app = build_app().await;
    let referrer = Uuid::now_v7();
    let referred = Uuid::now_v7();

    let (status, referral) = send(
        &app,
        "POST",
        "/api/v1/referrals",
        Some(json!({ "referrer_id": referrer, "referred_id": referred })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(referral["status"], "pending");

    let completion = buy(&app, referred, "pro").await;
    assert_eq!(completion["already_completed"], false);
    assert_eq!(completion["activation"]["status"], "activated");
    assert_eq!(completion["activation"]["token_limit_override"], Value::Null);
    assert_eq!(completion["award"]["outcome"], "success");
    assert_eq!(completion["award"]["reason"], "awarded");
    assert_eq!(completion["award"]["points"], 250);

    let uri = format!("/api/v1/users/{referrer}/referral-points");
    let (status, points) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(points["points_balance"], 250);
    assert_eq!(points["successful_referrals"], 1);
    assert_eq!(points["pending_referrals"], 0);

    let uri = format!("/api/v1/users/{referrer}/referral-points/transactions?page=1&per_page=10");
    let (status, history) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["meta"]["total"], 1);
    assert_eq!(history["data"][0]["points"], 250);

    // Completing again is a no-op.
    let uri = format!(
        "/api/v1/payments/{}/complete",
        completion["payment"]["id"].as_str().unwrap()
    );
    let (status, again) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["already_completed"], true);
    assert_eq!(again["award"], Value::Null);
}

#[tokio::test]
async fn test_entitlement_and_usage() {
    let app = build_app().await;
    let user = Uuid::now_v7();

    let uri = format!("/api/v1/users/{user}/entitlement");
    let (status, snapshot) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["active"], false);
    assert_eq!(snapshot["tokens_remaining"], 0);

    buy(&app, user, "free").await;

    let uri = format!("/api/v1/users/{user}/usage/tokens");
    let (status, usage) = send(&app, "POST", &uri, Some(json!({ "tokens": 4000 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(usage["tokens_used"], 4000);
    assert_eq!(usage["tokens_remaining"], 6000);

    let uri = format!("/api/v1/users/{user}/usage/tokens/check?tokens=7000");
    let (status, check) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["allowed"], false);

    let uri = format!("/api/v1/users/{user}/usage/papers");
    let paper = json!({ "paper_id": Uuid::now_v7() });
    let (_, first) = send(&app, "POST", &uri, Some(paper.clone())).await;
    let (_, second) = send(&app, "POST", &uri, Some(paper)).await;
    assert_eq!(first["first_access"], true);
    assert_eq!(second["first_access"], false);
    assert_eq!(second["papers_accessed"], 1);
}

#[tokio::test]
async fn test_selection_rejection_is_structured() {
    let app = build_app().await;
    let user = Uuid::now_v7();
    buy(&app, user, "free").await;

    let uri = format!("/api/v1/users/{user}/selection");
    let (status, result) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({ "subject_ids": [Uuid::now_v7()] })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["success"], false);
    assert!(result["message"].as_str().unwrap().contains("does not allow"));
}

#[tokio::test]
async fn test_cancel_and_reactivate() {
    let app = build_app().await;
    let user = Uuid::now_v7();
    buy(&app, user, "basic").await;

    let uri = format!("/api/v1/users/{user}/usage/tokens");
    let (status, _) = send(&app, "POST", &uri, Some(json!({ "tokens": 100_000 }))).await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/api/v1/users/{user}/subscription/cancel");
    let (status, sub) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sub["status"], "cancelled");

    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    let uri = format!("/api/v1/users/{user}/subscription/reactivate");
    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subscription"]["status"], "active");
    assert_eq!(body["subscription"]["tokens_used_current_period"], 100_000);
    assert_eq!(body["award"]["reason"], "no_pending_referral");

    // Reactivating does not refill an exhausted budget.
    let uri = format!("/api/v1/users/{user}/usage/tokens/check?tokens=1");
    let (_, check) = send(&app, "GET", &uri, None).await;
    assert_eq!(check["allowed"], false);
}

#[tokio::test]
async fn test_checkout_selection_rejected() {
    let app = build_app().await;
    let tier_id = tier_id(&app, "free").await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/payments",
        Some(json!({
            "user_id": Uuid::now_v7(),
            "tier_id": tier_id,
            "billing_cycle": "monthly",
            "selected_subject_ids": [Uuid::now_v7()]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert!(body["message"].as_str().unwrap().contains("does not allow"));
}

#[tokio::test]
async fn test_ai_model_cascade() {
    let app = build_app().await;
    let user = Uuid::now_v7();
    let uri = format!("/api/v1/users/{user}/ai-model");

    let (status, resolved) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["source"], "system_default");
    assert_eq!(resolved["model"]["model_name"], "gpt-4o-mini");

    buy(&app, user, "premium").await;
    let (_, resolved) = send(&app, "GET", &uri, None).await;
    assert_eq!(resolved["source"], "tier_default");

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({ "ai_model_id": Uuid::now_v7() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[rstest]
#[case::self_referral("POST", "/api/v1/referrals", Some("self"), StatusCode::BAD_REQUEST, "VALIDATION_ERROR")]
#[case::unknown_payment("POST", "/api/v1/payments/{random}/complete", None, StatusCode::NOT_FOUND, "NOT_FOUND")]
#[case::usage_without_subscription(
    "POST",
    "/api/v1/users/{random}/usage/tokens",
    Some("tokens"),
    StatusCode::NOT_FOUND,
    "NOT_FOUND"
)]
#[case::redeem_without_points(
    "POST",
    "/api/v1/users/{random}/referral-points/redeem",
    Some("redeem"),
    StatusCode::UNPROCESSABLE_ENTITY,
    "BUSINESS_RULE_VIOLATION"
)]
#[tokio::test]
async fn test_error_responses(
    #[case] method: &str,
    #[case] uri: &str,
    #[case] body: Option<&str>,
    #[case] expected_status: StatusCode,
    #[case] expected_code: &str,
) {
    let app = build_app().await;
    let random = Uuid::now_v7();
    let uri = uri.replace("{random}", &random.to_string());

    let body = match body {
        Some("self") => Some(json!({ "referrer_id": random, "referred_id": random })),
        Some("tokens") => Some(json!({ "tokens": 10 })),
        Some("redeem") => Some(json!({
            "tier_id": tier_id(&app, "basic").await,
            "billing_cycle": "monthly"
        })),
        _ => None,
    };

    let (status, response) = send(&app, method, &uri, body).await;
    assert_eq!(status, expected_status, "{response}");
    assert_eq!(response["error"], expected_code);
    assert!(response["message"].is_string());
}

#[tokio::test]
async fn test_failing_a_payment_twice_conflicts() {
    let app = build_app().await;
    let tier_id = tier_id(&app, "basic").await;
    let (_, payment) = send(
        &app,
        "POST",
        "/api/v1/payments",
        Some(json!({
            "user_id": Uuid::now_v7(),
            "tier_id": tier_id,
            "billing_cycle": "yearly"
        })),
    )
    .await;
    let uri = format!("/api/v1/payments/{}/fail", payment["id"].as_str().unwrap());

    let (status, failed) = send(&app, "POST", &uri, Some(json!({ "reason": "declined" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(failed["status"], "failed");
    assert_eq!(failed["failure_reason"], "declined");

    let (status, body) = send(&app, "POST", &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");
}
