//! Student sign-in integration tests.

mod common;

use axum::http::StatusCode;
use common::{data, TestHarness, ADMIN_API_KEY};
use serde_json::{json, Value};

use examprep_store::Store;

async fn request_otp(harness: &TestHarness, contact: &str) -> Value {
    let response = harness
        .server
        .post("/v1/auth/student")
        .json(&json!({ "phone_or_email": contact }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    data(&body).clone()
}

#[tokio::test]
async fn first_contact_registers_student_with_welcome_credits() {
    let harness = TestHarness::new();

    let issued = request_otp(&harness, "Asha@Example.com").await;
    assert_eq!(issued["is_new_user"], true);
    assert_eq!(issued["otp"].as_str().unwrap().len(), 6);

    let user = harness
        .store
        .find_user_by_email("asha@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(!user.is_active);
    assert_eq!(user.credit_balance, 10);
    assert_eq!(user.full_name, "asha");

    let again = request_otp(&harness, "asha@example.com").await;
    assert_eq!(again["is_new_user"], false);
    assert_eq!(again["user_id"], issued["user_id"]);
}

#[tokio::test]
async fn welcome_credits_follow_configuration() {
    let harness = TestHarness::new();

    harness
        .server
        .put("/v1/admin/default-credits")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .json(&json!({ "credits_per_new_student": 3 }))
        .await
        .assert_status_ok();

    request_otp(&harness, "new@example.com").await;

    let user = harness
        .store
        .find_user_by_email("new@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.credit_balance, 3);
}

#[tokio::test]
async fn phone_numbers_get_the_country_code() {
    let harness = TestHarness::new();

    request_otp(&harness, "98765 43210").await;

    let user = harness
        .store
        .find_user_by_phone("+919876543210")
        .await
        .unwrap();
    assert!(user.is_some());
}

#[tokio::test]
async fn verify_activates_and_issues_tokens() {
    let harness = TestHarness::new();
    let issued = request_otp(&harness, "verify@example.com").await;
    let otp = issued["otp"].as_str().unwrap().to_string();
    let wrong = if otp == "000000" { "111111" } else { "000000" };

    harness
        .server
        .post("/v1/auth/verify")
        .json(&json!({ "phone_or_email": "verify@example.com", "otp": wrong }))
        .await
        .assert_status_bad_request();

    let response = harness
        .server
        .post("/v1/auth/verify")
        .json(&json!({ "phone_or_email": "verify@example.com", "otp": otp }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let session = data(&body);
    assert_eq!(session["token_type"], "Bearer");
    assert_eq!(session["user"]["credit_balance"], 10);
    let access = session["access_token"].as_str().unwrap().to_string();

    let user = harness
        .store
        .find_user_by_email("verify@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(user.is_active);
    assert!(user.last_login_at.is_some());

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", format!("Bearer {access}"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(data(&body)["balance"], 10);

    // A used code cannot be replayed.
    harness
        .server
        .post("/v1/auth/verify")
        .json(&json!({ "phone_or_email": "verify@example.com", "otp": otp }))
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn refresh_exchanges_refresh_tokens_only() {
    let harness = TestHarness::new();
    let issued = request_otp(&harness, "refresh@example.com").await;

    let response = harness
        .server
        .post("/v1/auth/verify")
        .json(&json!({ "phone_or_email": "refresh@example.com", "otp": issued["otp"] }))
        .await;
    let body: Value = response.json();
    let access = data(&body)["access_token"].as_str().unwrap().to_string();
    let refresh = data(&body)["refresh_token"].as_str().unwrap().to_string();

    let response = harness
        .server
        .post("/v1/auth/refresh")
        .json(&json!({ "refresh_token": refresh }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(data(&body)["access_token"].is_string());

    harness
        .server
        .post("/v1/auth/refresh")
        .json(&json!({ "refresh_token": access }))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn code_requests_are_rate_limited() {
    let harness = TestHarness::new();

    for _ in 0..3 {
        request_otp(&harness, "busy@example.com").await;
    }

    harness
        .server
        .post("/v1/auth/student")
        .json(&json!({ "phone_or_email": "busy@example.com" }))
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn malformed_contact_is_rejected() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/v1/auth/student")
        .json(&json!({ "phone_or_email": "not a contact" }))
        .await
        .assert_status_bad_request();
}
