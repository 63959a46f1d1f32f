//! Credit balance, history and ledger integration tests.

mod common;

use common::{data, error_code, TestHarness, ADMIN_API_KEY, SERVICE_API_KEY};
use serde_json::{json, Value};

use axum::http::StatusCode;
use examprep_core::{PaperId, UserId};
use examprep_store::Store;

// ============================================================================
// Balance
// ============================================================================

#[tokio::test]
async fn get_balance_success() {
    let harness = TestHarness::new();
    let user = harness.student(10).await;

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.auth_header(&user))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(data(&body)["balance"], 10);
    assert_eq!(data(&body)["user_id"], user.id.to_string());
}

#[tokio::test]
async fn get_balance_without_auth_fails() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/credits/balance").await;

    response.assert_status_unauthorized();
    let body: Value = response.json();
    assert_eq!(error_code(&body), "UNAUTHORIZED");
}

#[tokio::test]
async fn get_balance_with_garbage_token_fails() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", "Bearer not-a-jwt")
        .await;

    response.assert_status_unauthorized();
}

// ============================================================================
// Transactions
// ============================================================================

#[tokio::test]
async fn welcome_credits_appear_in_history() {
    let harness = TestHarness::new();
    let user = harness.student(10).await;

    let response = harness
        .server
        .get("/v1/credits/transactions")
        .add_header("authorization", harness.auth_header(&user))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let transactions = data(&body)["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["transaction_type"], "bonus");
    assert_eq!(transactions[0]["credits_change"], 10);
    assert_eq!(data(&body)["pagination"]["total"], 1);
}

#[tokio::test]
async fn list_transactions_with_pagination() {
    let harness = TestHarness::new();
    let user = harness.student(10).await;

    for _ in 0..3 {
        harness
            .server
            .post("/v1/credits/deduct")
            .add_header("x-api-key", SERVICE_API_KEY)
            .json(&json!({ "user_id": user.id }))
            .await
            .assert_status_ok();
    }

    let response = harness
        .server
        .get("/v1/credits/transactions?page=2&limit=3")
        .add_header("authorization", harness.auth_header(&user))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let page = data(&body);
    assert_eq!(page["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(page["transactions"][0]["transaction_type"], "bonus");
    assert_eq!(page["pagination"]["page"], 2);
    assert_eq!(page["pagination"]["total"], 4);
    assert_eq!(page["pagination"]["total_pages"], 2);
}

#[tokio::test]
async fn list_transactions_rejects_bad_paging() {
    let harness = TestHarness::new();
    let user = harness.student(1).await;

    for (query, code) in [
        ("page=0", "INVALID_PAGE"),
        ("page=-1", "INVALID_PAGE"),
        ("limit=0", "INVALID_LIMIT"),
        ("limit=101", "INVALID_LIMIT"),
    ] {
        let response = harness
            .server
            .get(&format!("/v1/credits/transactions?{query}"))
            .add_header("authorization", harness.auth_header(&user))
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(error_code(&body), code, "query {query}");
    }
}

// ============================================================================
// Deduction (service)
// ============================================================================

#[tokio::test]
async fn deduct_requires_service_key() {
    let harness = TestHarness::new();
    let user = harness.student(5).await;

    harness
        .server
        .post("/v1/credits/deduct")
        .json(&json!({ "user_id": user.id }))
        .await
        .assert_status_unauthorized();

    harness
        .server
        .post("/v1/credits/deduct")
        .add_header("x-api-key", "wrong-key")
        .json(&json!({ "user_id": user.id }))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn deduct_reports_threshold_crossing() {
    let harness = TestHarness::new();
    let user = harness.student(6).await;

    let response = harness
        .server
        .post("/v1/credits/deduct")
        .add_header("x-api-key", SERVICE_API_KEY)
        .json(&json!({ "user_id": user.id, "notes": "manual" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let outcome = data(&body);
    assert_eq!(outcome["previous_balance"], 6);
    assert_eq!(outcome["new_balance"], 5);
    assert_eq!(outcome["should_notify"], true);
}

#[tokio::test]
async fn deduct_without_credits_is_payment_required() {
    let harness = TestHarness::new();
    let user = harness.student(0).await;

    let response = harness
        .server
        .post("/v1/credits/deduct")
        .add_header("x-api-key", SERVICE_API_KEY)
        .json(&json!({ "user_id": user.id }))
        .await;

    response.assert_status(StatusCode::PAYMENT_REQUIRED);
    let body: Value = response.json();
    assert_eq!(error_code(&body), "INSUFFICIENT_CREDITS");
    assert_eq!(body["error"]["details"]["balance"], 0);
    assert_eq!(body["error"]["details"]["required"], 1);
}

#[tokio::test]
async fn deduct_twice_for_same_paper_conflicts() {
    let harness = TestHarness::new();
    let user = harness.student(5).await;
    let paper_id = PaperId::generate();
    let request = json!({ "user_id": user.id, "related_paper_id": paper_id });

    harness
        .server
        .post("/v1/credits/deduct")
        .add_header("x-api-key", SERVICE_API_KEY)
        .json(&request)
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/v1/credits/deduct")
        .add_header("x-api-key", SERVICE_API_KEY)
        .json(&request)
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(error_code(&body), "DUPLICATE_EVENT");
}

#[tokio::test]
async fn deduct_for_unknown_user_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/credits/deduct")
        .add_header("x-api-key", SERVICE_API_KEY)
        .json(&json!({ "user_id": UserId::generate() }))
        .await;

    response.assert_status_not_found();
}

// ============================================================================
// Admin top-up
// ============================================================================

#[tokio::test]
async fn admin_add_credits_with_key() {
    let harness = TestHarness::new();
    let user = harness.student(0).await;

    let response = harness
        .server
        .post("/v1/credits/add")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .json(&json!({
            "user_id": user.id,
            "amount": 25,
            "transaction_type": "purchase",
            "payment": { "amount_paise": 50000, "status": "captured" }
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(data(&body)["new_balance"], 25);

    let stored = harness.store.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.total_credits_purchased, 25);
}

#[tokio::test]
async fn admin_add_credits_rejects_non_positive_amount() {
    let harness = TestHarness::new();
    let user = harness.student(0).await;

    let response = harness
        .server
        .post("/v1/credits/add")
        .add_header("x-admin-key", ADMIN_API_KEY)
        .json(&json!({ "user_id": user.id, "amount": 0, "transaction_type": "bonus" }))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(error_code(&body), "INVALID_AMOUNT");
}

#[tokio::test]
async fn students_cannot_add_credits() {
    let harness = TestHarness::new();
    let user = harness.student(0).await;

    let response = harness
        .server
        .post("/v1/credits/add")
        .add_header("authorization", harness.auth_header(&user))
        .json(&json!({ "user_id": user.id, "amount": 100, "transaction_type": "bonus" }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

// ============================================================================
// Integrity
// ============================================================================

#[tokio::test]
async fn integrity_holds_after_activity() {
    let harness = TestHarness::new();
    let user = harness.student(10).await;

    harness
        .server
        .post("/v1/credits/deduct")
        .add_header("x-api-key", SERVICE_API_KEY)
        .json(&json!({ "user_id": user.id }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/v1/credits/verify-integrity")
        .add_header("authorization", harness.auth_header(&user))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let integrity = data(&body);
    assert_eq!(integrity["is_valid"], true);
    assert_eq!(integrity["current_balance"], 9);
    assert_eq!(integrity["calculated_balance"], 9);
    assert_eq!(integrity["difference"], 0);
}
