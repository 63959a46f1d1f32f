//! Paper generation integration tests.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{data, error_code, TestHarness};
use serde_json::{json, Value};

use examprep_core::User;

async fn wait_for_job(harness: &TestHarness, user: &User, job_id: &str) -> Value {
    for _ in 0..500 {
        let response = harness
            .server
            .get(&format!("/v1/papers/jobs/{job_id}"))
            .add_header("authorization", harness.auth_header(user))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        let job = data(&body).clone();
        if job["status"] != "pending" {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {job_id} never finished");
}

#[tokio::test]
async fn generate_paper_is_accepted_and_completes() {
    let harness = TestHarness::new();
    let user = harness.student(3).await;

    let response = harness
        .server
        .post("/v1/papers")
        .add_header("authorization", harness.auth_header(&user))
        .json(&json!({ "topic": "Organic Chemistry" }))
        .await;

    response.assert_status(StatusCode::ACCEPTED);
    let body: Value = response.json();
    let ticket = data(&body);
    assert_eq!(ticket["new_balance"], 2);
    assert_eq!(ticket["should_notify"], false);

    let job_id = ticket["job_id"].as_str().unwrap().to_string();
    let paper_id = ticket["paper_id"].as_str().unwrap().to_string();

    let job = wait_for_job(&harness, &user, &job_id).await;
    assert_eq!(job["status"], "done");

    let response = harness
        .server
        .get(&format!("/v1/papers/{paper_id}"))
        .add_header("authorization", harness.auth_header(&user))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let paper = data(&body);
    assert_eq!(paper["topic"], "Organic Chemistry");
    assert_eq!(paper["status"], "done");
    let questions = paper["questions"].as_array().unwrap();
    assert!(!questions.is_empty());
    assert!(questions[0].get("correct_answer").is_none());
}

#[tokio::test]
async fn generate_paper_without_credits_is_payment_required() {
    let harness = TestHarness::new();
    let user = harness.student(0).await;

    let response = harness
        .server
        .post("/v1/papers")
        .add_header("authorization", harness.auth_header(&user))
        .json(&json!({ "topic": "Optics" }))
        .await;

    response.assert_status(StatusCode::PAYMENT_REQUIRED);
    let body: Value = response.json();
    assert_eq!(error_code(&body), "INSUFFICIENT_CREDITS");

    let response = harness
        .server
        .get("/v1/papers")
        .add_header("authorization", harness.auth_header(&user))
        .await;
    let body: Value = response.json();
    assert_eq!(data(&body)["pagination"]["total"], 0);
}

#[tokio::test]
async fn generate_paper_requires_topic() {
    let harness = TestHarness::new();
    let user = harness.student(1).await;

    let response = harness
        .server
        .post("/v1/papers")
        .add_header("authorization", harness.auth_header(&user))
        .json(&json!({ "topic": "  " }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn generate_paper_reports_low_balance() {
    let harness = TestHarness::new();
    let user = harness.student(6).await;

    let response = harness
        .server
        .post("/v1/papers")
        .add_header("authorization", harness.auth_header(&user))
        .json(&json!({ "topic": "Optics" }))
        .await;

    let body: Value = response.json();
    assert_eq!(data(&body)["new_balance"], 5);
    assert_eq!(data(&body)["should_notify"], true);
}

#[tokio::test]
async fn papers_are_listed_newest_first() {
    let harness = TestHarness::new();
    let user = harness.student(5).await;

    for topic in ["First", "Second"] {
        harness
            .server
            .post("/v1/papers")
            .add_header("authorization", harness.auth_header(&user))
            .json(&json!({ "topic": topic }))
            .await
            .assert_status(StatusCode::ACCEPTED);
    }

    let response = harness
        .server
        .get("/v1/papers?page=1")
        .add_header("authorization", harness.auth_header(&user))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let page = data(&body);
    assert_eq!(page["papers"][0]["topic"], "Second");
    assert_eq!(page["papers"][1]["topic"], "First");
    assert_eq!(page["pagination"]["limit"], 10);
}

#[tokio::test]
async fn other_students_cannot_see_a_paper() {
    let harness = TestHarness::new();
    let owner = harness.student(1).await;
    let stranger = harness.student(1).await;

    let response = harness
        .server
        .post("/v1/papers")
        .add_header("authorization", harness.auth_header(&owner))
        .json(&json!({ "topic": "Optics" }))
        .await;
    let body: Value = response.json();
    let paper_id = data(&body)["paper_id"].as_str().unwrap().to_string();
    let job_id = data(&body)["job_id"].as_str().unwrap().to_string();

    harness
        .server
        .get(&format!("/v1/papers/{paper_id}"))
        .add_header("authorization", harness.auth_header(&stranger))
        .await
        .assert_status_not_found();

    harness
        .server
        .get(&format!("/v1/papers/jobs/{job_id}"))
        .add_header("authorization", harness.auth_header(&stranger))
        .await
        .assert_status_not_found();
}
