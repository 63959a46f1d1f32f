//! Common test utilities for examprep integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_test::TestServer;
use serde_json::Value;

use examprep_core::{User, UserId, UserType};
use examprep_service::auth::JwtKeys;
use examprep_service::config::{OtpSettings, WorkerSettings};
use examprep_service::{create_router, AppState, ServiceConfig};
use examprep_store::{MemoryStore, Store};

pub const SERVICE_API_KEY: &str = "test-service-key";
pub const ADMIN_API_KEY: &str = "test-admin-key";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store behind the server, for setup and assertions.
    pub store: Arc<MemoryStore>,
    /// Keys matching the server's, for minting tokens.
    pub jwt: JwtKeys,
}

/// Configuration used by every harness.
pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        jwt_secret: "integration-test-secret".into(),
        service_api_key: Some(SERVICE_API_KEY.into()),
        admin_api_key: Some(ADMIN_API_KEY.into()),
        razorpay_webhook_secret: Some(WEBHOOK_SECRET.into()),
        otp: OtpSettings {
            expose_code: true,
            ..OtpSettings::default()
        },
        worker: WorkerSettings {
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            ..WorkerSettings::default()
        },
        ..ServiceConfig::default()
    }
}

impl TestHarness {
    /// Create a new test harness with an empty in-memory store.
    ///
    /// Must be called inside a Tokio runtime (the generation worker is spawned).
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a harness with a custom configuration.
    pub fn with_config(config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let jwt = JwtKeys::new(
            &config.jwt_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        );

        let state = AppState::new(store.clone(), config);
        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self { server, store, jwt }
    }

    /// Register a student with `credits` welcome credits.
    pub async fn student(&self, credits: i64) -> User {
        let email = format!("{}@example.com", UserId::generate());
        let user = User::new_student(Some(email), None, "Test Student".into());
        self.store
            .create_user(&user, credits)
            .await
            .expect("Failed to create student")
    }

    /// Register a staff member of the given role.
    pub async fn staff(&self, user_type: UserType) -> User {
        let email = format!("{}@staff.example.com", UserId::generate());
        let mut user = User::new_student(Some(email), None, "Staff".into());
        user.user_type = user_type;
        self.store
            .create_user(&user, 0)
            .await
            .expect("Failed to create staff user")
    }

    /// Authorization header carrying a valid access token for `user`.
    pub fn auth_header(&self, user: &User) -> String {
        let tokens = self.jwt.issue(user).expect("Failed to issue token");
        format!("Bearer {}", tokens.access_token)
    }
}

/// The `data` member of a success envelope.
pub fn data(body: &Value) -> &Value {
    assert_eq!(body["success"], true, "unexpected body: {body}");
    &body["data"]
}

/// The `error.code` member of an error envelope.
pub fn error_code(body: &Value) -> &str {
    assert_eq!(body["success"], false, "unexpected body: {body}");
    body["error"]["code"].as_str().unwrap_or_default()
}
