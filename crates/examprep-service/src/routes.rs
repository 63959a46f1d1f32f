//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, credits, default_credits, health, papers, users, webhooks};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /v1/auth/student` - Request a sign-in code
/// - `POST /v1/auth/verify` - Verify the code, receive tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token
///
/// ## Credits (Bearer auth)
/// - `GET /v1/credits/balance` - Current balance
/// - `GET /v1/credits/transactions` - Paginated history
/// - `GET /v1/credits/verify-integrity` - Reconcile balance with the log
///
/// ## Papers (Bearer auth)
/// - `POST /v1/papers` - Pay for and queue a paper (202)
/// - `GET /v1/papers` - List papers
/// - `GET /v1/papers/:id` - Get a paper
/// - `GET /v1/papers/jobs/:id` - Poll a generation job
///
/// ## Internal (Service API Key auth)
/// - `POST /v1/credits/deduct` - Deduct one credit
///
/// ## Admin (Admin key or staff token)
/// - `POST /v1/credits/add` - Add credits
/// - `GET /v1/admin/users`, `GET /v1/admin/users/:id/integrity`
/// - `GET|PUT /v1/admin/default-credits`, `GET /v1/admin/default-credits/history`
/// - `/v1/admin/credit-master` CRUD
///
/// ## Webhooks (Signature verification)
/// - `POST /webhooks/razorpay` - Razorpay payment events
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;
    let max_concurrent_requests = state.config.max_concurrent_requests;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let admin_routes = Router::new()
        .route("/users", get(users::list_users))
        .route("/users/:id/integrity", get(users::user_integrity))
        .route(
            "/default-credits",
            get(default_credits::get_default_credits).put(default_credits::update_default_credits),
        )
        .route("/default-credits/history", get(default_credits::history))
        .route(
            "/credit-master",
            post(default_credits::create_config).get(default_credits::list_configs),
        )
        .route("/credit-master/active", get(default_credits::active_config))
        .route(
            "/credit-master/:id",
            get(default_credits::get_config)
                .patch(default_credits::update_config)
                .delete(default_credits::delete_config),
        );

    let api_routes = Router::new()
        // Auth
        .route("/auth/student", post(auth::request_otp))
        .route("/auth/verify", post(auth::verify_otp))
        .route("/auth/refresh", post(auth::refresh))
        // Credits
        .route("/credits/balance", get(credits::get_balance))
        .route("/credits/transactions", get(credits::list_transactions))
        .route("/credits/verify-integrity", get(credits::verify_integrity))
        .route("/credits/add", post(credits::admin_add_credits))
        .route("/credits/deduct", post(credits::deduct_credit))
        // Papers
        .route("/papers", post(papers::generate_paper).get(papers::list_papers))
        .route("/papers/:id", get(papers::get_paper))
        .route("/papers/jobs/:id", get(papers::get_job))
        // Admin
        .nest("/admin", admin_routes)
        .layer(ConcurrencyLimitLayer::new(max_concurrent_requests));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        // Webhooks (no rate limit - controlled by the payment gateway)
        .route("/webhooks/razorpay", post(webhooks::razorpay_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
