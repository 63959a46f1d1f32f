//! API handlers.

use axum::Json;
use serde::Serialize;

pub mod auth;
pub mod credits;
pub mod default_credits;
pub mod health;
pub mod papers;
pub mod users;
pub mod webhooks;

/// Success envelope: `{ "success": true, "data": ... }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always `true`; failures go through [`crate::ApiError`].
    pub success: bool,
    /// Payload.
    pub data: T,
}

/// Wrap `data` in the success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}
