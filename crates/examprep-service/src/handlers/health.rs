//! Health check handlers.

use axum::Json;
use serde::Serialize;

use super::{ok, ApiResponse};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
}

/// Health check endpoint.
pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse {
        status: "ok".to_string(),
        service: "examprep".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
