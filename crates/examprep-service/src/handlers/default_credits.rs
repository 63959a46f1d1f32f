//! Default-credit and credit-master handlers (admin only).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use examprep_core::{ConfigId, DefaultCreditConfig};

use super::{ok, ApiResponse};
use crate::auth::AdminAuth;
use crate::default_credits::{CreateCreditConfig, UpdateCreditConfig};
use crate::error::ApiError;
use crate::state::AppState;

/// Current default.
#[derive(Debug, Serialize)]
pub struct DefaultCreditsResponse {
    /// Credits granted to each new student.
    pub credits_per_new_student: i64,
}

/// `PUT /v1/admin/default-credits` request.
#[derive(Debug, Deserialize)]
pub struct UpdateDefaultCreditsRequest {
    /// New value; must not be negative.
    pub credits_per_new_student: i64,
}

/// History query parameters.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Rows to return (default 10, at most 100).
    pub limit: Option<i64>,
}

/// Get the number of credits a new student receives.
pub async fn get_default_credits(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
) -> Result<Json<ApiResponse<DefaultCreditsResponse>>, ApiError> {
    let credits_per_new_student = state.default_credits.get_default_credits().await?;
    Ok(ok(DefaultCreditsResponse {
        credits_per_new_student,
    }))
}

/// Replace the default with a new active configuration row.
pub async fn update_default_credits(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(req): Json<UpdateDefaultCreditsRequest>,
) -> Result<Json<ApiResponse<DefaultCreditConfig>>, ApiError> {
    let config = state
        .default_credits
        .update_default_credits(req.credits_per_new_student, admin.user_id)
        .await?;
    Ok(ok(config))
}

/// Most recent configuration rows.
pub async fn history(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<DefaultCreditConfig>>>, ApiError> {
    Ok(ok(state.default_credits.get_config_history(query.limit).await?))
}

/// Create a configuration row.
pub async fn create_config(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(req): Json<CreateCreditConfig>,
) -> Result<(StatusCode, Json<ApiResponse<DefaultCreditConfig>>), ApiError> {
    let config = state.default_credits.create(req, admin.user_id).await?;
    Ok((StatusCode::CREATED, ok(config)))
}

/// All configuration rows, newest first.
pub async fn list_configs(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
) -> Result<Json<ApiResponse<Vec<DefaultCreditConfig>>>, ApiError> {
    Ok(ok(state.default_credits.get_all().await?))
}

/// The active configuration row.
pub async fn active_config(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
) -> Result<Json<ApiResponse<DefaultCreditConfig>>, ApiError> {
    let config = state
        .default_credits
        .get_active()
        .await?
        .ok_or_else(|| ApiError::CreditConfigNotFound("No active credit configuration".into()))?;
    Ok(ok(config))
}

/// One configuration row.
pub async fn get_config(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(id): Path<ConfigId>,
) -> Result<Json<ApiResponse<DefaultCreditConfig>>, ApiError> {
    Ok(ok(state.default_credits.get_by_id(id).await?))
}

/// Partially update a configuration row.
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(id): Path<ConfigId>,
    Json(req): Json<UpdateCreditConfig>,
) -> Result<Json<ApiResponse<DefaultCreditConfig>>, ApiError> {
    Ok(ok(state.default_credits.update(id, req, admin.user_id).await?))
}

/// Delete a configuration row.
pub async fn delete_config(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(id): Path<ConfigId>,
) -> Result<StatusCode, ApiError> {
    state.default_credits.delete(id).await?;
    tracing::info!(admin_id = %admin.admin_id, config_id = %id, "Credit configuration removed");
    Ok(StatusCode::NO_CONTENT)
}
