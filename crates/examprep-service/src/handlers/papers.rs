//! Paper generation handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use examprep_core::{GenerationJob, JobId, PaperId};

use super::{ok, ApiResponse};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::papers::{GenerationTicket, PaperPage, PaperView};
use crate::state::AppState;

/// `POST /v1/papers` request.
#[derive(Debug, Deserialize)]
pub struct GeneratePaperRequest {
    /// What the paper should cover.
    pub topic: String,
}

/// Paper list query parameters.
#[derive(Debug, Deserialize)]
pub struct PaperListQuery {
    /// 1-based page (default 1).
    pub page: Option<i64>,
}

/// Pay for a paper and queue its generation.
pub async fn generate_paper(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<GeneratePaperRequest>,
) -> Result<(StatusCode, Json<ApiResponse<GenerationTicket>>), ApiError> {
    let ticket = state.papers.generate_paper(auth.user_id, &req.topic).await?;
    Ok((StatusCode::ACCEPTED, ok(ticket)))
}

/// List the caller's papers.
pub async fn list_papers(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<PaperListQuery>,
) -> Result<Json<ApiResponse<PaperPage>>, ApiError> {
    Ok(ok(state.papers.list_papers(auth.user_id, query.page).await?))
}

/// Get one of the caller's papers.
pub async fn get_paper(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(paper_id): Path<PaperId>,
) -> Result<Json<ApiResponse<PaperView>>, ApiError> {
    Ok(ok(state.papers.get_paper(auth.user_id, paper_id).await?))
}

/// Poll one of the caller's generation jobs.
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(job_id): Path<JobId>,
) -> Result<Json<ApiResponse<GenerationJob>>, ApiError> {
    Ok(ok(state.papers.get_job(auth.user_id, job_id).await?))
}
