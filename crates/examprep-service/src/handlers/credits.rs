//! Credit balance, history and ledger handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use examprep_core::{LedgerIntegrity, PaperId, UserId};

use super::{ok, ApiResponse};
use crate::auth::{AdminAuth, AuthUser, ServiceAuth};
use crate::credits::{AddCredits, Balance, CreditOutcome, DeductionOutcome, TransactionPage};
use crate::error::ApiError;
use crate::state::AppState;

/// Transaction history query parameters.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// 1-based page (default 1).
    pub page: Option<i64>,
    /// Page size (default 20, at most 100).
    pub limit: Option<i64>,
}

/// Get current credit balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Balance>>, ApiError> {
    Ok(ok(state.credits.get_balance(auth.user_id).await?))
}

/// List transaction history, newest first.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<TransactionPage>>, ApiError> {
    let page = state
        .credits
        .get_transaction_history(auth.user_id, query.page, query.limit)
        .await?;
    Ok(ok(page))
}

/// Reconcile the caller's balance against their transaction log.
pub async fn verify_integrity(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<LedgerIntegrity>>, ApiError> {
    Ok(ok(state.credits.verify_ledger_integrity(auth.user_id).await?))
}

/// Add credits to a user (admin only).
pub async fn admin_add_credits(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(req): Json<AddCredits>,
) -> Result<Json<ApiResponse<CreditOutcome>>, ApiError> {
    tracing::info!(
        admin_id = %admin.admin_id,
        user_id = %req.user_id,
        amount = req.amount,
        transaction_type = %req.transaction_type,
        "Admin adding credits"
    );
    Ok(ok(state.credits.add_credits(req).await?))
}

/// Internal deduction request.
#[derive(Debug, Deserialize)]
pub struct DeductRequest {
    /// Whose balance shrinks.
    pub user_id: UserId,
    /// Paper being paid for; a paper is only ever charged once.
    #[serde(default)]
    pub related_paper_id: Option<PaperId>,
    /// Free-form note.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Deduct one credit on a user's behalf (service-to-service).
pub async fn deduct_credit(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    Json(req): Json<DeductRequest>,
) -> Result<Json<ApiResponse<DeductionOutcome>>, ApiError> {
    tracing::debug!(
        service = %service.service_name,
        user_id = %req.user_id,
        "Service deducting credit"
    );
    let outcome = state
        .credits
        .deduct_credit(req.user_id, req.related_paper_id, req.notes)
        .await?;
    Ok(ok(outcome))
}
