//! Admin views over users and their ledgers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use examprep_core::{LedgerIntegrity, User, UserId};

use super::{ok, ApiResponse};
use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::pagination::{PageRequest, Pagination};
use crate::state::AppState;

/// Default page size for the user list.
const DEFAULT_USER_LIMIT: u32 = 20;

/// User list query parameters.
#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    /// 1-based page (default 1).
    pub page: Option<i64>,
    /// Page size (default 20, at most 100).
    pub limit: Option<i64>,
}

/// One page of users.
#[derive(Debug, Serialize)]
pub struct UserPage {
    /// Users, newest first.
    pub users: Vec<User>,
    /// Page metadata.
    pub pagination: Pagination,
}

/// List users with their balances.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Query(query): Query<UserListQuery>,
) -> Result<Json<ApiResponse<UserPage>>, ApiError> {
    let request = PageRequest::new(query.page, query.limit, DEFAULT_USER_LIMIT)?;
    let users = state
        .store
        .list_users(request.limit(), request.offset())
        .await?;
    let total = state.store.count_users().await?;

    Ok(ok(UserPage {
        users,
        pagination: request.paginate(total),
    }))
}

/// Reconcile any user's balance against their transaction log.
pub async fn user_integrity(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(user_id): Path<UserId>,
) -> Result<Json<ApiResponse<LedgerIntegrity>>, ApiError> {
    tracing::info!(admin_id = %admin.admin_id, user_id = %user_id, "Admin integrity check");
    Ok(ok(state.credits.verify_ledger_integrity(user_id).await?))
}
