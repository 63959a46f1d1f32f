//! Request and response types for the examprep client.

use serde::{Deserialize, Serialize};

use examprep_core::{
    CreditTransaction, GenerationStatus, JobId, PaperId, TransactionId, UserId,
};

/// Success envelope returned by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

/// Internal deduction request.
#[derive(Debug, Clone, Serialize)]
pub struct DeductRequest {
    /// Whose balance shrinks.
    pub user_id: UserId,
    /// Paper being paid for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_paper_id: Option<PaperId>,
    /// Free-form note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Result of a deduction.
#[derive(Debug, Clone, Deserialize)]
pub struct DeductionResponse {
    /// Whether the deduction was applied.
    pub success: bool,
    /// Balance after the deduction.
    pub new_balance: i64,
    /// Balance before the deduction.
    pub previous_balance: i64,
    /// Ledger row written.
    pub transaction_id: TransactionId,
    /// Whether the user just dropped to the low-credit threshold.
    pub should_notify: bool,
}

/// Balance response.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    /// The user.
    pub user_id: UserId,
    /// Credits available.
    pub balance: i64,
}

/// Pagination metadata.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    /// 1-based page.
    pub page: u32,
    /// Rows per page.
    pub limit: u32,
    /// Rows across all pages.
    pub total: u64,
    /// Number of pages.
    pub total_pages: u64,
}

/// One page of transaction history.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionPage {
    /// Transactions, newest first.
    pub transactions: Vec<CreditTransaction>,
    /// Page metadata.
    pub pagination: Pagination,
}

/// Paper generation request.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct GeneratePaperRequest<'a> {
    pub topic: &'a str,
}

/// Returned when a paper has been paid for and queued.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationTicket {
    /// Job to poll.
    pub job_id: JobId,
    /// Paper being generated.
    pub paper_id: PaperId,
    /// Balance after the deduction.
    pub new_balance: i64,
    /// Whether the user just dropped to the low-credit threshold.
    pub should_notify: bool,
}

/// Generation job status.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatus {
    /// Job ID.
    pub id: JobId,
    /// Paper being generated.
    pub paper_id: PaperId,
    /// `pending`, `done` or `failed`.
    pub status: GenerationStatus,
    /// Failed attempts so far.
    pub attempts: u32,
    /// Last failure message.
    pub error: Option<String>,
}

/// Error response from the API.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

/// Error body.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}
