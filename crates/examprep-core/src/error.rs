//! Error types for examprep ledger operations.

use crate::ids::IdError;

/// Result type for core ledger operations.
pub type Result<T> = std::result::Result<T, CreditError>;

/// Errors that can occur while computing a ledger move.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CreditError {
    /// Insufficient credits for a deduction.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Credits the deduction needs.
        required: i64,
    },

    /// Amount is zero, negative or would overflow the balance.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The entry belongs to a different user than the account it was applied to.
    #[error("ledger entry for {entry} applied to account {account}")]
    AccountMismatch {
        /// User on the entry.
        entry: String,
        /// User on the account.
        account: String,
    },

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Invalid default credit configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
