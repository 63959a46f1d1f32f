//! Error types for examprep storage.

use examprep_core::CreditError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// Insufficient credits for deduction.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required credits.
        required: i64,
    },

    /// Amount is not a positive integer or would overflow.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Input rejected before touching the database.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A ledger entry with the same idempotency key already exists.
    #[error("duplicate {kind}: {key}")]
    DuplicateEntry {
        /// What was duplicated (`deduction`, `refund`, `payment`).
        kind: &'static str,
        /// The idempotency key.
        key: String,
    },

    /// A uniqueness or state constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Build a [`StoreError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<CreditError> for StoreError {
    fn from(err: CreditError) -> Self {
        match err {
            CreditError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            CreditError::InvalidAmount(msg) => Self::InvalidAmount(msg),
            CreditError::AccountMismatch { .. }
            | CreditError::InvalidId(_)
            | CreditError::InvalidConfig(_) => Self::InvalidInput(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Self::InvalidInput(db.message().to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::Serialization(err.to_string())
            }
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_errors_map_to_store_errors() {
        let err: StoreError = CreditError::InsufficientCredits {
            balance: 0,
            required: 1,
        }
        .into();
        assert!(matches!(
            err,
            StoreError::InsufficientCredits {
                balance: 0,
                required: 1
            }
        ));

        let err: StoreError = CreditError::InvalidConfig("negative".into()).into();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn not_found_message() {
        let err = StoreError::not_found("paper", "abc");
        assert_eq!(err.to_string(), "paper not found: abc");
    }
}
