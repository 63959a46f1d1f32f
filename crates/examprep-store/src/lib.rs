//! Storage layer for examprep.
//!
//! This crate persists users, the credit ledger, generated papers and the
//! default-credit configuration behind the [`Store`] trait.
//!
//! # Backends
//!
//! - [`PgStore`]: PostgreSQL via `sqlx`. Balance changes lock the user row
//!   with `SELECT ... FOR UPDATE`; partial unique indexes back the ledger's
//!   idempotency keys and the single active configuration.
//! - [`MemoryStore`]: everything behind one async mutex. Used by tests and
//!   local development.
//! - `RocksStore` (feature `rocksdb-backend`): column families with CBOR
//!   values and `WriteBatch` for atomic compound writes.
//!
//! # Ledger discipline
//!
//! Every backend applies a balance change the same way: lock the user, load
//! the [`CreditAccount`](examprep_core::CreditAccount), run
//! [`LedgerEntry::apply`], then persist the account and the new transaction
//! in one atomic unit. The sum of a user's `credits_change` therefore always
//! equals the stored balance, which [`Store::ledger_totals`] lets callers
//! verify.
//!
//! # Example
//!
//! ```no_run
//! use examprep_core::{LedgerEntry, TransactionType, User};
//! use examprep_store::{MemoryStore, Store};
//!
//! # async fn demo() -> examprep_store::Result<()> {
//! let store = MemoryStore::new();
//! let user = User::new_student(Some("asha@example.com".into()), None, "Asha".into());
//! let user = store.create_user(&user, 10).await?;
//!
//! let entry = LedgerEntry::credit(user.id, TransactionType::Purchase, 50);
//! let receipt = store.apply_ledger_entry(&entry).await?;
//! assert_eq!(receipt.new_balance, 60);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod idempotency;
pub mod memory;
pub mod postgres;

#[cfg(feature = "rocksdb-backend")]
pub mod keys;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

pub use error::{Result, StoreError};
pub use idempotency::LedgerKey;
pub use memory::MemoryStore;
pub use postgres::PgStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use async_trait::async_trait;
use examprep_core::{
    ConfigId, CreditTransaction, DefaultCreditConfig, DefaultCreditConfigPatch, GenerationJob,
    JobId, LedgerEntry, LedgerReceipt, Paper, PaperId, PaperQuestion, User, UserId,
};

/// Note attached to the bonus transaction granted at sign-up.
pub const WELCOME_CREDITS_NOTE: &str = "Welcome credits";

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (PostgreSQL, `RocksDB`, in-memory for testing).
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // User Operations
    // =========================================================================

    /// Insert a new user.
    ///
    /// The user is stored with a zero balance. When `initial_credits > 0` a
    /// `bonus` transaction for that amount is written in the same atomic unit.
    /// Returns the stored user including the granted balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::Conflict` if the email or phone is already registered.
    /// - `StoreError::InvalidAmount` if `initial_credits` is negative.
    async fn create_user(&self, user: &User, initial_credits: i64) -> Result<User>;

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>>;

    /// Find a user by email address.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Find a user by normalised phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>>;

    /// List users, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_users(&self, limit: usize, offset: usize) -> Result<Vec<User>>;

    /// Count all users.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn count_users(&self) -> Result<u64>;

    /// Update profile fields: name, activation and last login.
    ///
    /// Balance fields on `user` are ignored; they only move through the ledger.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn update_user_profile(&self, user: &User) -> Result<()>;

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    /// Apply a ledger entry: lock the user, check funds, update the balance
    /// and append the transaction atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the user doesn't exist.
    /// - `StoreError::InsufficientCredits` if a deduction exceeds the balance.
    /// - `StoreError::InvalidAmount` if the amount is not positive.
    /// - `StoreError::DuplicateEntry` if the entry's idempotency key was used.
    async fn apply_ledger_entry(&self, entry: &LedgerEntry) -> Result<LedgerReceipt>;

    /// Current balance. Unknown users have a balance of zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_balance(&self, user_id: &UserId) -> Result<i64>;

    /// List transactions for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>>;

    /// Count transactions for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn count_transactions(&self, user_id: &UserId) -> Result<u64>;

    /// Find the transaction that credited a gateway payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_transaction_by_payment_id(
        &self,
        razorpay_payment_id: &str,
    ) -> Result<Option<CreditTransaction>>;

    /// Stored balance and the sum of all `credits_change` for a user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn ledger_totals(&self, user_id: &UserId) -> Result<(i64, i64)>;

    // =========================================================================
    // Paper Generation (Compound Operations)
    // =========================================================================

    /// Deduct the credit for a paper and create the pending paper and job,
    /// all in one atomic unit.
    ///
    /// # Errors
    ///
    /// - `StoreError::InsufficientCredits` if the balance is too low. Nothing is written.
    /// - `StoreError::DuplicateEntry` if the paper was already paid for.
    /// - `StoreError::NotFound` if the user doesn't exist.
    async fn begin_generation(
        &self,
        entry: &LedgerEntry,
        paper: &Paper,
        job: &GenerationJob,
    ) -> Result<LedgerReceipt>;

    /// Store the generated questions and mark paper and job done.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the job doesn't exist.
    /// - `StoreError::Conflict` if the job already finished.
    async fn complete_generation(&self, job_id: &JobId, questions: &[PaperQuestion])
        -> Result<()>;

    /// Record a failed attempt. Returns the attempt count after the increment.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the job doesn't exist.
    async fn record_job_attempt(&self, job_id: &JobId, error: &str) -> Result<u32>;

    /// Refund the paper and mark paper and job failed, all in one atomic unit.
    ///
    /// Returns `None` when the paper had already been refunded: the job and
    /// paper are still marked failed, but no second refund is written.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the job doesn't exist.
    /// - `StoreError::Conflict` if the job already finished.
    async fn fail_generation(
        &self,
        job_id: &JobId,
        error: &str,
        refund: &LedgerEntry,
    ) -> Result<Option<LedgerReceipt>>;

    /// Get a paper by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_paper(&self, paper_id: &PaperId) -> Result<Option<Paper>>;

    /// List a user's papers, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_papers(&self, user_id: &UserId, limit: usize, offset: usize)
        -> Result<Vec<Paper>>;

    /// Count a user's papers.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn count_papers(&self, user_id: &UserId) -> Result<u64>;

    /// Get a generation job by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_job(&self, job_id: &JobId) -> Result<Option<GenerationJob>>;

    /// Every job still pending, oldest first. Used to resume work after a restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_pending_jobs(&self) -> Result<Vec<GenerationJob>>;

    // =========================================================================
    // Default Credit Configuration
    // =========================================================================

    /// Deactivate every active row and insert `config` as the active row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn activate_default_credit_config(&self, config: &DefaultCreditConfig) -> Result<()>;

    /// Insert an inactive row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` if `config` is active; use
    /// [`Store::activate_default_credit_config`] for that.
    async fn insert_default_credit_config(&self, config: &DefaultCreditConfig) -> Result<()>;

    /// The active row, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_active_default_credit_config(&self) -> Result<Option<DefaultCreditConfig>>;

    /// Get a row by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_default_credit_config(&self, id: &ConfigId)
        -> Result<Option<DefaultCreditConfig>>;

    /// List rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_default_credit_configs(&self, limit: usize) -> Result<Vec<DefaultCreditConfig>>;

    /// Apply a partial update. If the patch activates the row, every other
    /// row is deactivated in the same atomic unit.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the row doesn't exist.
    /// - `StoreError::InvalidInput` if the patch sets a negative credit value.
    async fn update_default_credit_config(
        &self,
        id: &ConfigId,
        patch: &DefaultCreditConfigPatch,
    ) -> Result<DefaultCreditConfig>;

    /// Delete a row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the row doesn't exist.
    async fn delete_default_credit_config(&self, id: &ConfigId) -> Result<()>;
}
