//! Column families for the `RocksDB` backend.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// User records, keyed by `user_id`.
    pub const USERS: &str = "users";

    /// Index: user by normalised email. Value is the `user_id`.
    pub const USERS_BY_EMAIL: &str = "users_by_email";

    /// Index: user by normalised phone. Value is the `user_id`.
    pub const USERS_BY_PHONE: &str = "users_by_phone";

    /// Credit transactions, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: transactions by user, keyed by `user_id || transaction_id`.
    /// Value is empty (index only).
    pub const TRANSACTIONS_BY_USER: &str = "transactions_by_user";

    /// Idempotency index: `kind || key` to `transaction_id`.
    /// Holds paper deductions, paper refunds and captured payments.
    pub const LEDGER_KEYS: &str = "ledger_keys";

    /// Papers, keyed by `paper_id`.
    pub const PAPERS: &str = "papers";

    /// Index: papers by user, keyed by `user_id || created_at || paper_id`.
    pub const PAPERS_BY_USER: &str = "papers_by_user";

    /// Generation jobs, keyed by `job_id`.
    pub const JOBS: &str = "jobs";

    /// Default credit configuration rows, keyed by `config_id`.
    pub const DEFAULT_CREDIT_CONFIGS: &str = "default_credit_configs";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::USERS,
        cf::USERS_BY_EMAIL,
        cf::USERS_BY_PHONE,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_USER,
        cf::LEDGER_KEYS,
        cf::PAPERS,
        cf::PAPERS_BY_USER,
        cf::JOBS,
        cf::DEFAULT_CREDIT_CONFIGS,
    ]
}
