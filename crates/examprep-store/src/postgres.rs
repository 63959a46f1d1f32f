//! PostgreSQL storage implementation.
//!
//! Balance changes run inside a database transaction that first locks the
//! user row with `SELECT ... FOR UPDATE`. Concurrent requests for the same
//! user therefore queue on the row lock, and the sufficiency check always
//! sees the latest balance.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::types::Json;
use uuid::Uuid;

use examprep_core::{
    ConfigId, CreditAccount, CreditTransaction, DefaultCreditConfig, DefaultCreditConfigPatch,
    GenerationJob, GenerationStatus, JobId, LedgerEntry, LedgerReceipt, Paper, PaperId,
    PaperQuestion, PaymentDetails, TransactionType, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::idempotency::{refund_once, LedgerKey};
use crate::{Store, WELCOME_CREDITS_NOTE};

const SELECT_USER: &str = "SELECT id, email, phone, full_name, user_type, is_active, \
     credit_balance, total_credits_purchased, last_login_at, created_at, updated_at FROM users";

const SELECT_TRANSACTION: &str = "SELECT id, user_id, transaction_type, credits_change, \
     balance_after, payment_gateway_id, payment_amount_paise, payment_status, \
     razorpay_payment_id, related_paper_id, notes, created_at FROM credit_transactions";

const SELECT_PAPER: &str =
    "SELECT id, user_id, topic, status, questions, created_at, updated_at FROM papers";

const SELECT_JOB: &str = "SELECT id, paper_id, user_id, topic, status, attempts, error, \
     created_at, updated_at FROM generation_jobs";

const SELECT_CONFIG: &str = "SELECT id, credits_per_new_student, description, is_active, \
     updated_by, created_at, updated_at FROM default_credit_configs";

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database at `database_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// Rows
// =============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: Option<String>,
    phone: Option<String>,
    full_name: String,
    user_type: String,
    is_active: bool,
    credit_balance: i64,
    total_credits_purchased: i64,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            email: row.email,
            phone: row.phone,
            full_name: row.full_name,
            user_type: row.user_type.parse().map_err(StoreError::Serialization)?,
            is_active: row.is_active,
            credit_balance: row.credit_balance,
            total_credits_purchased: row.total_credits_purchased,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: String,
    user_id: Uuid,
    transaction_type: String,
    credits_change: i64,
    balance_after: i64,
    payment_gateway_id: Option<String>,
    payment_amount_paise: Option<i64>,
    payment_status: Option<String>,
    razorpay_payment_id: Option<String>,
    related_paper_id: Option<Uuid>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for CreditTransaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        let payment = PaymentDetails {
            gateway_id: row.payment_gateway_id,
            amount_paise: row.payment_amount_paise,
            status: row.payment_status,
            razorpay_payment_id: row.razorpay_payment_id,
        };
        Ok(Self {
            id: row
                .id
                .parse()
                .map_err(|e| StoreError::Serialization(format!("transaction id: {e}")))?,
            user_id: UserId::from_uuid(row.user_id),
            transaction_type: row
                .transaction_type
                .parse()
                .map_err(StoreError::Serialization)?,
            credits_change: row.credits_change,
            balance_after: row.balance_after,
            payment: (!payment.is_empty()).then_some(payment),
            related_paper_id: row.related_paper_id.map(PaperId::from_uuid),
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaperRow {
    id: Uuid,
    user_id: Uuid,
    topic: String,
    status: String,
    questions: Json<Vec<PaperQuestion>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaperRow> for Paper {
    type Error = StoreError;

    fn try_from(row: PaperRow) -> Result<Self> {
        Ok(Self {
            id: PaperId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            topic: row.topic,
            status: row.status.parse().map_err(StoreError::Serialization)?,
            questions: row.questions.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    paper_id: Uuid,
    user_id: Uuid,
    topic: String,
    status: String,
    attempts: i32,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for GenerationJob {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self> {
        Ok(Self {
            id: JobId::from_uuid(row.id),
            paper_id: PaperId::from_uuid(row.paper_id),
            user_id: UserId::from_uuid(row.user_id),
            topic: row.topic,
            status: row.status.parse().map_err(StoreError::Serialization)?,
            attempts: u32::try_from(row.attempts)
                .map_err(|e| StoreError::Serialization(format!("attempts: {e}")))?,
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ConfigRow {
    id: Uuid,
    credits_per_new_student: i64,
    description: Option<String>,
    is_active: bool,
    updated_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ConfigRow> for DefaultCreditConfig {
    fn from(row: ConfigRow) -> Self {
        Self {
            id: ConfigId::from_uuid(row.id),
            credits_per_new_student: row.credits_per_new_student,
            description: row.description,
            is_active: row.is_active,
            updated_by: row.updated_by.map(UserId::from_uuid),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Helpers running inside an open transaction
// =============================================================================

fn sql_limit(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Lock the user row, check idempotency keys, apply the entry and append the
/// transaction. The caller owns the database transaction and commits it.
async fn apply_locked(conn: &mut PgConnection, entry: &LedgerEntry) -> Result<LedgerReceipt> {
    let row: Option<(i64, i64)> = sqlx::query_as(
        "SELECT credit_balance, total_credits_purchased FROM users WHERE id = $1 FOR UPDATE",
    )
    .bind(*entry.user_id.as_uuid())
    .fetch_optional(&mut *conn)
    .await?;
    let (balance, total_purchased) =
        row.ok_or_else(|| StoreError::not_found("user", entry.user_id))?;

    for key in LedgerKey::for_entry(entry) {
        let taken: bool = match &key {
            LedgerKey::PaperDeduction(paper_id) | LedgerKey::PaperRefund(paper_id) => {
                sqlx::query_scalar(
                    "SELECT EXISTS (SELECT 1 FROM credit_transactions \
                     WHERE related_paper_id = $1 AND transaction_type = $2)",
                )
                .bind(*paper_id.as_uuid())
                .bind(key.kind())
                .fetch_one(&mut *conn)
                .await?
            }
            LedgerKey::Payment(payment_id) => {
                sqlx::query_scalar(
                    "SELECT EXISTS (SELECT 1 FROM credit_transactions \
                     WHERE razorpay_payment_id = $1)",
                )
                .bind(payment_id)
                .fetch_one(&mut *conn)
                .await?
            }
        };
        if taken {
            return Err(key.duplicate());
        }
    }

    let mut account = CreditAccount {
        user_id: entry.user_id,
        balance,
        total_purchased,
    };
    let transaction = entry.apply(&mut account)?;

    sqlx::query(
        "UPDATE users SET credit_balance = $2, total_credits_purchased = $3, updated_at = now() \
         WHERE id = $1",
    )
    .bind(*entry.user_id.as_uuid())
    .bind(account.balance)
    .bind(account.total_purchased)
    .execute(&mut *conn)
    .await?;

    insert_transaction(conn, &transaction).await?;

    tracing::debug!(
        user_id = %entry.user_id,
        transaction_id = %transaction.id,
        transaction_type = %transaction.transaction_type,
        credits_change = transaction.credits_change,
        balance_after = transaction.balance_after,
        "Ledger entry applied"
    );

    Ok(LedgerReceipt::new(balance, transaction))
}

async fn insert_transaction(conn: &mut PgConnection, tx: &CreditTransaction) -> Result<()> {
    let payment = tx.payment.clone().unwrap_or_default();
    sqlx::query(
        "INSERT INTO credit_transactions (id, user_id, transaction_type, credits_change, \
         balance_after, payment_gateway_id, payment_amount_paise, payment_status, \
         razorpay_payment_id, related_paper_id, notes, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(tx.id.to_string())
    .bind(*tx.user_id.as_uuid())
    .bind(tx.transaction_type.as_str())
    .bind(tx.credits_change)
    .bind(tx.balance_after)
    .bind(payment.gateway_id)
    .bind(payment.amount_paise)
    .bind(payment.status)
    .bind(payment.razorpay_payment_id)
    .bind(tx.related_paper_id.map(|id| *id.as_uuid()))
    .bind(&tx.notes)
    .bind(tx.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Lock a job row and make sure it has not finished. Returns its paper.
async fn lock_pending_job(conn: &mut PgConnection, job_id: &JobId) -> Result<PaperId> {
    let row: Option<(Uuid, String)> =
        sqlx::query_as("SELECT paper_id, status FROM generation_jobs WHERE id = $1 FOR UPDATE")
            .bind(*job_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;
    let (paper_id, status) = row.ok_or_else(|| StoreError::not_found("job", job_id))?;
    let status: GenerationStatus = status.parse().map_err(StoreError::Serialization)?;
    if status.is_terminal() {
        return Err(StoreError::Conflict(format!("job {job_id} already {status}")));
    }
    Ok(PaperId::from_uuid(paper_id))
}

async fn finish_job(
    conn: &mut PgConnection,
    job_id: &JobId,
    paper_id: &PaperId,
    status: GenerationStatus,
    error: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "UPDATE generation_jobs SET status = $2, error = COALESCE($3, error), updated_at = now() \
         WHERE id = $1",
    )
    .bind(*job_id.as_uuid())
    .bind(status.as_str())
    .bind(error)
    .execute(&mut *conn)
    .await?;
    sqlx::query("UPDATE papers SET status = $2, updated_at = now() WHERE id = $1")
        .bind(*paper_id.as_uuid())
        .bind(status.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn deactivate_configs(conn: &mut PgConnection, except: Option<&ConfigId>) -> Result<()> {
    sqlx::query(
        "UPDATE default_credit_configs SET is_active = FALSE, updated_at = now() \
         WHERE is_active AND ($1::uuid IS NULL OR id <> $1)",
    )
    .bind(except.map(|id| *id.as_uuid()))
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_config(conn: &mut PgConnection, config: &DefaultCreditConfig) -> Result<()> {
    sqlx::query(
        "INSERT INTO default_credit_configs (id, credits_per_new_student, description, \
         is_active, updated_by, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(*config.id.as_uuid())
    .bind(config.credits_per_new_student)
    .bind(&config.description)
    .bind(config.is_active)
    .bind(config.updated_by.map(|id| *id.as_uuid()))
    .bind(config.created_at)
    .bind(config.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    async fn create_user(&self, user: &User, initial_credits: i64) -> Result<User> {
        if initial_credits < 0 {
            return Err(StoreError::InvalidAmount(format!(
                "initial credits must be non-negative, got {initial_credits}"
            )));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO users (id, email, phone, full_name, user_type, is_active, \
             credit_balance, total_credits_purchased, last_login_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 0, 0, $7, $8, $9)",
        )
        .bind(*user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.full_name)
        .bind(user.user_type.as_str())
        .bind(user.is_active)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await?;

        if initial_credits > 0 {
            let entry = LedgerEntry::credit(user.id, TransactionType::Bonus, initial_credits)
                .with_notes(WELCOME_CREDITS_NOTE);
            apply_locked(&mut tx, &entry).await?;
        }

        let row: UserRow = sqlx::query_as(&format!("{SELECT_USER} WHERE id = $1"))
            .bind(*user.id.as_uuid())
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        row.try_into()
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE id = $1"))
            .bind(*user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE phone = $1"))
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn list_users(&self, limit: usize, offset: usize) -> Result<Vec<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "{SELECT_USER} ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(sql_limit(limit))
        .bind(sql_limit(offset))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
    }

    async fn count_users(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count(n))
    }

    async fn update_user_profile(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET full_name = $2, is_active = $3, last_login_at = $4, \
             updated_at = now() WHERE id = $1",
        )
        .bind(*user.id.as_uuid())
        .bind(&user.full_name)
        .bind(user.is_active)
        .bind(user.last_login_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user", user.id));
        }
        Ok(())
    }

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    async fn apply_ledger_entry(&self, entry: &LedgerEntry) -> Result<LedgerReceipt> {
        let mut tx = self.pool.begin().await?;
        let receipt = apply_locked(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(receipt)
    }

    async fn get_balance(&self, user_id: &UserId) -> Result<i64> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT credit_balance FROM users WHERE id = $1")
                .bind(*user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(balance.unwrap_or(0))
    }

    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        sqlx::query_as::<_, TransactionRow>(&format!(
            "{SELECT_TRANSACTION} WHERE user_id = $1 ORDER BY id COLLATE \"C\" DESC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(*user_id.as_uuid())
        .bind(sql_limit(limit))
        .bind(sql_limit(offset))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(CreditTransaction::try_from)
        .collect()
    }

    async fn count_transactions(&self, user_id: &UserId) -> Result<u64> {
        let n: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM credit_transactions WHERE user_id = $1")
                .bind(*user_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;
        Ok(count(n))
    }

    async fn find_transaction_by_payment_id(
        &self,
        razorpay_payment_id: &str,
    ) -> Result<Option<CreditTransaction>> {
        sqlx::query_as::<_, TransactionRow>(&format!(
            "{SELECT_TRANSACTION} WHERE razorpay_payment_id = $1"
        ))
        .bind(razorpay_payment_id)
        .fetch_optional(&self.pool)
        .await?
        .map(CreditTransaction::try_from)
        .transpose()
    }

    async fn ledger_totals(&self, user_id: &UserId) -> Result<(i64, i64)> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT u.credit_balance, \
             COALESCE((SELECT SUM(t.credits_change) FROM credit_transactions t \
                       WHERE t.user_id = u.id), 0)::BIGINT \
             FROM users u WHERE u.id = $1",
        )
        .bind(*user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| StoreError::not_found("user", user_id))
    }

    // =========================================================================
    // Paper Generation
    // =========================================================================

    async fn begin_generation(
        &self,
        entry: &LedgerEntry,
        paper: &Paper,
        job: &GenerationJob,
    ) -> Result<LedgerReceipt> {
        let mut tx = self.pool.begin().await?;
        let receipt = apply_locked(&mut tx, entry).await?;

        sqlx::query(
            "INSERT INTO papers (id, user_id, topic, status, questions, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(*paper.id.as_uuid())
        .bind(*paper.user_id.as_uuid())
        .bind(&paper.topic)
        .bind(paper.status.as_str())
        .bind(Json(&paper.questions))
        .bind(paper.created_at)
        .bind(paper.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO generation_jobs (id, paper_id, user_id, topic, status, attempts, error, \
             created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(*job.id.as_uuid())
        .bind(*job.paper_id.as_uuid())
        .bind(*job.user_id.as_uuid())
        .bind(&job.topic)
        .bind(job.status.as_str())
        .bind(i32::try_from(job.attempts).unwrap_or(i32::MAX))
        .bind(&job.error)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(receipt)
    }

    async fn complete_generation(
        &self,
        job_id: &JobId,
        questions: &[PaperQuestion],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let paper_id = lock_pending_job(&mut tx, job_id).await?;

        sqlx::query("UPDATE papers SET questions = $2 WHERE id = $1")
            .bind(*paper_id.as_uuid())
            .bind(Json(questions))
            .execute(&mut *tx)
            .await?;
        finish_job(&mut tx, job_id, &paper_id, GenerationStatus::Done, None).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn record_job_attempt(&self, job_id: &JobId, error: &str) -> Result<u32> {
        let attempts: Option<i32> = sqlx::query_scalar(
            "UPDATE generation_jobs SET attempts = attempts + 1, error = $2, updated_at = now() \
             WHERE id = $1 RETURNING attempts",
        )
        .bind(*job_id.as_uuid())
        .bind(error)
        .fetch_optional(&self.pool)
        .await?;
        let attempts = attempts.ok_or_else(|| StoreError::not_found("job", job_id))?;
        u32::try_from(attempts).map_err(|e| StoreError::Serialization(format!("attempts: {e}")))
    }

    async fn fail_generation(
        &self,
        job_id: &JobId,
        error: &str,
        refund: &LedgerEntry,
    ) -> Result<Option<LedgerReceipt>> {
        let mut tx = self.pool.begin().await?;
        let paper_id = lock_pending_job(&mut tx, job_id).await?;
        if refund.related_paper_id != Some(paper_id) {
            return Err(StoreError::InvalidInput(format!(
                "refund is not keyed by paper {paper_id}"
            )));
        }

        let receipt = refund_once(apply_locked(&mut tx, refund).await)?;
        finish_job(&mut tx, job_id, &paper_id, GenerationStatus::Failed, Some(error)).await?;

        tx.commit().await?;
        Ok(receipt)
    }

    async fn get_paper(&self, paper_id: &PaperId) -> Result<Option<Paper>> {
        sqlx::query_as::<_, PaperRow>(&format!("{SELECT_PAPER} WHERE id = $1"))
            .bind(*paper_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Paper::try_from)
            .transpose()
    }

    async fn list_papers(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Paper>> {
        sqlx::query_as::<_, PaperRow>(&format!(
            "{SELECT_PAPER} WHERE user_id = $1 ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(*user_id.as_uuid())
        .bind(sql_limit(limit))
        .bind(sql_limit(offset))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Paper::try_from)
        .collect()
    }

    async fn count_papers(&self, user_id: &UserId) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM papers WHERE user_id = $1")
            .bind(*user_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(count(n))
    }

    async fn get_job(&self, job_id: &JobId) -> Result<Option<GenerationJob>> {
        sqlx::query_as::<_, JobRow>(&format!("{SELECT_JOB} WHERE id = $1"))
            .bind(*job_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(GenerationJob::try_from)
            .transpose()
    }

    async fn list_pending_jobs(&self) -> Result<Vec<GenerationJob>> {
        sqlx::query_as::<_, JobRow>(&format!(
            "{SELECT_JOB} WHERE status = $1 ORDER BY created_at, id"
        ))
        .bind(GenerationStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(GenerationJob::try_from)
        .collect()
    }

    // =========================================================================
    // Default Credit Configuration
    // =========================================================================

    async fn activate_default_credit_config(&self, config: &DefaultCreditConfig) -> Result<()> {
        let mut active = config.clone();
        active.is_active = true;

        let mut tx = self.pool.begin().await?;
        deactivate_configs(&mut tx, None).await?;
        insert_config(&mut tx, &active).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_default_credit_config(&self, config: &DefaultCreditConfig) -> Result<()> {
        if config.is_active {
            return Err(StoreError::InvalidInput(
                "active configurations must be activated, not inserted".into(),
            ));
        }
        let mut conn = self.pool.acquire().await?;
        insert_config(&mut conn, config).await
    }

    async fn get_active_default_credit_config(&self) -> Result<Option<DefaultCreditConfig>> {
        let row = sqlx::query_as::<_, ConfigRow>(&format!(
            "{SELECT_CONFIG} WHERE is_active ORDER BY created_at DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn get_default_credit_config(
        &self,
        id: &ConfigId,
    ) -> Result<Option<DefaultCreditConfig>> {
        let row = sqlx::query_as::<_, ConfigRow>(&format!("{SELECT_CONFIG} WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn list_default_credit_configs(&self, limit: usize) -> Result<Vec<DefaultCreditConfig>> {
        let rows = sqlx::query_as::<_, ConfigRow>(&format!(
            "{SELECT_CONFIG} ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_default_credit_config(
        &self,
        id: &ConfigId,
        patch: &DefaultCreditConfigPatch,
    ) -> Result<DefaultCreditConfig> {
        let mut tx = self.pool.begin().await?;
        let row =
            sqlx::query_as::<_, ConfigRow>(&format!("{SELECT_CONFIG} WHERE id = $1 FOR UPDATE"))
                .bind(*id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let mut config: DefaultCreditConfig = row
            .ok_or_else(|| StoreError::not_found("default credit config", id))?
            .into();
        config.apply_patch(patch)?;

        if patch.activates() {
            deactivate_configs(&mut tx, Some(id)).await?;
        }
        sqlx::query(
            "UPDATE default_credit_configs SET credits_per_new_student = $2, description = $3, \
             is_active = $4, updated_by = $5, updated_at = $6 WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .bind(config.credits_per_new_student)
        .bind(&config.description)
        .bind(config.is_active)
        .bind(config.updated_by.map(|u| *u.as_uuid()))
        .bind(config.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(config)
    }

    async fn delete_default_credit_config(&self, id: &ConfigId) -> Result<()> {
        let result = sqlx::query("DELETE FROM default_credit_configs WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("default credit config", id));
        }
        Ok(())
    }
}
