//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Compound operations stage every write in a single `WriteBatch`. Balance
//! changes are serialised per user through striped async locks; user creation
//! and payment credits, whose uniqueness spans users, also take the registry
//! lock first.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};
use tokio::sync::Mutex;

use examprep_core::{
    ConfigId, CreditTransaction, DefaultCreditConfig, DefaultCreditConfigPatch, GenerationJob,
    GenerationStatus, JobId, LedgerEntry, LedgerReceipt, Paper, PaperId, PaperQuestion,
    TransactionType, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::idempotency::{refund_once, LedgerKey};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{Store, WELCOME_CREDITS_NOTE};

const LOCK_STRIPES: usize = 64;

#[allow(clippy::needless_pass_by_value)]
fn db_err(e: rocksdb::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    user_locks: Vec<Mutex<()>>,
    registry_lock: Mutex<()>,
    config_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(db_err)?;

        Ok(Self {
            db: Arc::new(db),
            user_locks: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
            registry_lock: Mutex::new(()),
            config_lock: Mutex::new(()),
        })
    }

    fn user_lock(&self, user_id: &UserId) -> &Mutex<()> {
        let stripe = usize::from(user_id.as_bytes()[15]) % LOCK_STRIPES;
        &self.user_locks[stripe]
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_raw(&self, name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf(name)?;
        self.db.get_cf(&cf, key).map_err(db_err)
    }

    fn get<T: serde::de::DeserializeOwned>(&self, name: &str, key: &[u8]) -> Result<Option<T>> {
        self.get_raw(name, key)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db.write(batch).map_err(db_err)
    }

    /// All keys in `name` starting with `prefix`, in key order.
    fn prefix_keys(&self, name: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf(name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut all_keys = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(db_err)?;
            if !key.starts_with(prefix) {
                break;
            }
            all_keys.push(key.to_vec());
        }
        Ok(all_keys)
    }

    fn all_values<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let cf = self.cf(name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(db_err)?;
            values.push(Self::deserialize(&value)?);
        }
        Ok(values)
    }

    fn load_user(&self, user_id: &UserId) -> Result<User> {
        self.get(cf::USERS, &keys::user_key(user_id))?
            .ok_or_else(|| StoreError::not_found("user", user_id))
    }

    fn load_job(&self, job_id: &JobId) -> Result<GenerationJob> {
        self.get(cf::JOBS, &keys::uuid_key(job_id.as_uuid()))?
            .ok_or_else(|| StoreError::not_found("job", job_id))
    }

    fn find_by_contact(&self, index: &str, contact: &str) -> Result<Option<User>> {
        let Some(raw) = self.get_raw(index, &keys::contact_key(contact))? else {
            return Ok(None);
        };
        self.get(cf::USERS, &raw)
    }

    fn user_transaction_ids(&self, user_id: &UserId) -> Result<Vec<Vec<u8>>> {
        self.prefix_keys(cf::TRANSACTIONS_BY_USER, &keys::user_prefix(user_id))
    }

    // =========================================================================
    // Staged writes. Callers hold the locks and write the batch.
    // =========================================================================

    /// Apply `entry` to `user` and stage the balance, transaction and
    /// idempotency keys into `batch`.
    fn stage_entry(
        &self,
        batch: &mut WriteBatch,
        user: &mut User,
        entry: &LedgerEntry,
    ) -> Result<LedgerReceipt> {
        let keys = LedgerKey::for_entry(entry);
        for key in &keys {
            if self.get_raw(cf::LEDGER_KEYS, &key.encode())?.is_some() {
                return Err(key.duplicate());
            }
        }

        let mut account = user.account();
        let previous_balance = account.balance;
        let transaction = entry.apply(&mut account)?;
        user.set_account(&account);

        let cf_users = self.cf(cf::USERS)?;
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_tx_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let cf_ledger_keys = self.cf(cf::LEDGER_KEYS)?;

        batch.put_cf(&cf_users, keys::user_key(&user.id), Self::serialize(user)?);
        batch.put_cf(
            &cf_tx,
            keys::transaction_key(&transaction.id),
            Self::serialize(&transaction)?,
        );
        batch.put_cf(
            &cf_tx_by_user,
            keys::user_transaction_key(&user.id, &transaction.id),
            [],
        );
        for key in &keys {
            batch.put_cf(&cf_ledger_keys, key.encode(), transaction.id.to_bytes());
        }

        Ok(LedgerReceipt::new(previous_balance, transaction))
    }

    fn stage_job_and_paper(
        &self,
        batch: &mut WriteBatch,
        job: &GenerationJob,
        paper: &Paper,
    ) -> Result<()> {
        let cf_jobs = self.cf(cf::JOBS)?;
        let cf_papers = self.cf(cf::PAPERS)?;
        batch.put_cf(
            &cf_jobs,
            keys::uuid_key(job.id.as_uuid()),
            Self::serialize(job)?,
        );
        batch.put_cf(
            &cf_papers,
            keys::uuid_key(paper.id.as_uuid()),
            Self::serialize(paper)?,
        );
        Ok(())
    }

    /// Job and its paper, requiring the job to still be pending.
    fn pending_job_and_paper(&self, job_id: &JobId) -> Result<(GenerationJob, Paper)> {
        let job = self.load_job(job_id)?;
        if job.status.is_terminal() {
            return Err(StoreError::Conflict(format!(
                "job {job_id} already {}",
                job.status
            )));
        }
        let paper: Paper = self
            .get(cf::PAPERS, &keys::uuid_key(job.paper_id.as_uuid()))?
            .ok_or_else(|| StoreError::not_found("paper", job.paper_id))?;
        Ok((job, paper))
    }

    // =========================================================================
    // Locked operations
    // =========================================================================

    fn create_user_locked(&self, user: &User, initial_credits: i64) -> Result<User> {
        if self.get_raw(cf::USERS, &keys::user_key(&user.id))?.is_some() {
            return Err(StoreError::Conflict(format!("user {} already exists", user.id)));
        }
        let contacts = [
            (cf::USERS_BY_EMAIL, user.email.as_deref()),
            (cf::USERS_BY_PHONE, user.phone.as_deref()),
        ];
        for (index, contact) in contacts {
            if let Some(contact) = contact {
                if self.get_raw(index, &keys::contact_key(contact))?.is_some() {
                    return Err(StoreError::Conflict(format!(
                        "{contact} already registered"
                    )));
                }
            }
        }

        let mut stored = user.clone();
        stored.credit_balance = 0;
        stored.total_credits_purchased = 0;

        let mut batch = WriteBatch::default();
        for (index, contact) in contacts {
            if let Some(contact) = contact {
                let cf_index = self.cf(index)?;
                batch.put_cf(&cf_index, keys::contact_key(contact), keys::user_key(&user.id));
            }
        }
        if initial_credits > 0 {
            let entry = LedgerEntry::credit(user.id, TransactionType::Bonus, initial_credits)
                .with_notes(WELCOME_CREDITS_NOTE);
            self.stage_entry(&mut batch, &mut stored, &entry)?;
        } else {
            let cf_users = self.cf(cf::USERS)?;
            batch.put_cf(&cf_users, keys::user_key(&user.id), Self::serialize(&stored)?);
        }
        self.write(batch)?;
        Ok(stored)
    }

    fn apply_locked(&self, entry: &LedgerEntry) -> Result<LedgerReceipt> {
        let mut user = self.load_user(&entry.user_id)?;
        let mut batch = WriteBatch::default();
        let receipt = self.stage_entry(&mut batch, &mut user, entry)?;
        self.write(batch)?;
        Ok(receipt)
    }

    fn begin_generation_locked(
        &self,
        entry: &LedgerEntry,
        paper: &Paper,
        job: &GenerationJob,
    ) -> Result<LedgerReceipt> {
        if self
            .get_raw(cf::PAPERS, &keys::uuid_key(paper.id.as_uuid()))?
            .is_some()
        {
            return Err(StoreError::Conflict(format!("paper {} already exists", paper.id)));
        }
        if self
            .get_raw(cf::JOBS, &keys::uuid_key(job.id.as_uuid()))?
            .is_some()
        {
            return Err(StoreError::Conflict(format!("job {} already exists", job.id)));
        }

        let mut user = self.load_user(&entry.user_id)?;
        let mut batch = WriteBatch::default();
        let receipt = self.stage_entry(&mut batch, &mut user, entry)?;

        self.stage_job_and_paper(&mut batch, job, paper)?;
        let cf_papers_by_user = self.cf(cf::PAPERS_BY_USER)?;
        batch.put_cf(
            &cf_papers_by_user,
            keys::user_paper_key(&paper.user_id, paper.created_at, &paper.id),
            [],
        );

        self.write(batch)?;
        Ok(receipt)
    }

    fn complete_generation_locked(
        &self,
        job_id: &JobId,
        questions: &[PaperQuestion],
    ) -> Result<()> {
        let (mut job, mut paper) = self.pending_job_and_paper(job_id)?;
        let now = Utc::now();
        job.status = GenerationStatus::Done;
        job.updated_at = now;
        paper.status = GenerationStatus::Done;
        paper.questions = questions.to_vec();
        paper.updated_at = now;

        let mut batch = WriteBatch::default();
        self.stage_job_and_paper(&mut batch, &job, &paper)?;
        self.write(batch)
    }

    fn record_job_attempt_locked(&self, job_id: &JobId, error: &str) -> Result<u32> {
        let mut job = self.load_job(job_id)?;
        job.attempts += 1;
        job.error = Some(error.to_string());
        job.updated_at = Utc::now();

        let cf_jobs = self.cf(cf::JOBS)?;
        self.db
            .put_cf(&cf_jobs, keys::uuid_key(job_id.as_uuid()), Self::serialize(&job)?)
            .map_err(db_err)?;
        Ok(job.attempts)
    }

    fn fail_generation_locked(
        &self,
        job_id: &JobId,
        error: &str,
        refund: &LedgerEntry,
    ) -> Result<Option<LedgerReceipt>> {
        let (mut job, mut paper) = self.pending_job_and_paper(job_id)?;
        if refund.related_paper_id != Some(paper.id) {
            return Err(StoreError::InvalidInput(format!(
                "refund is not keyed by paper {}",
                paper.id
            )));
        }

        let mut user = self.load_user(&refund.user_id)?;
        let mut batch = WriteBatch::default();
        let receipt = refund_once(self.stage_entry(&mut batch, &mut user, refund))?;

        let now = Utc::now();
        job.status = GenerationStatus::Failed;
        job.error = Some(error.to_string());
        job.updated_at = now;
        paper.status = GenerationStatus::Failed;
        paper.updated_at = now;
        self.stage_job_and_paper(&mut batch, &job, &paper)?;

        self.write(batch)?;
        Ok(receipt)
    }

    fn put_configs(&self, configs: &[DefaultCreditConfig]) -> Result<()> {
        let cf_configs = self.cf(cf::DEFAULT_CREDIT_CONFIGS)?;
        let mut batch = WriteBatch::default();
        for config in configs {
            batch.put_cf(
                &cf_configs,
                keys::uuid_key(config.id.as_uuid()),
                Self::serialize(config)?,
            );
        }
        self.write(batch)
    }

    /// Every active row except `except`, switched off.
    fn deactivated_configs(&self, except: Option<&ConfigId>) -> Result<Vec<DefaultCreditConfig>> {
        let now = Utc::now();
        Ok(self
            .all_values::<DefaultCreditConfig>(cf::DEFAULT_CREDIT_CONFIGS)?
            .into_iter()
            .filter(|c| c.is_active && Some(&c.id) != except)
            .map(|mut c| {
                c.is_active = false;
                c.updated_at = now;
                c
            })
            .collect())
    }

    fn sorted_configs(&self) -> Result<Vec<DefaultCreditConfig>> {
        let mut configs: Vec<DefaultCreditConfig> =
            self.all_values(cf::DEFAULT_CREDIT_CONFIGS)?;
        configs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(configs)
    }
}

#[async_trait]
impl Store for RocksStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    async fn create_user(&self, user: &User, initial_credits: i64) -> Result<User> {
        if initial_credits < 0 {
            return Err(StoreError::InvalidAmount(format!(
                "initial credits must be non-negative, got {initial_credits}"
            )));
        }
        let _registry = self.registry_lock.lock().await;
        let _user = self.user_lock(&user.id).lock().await;
        self.create_user_locked(user, initial_credits)
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        self.get(cf::USERS, &keys::user_key(user_id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_by_contact(cf::USERS_BY_EMAIL, email)
    }

    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        self.find_by_contact(cf::USERS_BY_PHONE, phone)
    }

    async fn list_users(&self, limit: usize, offset: usize) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.all_values(cf::USERS)?;
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(users.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(self.prefix_keys(cf::USERS, &[])?.len() as u64)
    }

    async fn update_user_profile(&self, user: &User) -> Result<()> {
        let _guard = self.user_lock(&user.id).lock().await;
        let mut stored = self.load_user(&user.id)?;
        stored.full_name.clone_from(&user.full_name);
        stored.is_active = user.is_active;
        stored.last_login_at = user.last_login_at;
        stored.updated_at = Utc::now();

        let cf_users = self.cf(cf::USERS)?;
        self.db
            .put_cf(&cf_users, keys::user_key(&user.id), Self::serialize(&stored)?)
            .map_err(db_err)
    }

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    async fn apply_ledger_entry(&self, entry: &LedgerEntry) -> Result<LedgerReceipt> {
        let spans_users = LedgerKey::for_entry(entry)
            .iter()
            .any(|key| matches!(key, LedgerKey::Payment(_)));
        let _registry = if spans_users {
            Some(self.registry_lock.lock().await)
        } else {
            None
        };
        let _guard = self.user_lock(&entry.user_id).lock().await;
        self.apply_locked(entry)
    }

    async fn get_balance(&self, user_id: &UserId) -> Result<i64> {
        let user: Option<User> = self.get(cf::USERS, &keys::user_key(user_id))?;
        Ok(user.map_or(0, |u| u.credit_balance))
    }

    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let mut all_keys = self.user_transaction_ids(user_id)?;
        // Reverse to get newest first
        all_keys.reverse();

        let mut transactions = Vec::new();
        for key in all_keys.into_iter().skip(offset).take(limit) {
            let Some(tx_id) = keys::extract_transaction_id_from_user_key(&key) else {
                continue;
            };
            if let Some(tx) = self.get(cf::TRANSACTIONS, &keys::transaction_key(&tx_id))? {
                transactions.push(tx);
            }
        }
        Ok(transactions)
    }

    async fn count_transactions(&self, user_id: &UserId) -> Result<u64> {
        Ok(self.user_transaction_ids(user_id)?.len() as u64)
    }

    async fn find_transaction_by_payment_id(
        &self,
        razorpay_payment_id: &str,
    ) -> Result<Option<CreditTransaction>> {
        let key = LedgerKey::Payment(razorpay_payment_id.to_string()).encode();
        let Some(tx_id) = self.get_raw(cf::LEDGER_KEYS, &key)? else {
            return Ok(None);
        };
        self.get(cf::TRANSACTIONS, &tx_id)
    }

    async fn ledger_totals(&self, user_id: &UserId) -> Result<(i64, i64)> {
        let user = self.load_user(user_id)?;
        let mut sum = 0;
        for key in self.user_transaction_ids(user_id)? {
            let Some(tx_id) = keys::extract_transaction_id_from_user_key(&key) else {
                continue;
            };
            let tx: Option<CreditTransaction> =
                self.get(cf::TRANSACTIONS, &keys::transaction_key(&tx_id))?;
            sum += tx.map_or(0, |tx| tx.credits_change);
        }
        Ok((user.credit_balance, sum))
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
        let _guard = self.user_lock(&entry.user_id).lock().await;
        self.begin_generation_locked(entry, paper, job)
    }

    async fn complete_generation(
        &self,
        job_id: &JobId,
        questions: &[PaperQuestion],
    ) -> Result<()> {
        let user_id = self.load_job(job_id)?.user_id;
        let _guard = self.user_lock(&user_id).lock().await;
        self.complete_generation_locked(job_id, questions)
    }

    async fn record_job_attempt(&self, job_id: &JobId, error: &str) -> Result<u32> {
        let user_id = self.load_job(job_id)?.user_id;
        let _guard = self.user_lock(&user_id).lock().await;
        self.record_job_attempt_locked(job_id, error)
    }

    async fn fail_generation(
        &self,
        job_id: &JobId,
        error: &str,
        refund: &LedgerEntry,
    ) -> Result<Option<LedgerReceipt>> {
        let user_id = self.load_job(job_id)?.user_id;
        let _guard = self.user_lock(&user_id).lock().await;
        self.fail_generation_locked(job_id, error, refund)
    }

    async fn get_paper(&self, paper_id: &PaperId) -> Result<Option<Paper>> {
        self.get(cf::PAPERS, &keys::uuid_key(paper_id.as_uuid()))
    }

    async fn list_papers(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Paper>> {
        let mut all_keys = self.prefix_keys(cf::PAPERS_BY_USER, &keys::user_prefix(user_id))?;
        all_keys.reverse();

        let mut papers = Vec::new();
        for key in all_keys.into_iter().skip(offset).take(limit) {
            let Some(paper_id) = keys::extract_paper_id_from_user_key(&key) else {
                continue;
            };
            if let Some(paper) = self.get(cf::PAPERS, &keys::uuid_key(paper_id.as_uuid()))? {
                papers.push(paper);
            }
        }
        Ok(papers)
    }

    async fn count_papers(&self, user_id: &UserId) -> Result<u64> {
        Ok(self
            .prefix_keys(cf::PAPERS_BY_USER, &keys::user_prefix(user_id))?
            .len() as u64)
    }

    async fn get_job(&self, job_id: &JobId) -> Result<Option<GenerationJob>> {
        self.get(cf::JOBS, &keys::uuid_key(job_id.as_uuid()))
    }

    async fn list_pending_jobs(&self) -> Result<Vec<GenerationJob>> {
        let mut jobs: Vec<GenerationJob> = self
            .all_values::<GenerationJob>(cf::JOBS)?
            .into_iter()
            .filter(|j| j.status == GenerationStatus::Pending)
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(jobs)
    }

    // =========================================================================
    // Default Credit Configuration
    // =========================================================================

    async fn activate_default_credit_config(&self, config: &DefaultCreditConfig) -> Result<()> {
        let _guard = self.config_lock.lock().await;
        let mut rows = self.deactivated_configs(None)?;
        let mut active = config.clone();
        active.is_active = true;
        rows.push(active);
        self.put_configs(&rows)
    }

    async fn insert_default_credit_config(&self, config: &DefaultCreditConfig) -> Result<()> {
        if config.is_active {
            return Err(StoreError::InvalidInput(
                "active configurations must be activated, not inserted".into(),
            ));
        }
        let _guard = self.config_lock.lock().await;
        self.put_configs(std::slice::from_ref(config))
    }

    async fn get_active_default_credit_config(&self) -> Result<Option<DefaultCreditConfig>> {
        Ok(self.sorted_configs()?.into_iter().find(|c| c.is_active))
    }

    async fn get_default_credit_config(
        &self,
        id: &ConfigId,
    ) -> Result<Option<DefaultCreditConfig>> {
        self.get(cf::DEFAULT_CREDIT_CONFIGS, &keys::uuid_key(id.as_uuid()))
    }

    async fn list_default_credit_configs(&self, limit: usize) -> Result<Vec<DefaultCreditConfig>> {
        Ok(self.sorted_configs()?.into_iter().take(limit).collect())
    }

    async fn update_default_credit_config(
        &self,
        id: &ConfigId,
        patch: &DefaultCreditConfigPatch,
    ) -> Result<DefaultCreditConfig> {
        let _guard = self.config_lock.lock().await;
        let mut config: DefaultCreditConfig = self
            .get(cf::DEFAULT_CREDIT_CONFIGS, &keys::uuid_key(id.as_uuid()))?
            .ok_or_else(|| StoreError::not_found("default credit config", id))?;
        config.apply_patch(patch)?;

        let mut rows = if patch.activates() {
            self.deactivated_configs(Some(id))?
        } else {
            Vec::new()
        };
        rows.push(config.clone());
        self.put_configs(&rows)?;
        Ok(config)
    }

    async fn delete_default_credit_config(&self, id: &ConfigId) -> Result<()> {
        let _guard = self.config_lock.lock().await;
        let key = keys::uuid_key(id.as_uuid());
        if self.get_raw(cf::DEFAULT_CREDIT_CONFIGS, &key)?.is_none() {
            return Err(StoreError::not_found("default credit config", id));
        }
        let cf_configs = self.cf(cf::DEFAULT_CREDIT_CONFIGS)?;
        self.db.delete_cf(&cf_configs, key).map_err(db_err)
    }
}
