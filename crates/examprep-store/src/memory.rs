//! In-memory storage implementation.
//!
//! All tables live behind a single `tokio::sync::Mutex`, so every trait
//! method runs as one atomic unit. Compound operations validate everything
//! before the first write, which gives them the same all-or-nothing outcome
//! as a database transaction.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use examprep_core::{
    ConfigId, CreditTransaction, DefaultCreditConfig, DefaultCreditConfigPatch, GenerationJob,
    GenerationStatus, JobId, LedgerEntry, LedgerReceipt, Paper, PaperId, PaperQuestion,
    TransactionType, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::idempotency::{refund_once, LedgerKey};
use crate::{Store, WELCOME_CREDITS_NOTE};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    /// Append-only, in insertion order.
    transactions: Vec<CreditTransaction>,
    ledger_keys: HashSet<LedgerKey>,
    papers: HashMap<PaperId, Paper>,
    jobs: HashMap<JobId, GenerationJob>,
    /// In insertion order.
    configs: Vec<DefaultCreditConfig>,
}

impl Tables {
    fn apply(&mut self, entry: &LedgerEntry) -> Result<LedgerReceipt> {
        let mut account = self
            .users
            .get(&entry.user_id)
            .map(User::account)
            .ok_or_else(|| StoreError::not_found("user", entry.user_id))?;

        let keys = LedgerKey::for_entry(entry);
        if let Some(taken) = keys.iter().find(|key| self.ledger_keys.contains(key)) {
            return Err(taken.duplicate());
        }

        let previous_balance = account.balance;
        let transaction = entry.apply(&mut account)?;

        if let Some(user) = self.users.get_mut(&entry.user_id) {
            user.set_account(&account);
        }
        self.ledger_keys.extend(keys);
        self.transactions.push(transaction.clone());

        Ok(LedgerReceipt::new(previous_balance, transaction))
    }

    fn pending_job(&self, job_id: &JobId) -> Result<&GenerationJob> {
        let job = self
            .jobs
            .get(job_id)
            .ok_or_else(|| StoreError::not_found("job", job_id))?;
        if job.status.is_terminal() {
            return Err(StoreError::Conflict(format!(
                "job {job_id} already {}",
                job.status
            )));
        }
        Ok(job)
    }

    fn set_status(&mut self, job_id: &JobId, status: GenerationStatus, error: Option<&str>) {
        let now = Utc::now();
        let mut paper_id = None;
        if let Some(job) = self.jobs.get_mut(job_id) {
            job.status = status;
            if let Some(error) = error {
                job.error = Some(error.to_string());
            }
            job.updated_at = now;
            paper_id = Some(job.paper_id);
        }
        if let Some(paper) = paper_id.and_then(|id| self.papers.get_mut(&id)) {
            paper.status = status;
            paper.updated_at = now;
        }
    }
}

/// In-memory [`Store`] for tests and local development.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn page<T>(items: impl Iterator<Item = T>, limit: usize, offset: usize) -> Vec<T> {
    items.skip(offset).take(limit).collect()
}

#[async_trait]
impl Store for MemoryStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    async fn create_user(&self, user: &User, initial_credits: i64) -> Result<User> {
        if initial_credits < 0 {
            return Err(StoreError::InvalidAmount(format!(
                "initial credits must be non-negative, got {initial_credits}"
            )));
        }

        let mut tables = self.tables.lock().await;
        if tables.users.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("user {} already exists", user.id)));
        }
        let taken = tables.users.values().any(|existing| {
            (user.email.is_some() && existing.email == user.email)
                || (user.phone.is_some() && existing.phone == user.phone)
        });
        if taken {
            return Err(StoreError::Conflict(
                "email or phone already registered".into(),
            ));
        }

        let mut stored = user.clone();
        stored.credit_balance = 0;
        stored.total_credits_purchased = 0;
        tables.users.insert(stored.id, stored);

        if initial_credits > 0 {
            let entry = LedgerEntry::credit(user.id, TransactionType::Bonus, initial_credits)
                .with_notes(WELCOME_CREDITS_NOTE);
            tables.apply(&entry)?;
        }

        tables
            .users
            .get(&user.id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", user.id))
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.phone.as_deref() == Some(phone))
            .cloned())
    }

    async fn list_users(&self, limit: usize, offset: usize) -> Result<Vec<User>> {
        let tables = self.tables.lock().await;
        let mut users: Vec<&User> = tables.users.values().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(page(users.into_iter().cloned(), limit, offset))
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(self.tables.lock().await.users.len() as u64)
    }

    async fn update_user_profile(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .users
            .get_mut(&user.id)
            .ok_or_else(|| StoreError::not_found("user", user.id))?;
        stored.full_name.clone_from(&user.full_name);
        stored.is_active = user.is_active;
        stored.last_login_at = user.last_login_at;
        stored.updated_at = Utc::now();
        Ok(())
    }

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    async fn apply_ledger_entry(&self, entry: &LedgerEntry) -> Result<LedgerReceipt> {
        self.tables.lock().await.apply(entry)
    }

    async fn get_balance(&self, user_id: &UserId) -> Result<i64> {
        let tables = self.tables.lock().await;
        Ok(tables.users.get(user_id).map_or(0, |u| u.credit_balance))
    }

    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let tables = self.tables.lock().await;
        let newest_first = tables
            .transactions
            .iter()
            .rev()
            .filter(|tx| tx.user_id == *user_id)
            .cloned();
        Ok(page(newest_first, limit, offset))
    }

    async fn count_transactions(&self, user_id: &UserId) -> Result<u64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .transactions
            .iter()
            .filter(|tx| tx.user_id == *user_id)
            .count() as u64)
    }

    async fn find_transaction_by_payment_id(
        &self,
        razorpay_payment_id: &str,
    ) -> Result<Option<CreditTransaction>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .transactions
            .iter()
            .find(|tx| {
                tx.payment
                    .as_ref()
                    .and_then(|p| p.razorpay_payment_id.as_deref())
                    == Some(razorpay_payment_id)
            })
            .cloned())
    }

    async fn ledger_totals(&self, user_id: &UserId) -> Result<(i64, i64)> {
        let tables = self.tables.lock().await;
        let user = tables
            .users
            .get(user_id)
            .ok_or_else(|| StoreError::not_found("user", user_id))?;
        let sum = tables
            .transactions
            .iter()
            .filter(|tx| tx.user_id == *user_id)
            .map(|tx| tx.credits_change)
            .sum();
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
        let mut tables = self.tables.lock().await;
        if tables.papers.contains_key(&paper.id) {
            return Err(StoreError::Conflict(format!("paper {} already exists", paper.id)));
        }
        if tables.jobs.contains_key(&job.id) {
            return Err(StoreError::Conflict(format!("job {} already exists", job.id)));
        }

        let receipt = tables.apply(entry)?;
        tables.papers.insert(paper.id, paper.clone());
        tables.jobs.insert(job.id, job.clone());
        Ok(receipt)
    }

    async fn complete_generation(
        &self,
        job_id: &JobId,
        questions: &[PaperQuestion],
    ) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let paper_id = tables.pending_job(job_id)?.paper_id;
        let paper = tables
            .papers
            .get_mut(&paper_id)
            .ok_or_else(|| StoreError::not_found("paper", paper_id))?;
        paper.questions = questions.to_vec();
        tables.set_status(job_id, GenerationStatus::Done, None);
        Ok(())
    }

    async fn record_job_attempt(&self, job_id: &JobId, error: &str) -> Result<u32> {
        let mut tables = self.tables.lock().await;
        let job = tables
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::not_found("job", job_id))?;
        job.attempts += 1;
        job.error = Some(error.to_string());
        job.updated_at = Utc::now();
        Ok(job.attempts)
    }

    async fn fail_generation(
        &self,
        job_id: &JobId,
        error: &str,
        refund: &LedgerEntry,
    ) -> Result<Option<LedgerReceipt>> {
        let mut tables = self.tables.lock().await;
        let paper_id = tables.pending_job(job_id)?.paper_id;
        if refund.related_paper_id != Some(paper_id) {
            return Err(StoreError::InvalidInput(format!(
                "refund is not keyed by paper {paper_id}"
            )));
        }

        let receipt = refund_once(tables.apply(refund))?;
        tables.set_status(job_id, GenerationStatus::Failed, Some(error));
        Ok(receipt)
    }

    async fn get_paper(&self, paper_id: &PaperId) -> Result<Option<Paper>> {
        Ok(self.tables.lock().await.papers.get(paper_id).cloned())
    }

    async fn list_papers(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Paper>> {
        let tables = self.tables.lock().await;
        let mut papers: Vec<&Paper> = tables
            .papers
            .values()
            .filter(|p| p.user_id == *user_id)
            .collect();
        papers.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(page(papers.into_iter().cloned(), limit, offset))
    }

    async fn count_papers(&self, user_id: &UserId) -> Result<u64> {
        let tables = self.tables.lock().await;
        Ok(tables.papers.values().filter(|p| p.user_id == *user_id).count() as u64)
    }

    async fn get_job(&self, job_id: &JobId) -> Result<Option<GenerationJob>> {
        Ok(self.tables.lock().await.jobs.get(job_id).cloned())
    }

    async fn list_pending_jobs(&self) -> Result<Vec<GenerationJob>> {
        let tables = self.tables.lock().await;
        let mut jobs: Vec<_> = tables
            .jobs
            .values()
            .filter(|j| j.status == GenerationStatus::Pending)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(jobs)
    }

    // =========================================================================
    // Default Credit Configuration
    // =========================================================================

    async fn activate_default_credit_config(&self, config: &DefaultCreditConfig) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        for existing in tables.configs.iter_mut().filter(|c| c.is_active) {
            existing.is_active = false;
            existing.updated_at = now;
        }
        let mut active = config.clone();
        active.is_active = true;
        tables.configs.push(active);
        Ok(())
    }

    async fn insert_default_credit_config(&self, config: &DefaultCreditConfig) -> Result<()> {
        if config.is_active {
            return Err(StoreError::InvalidInput(
                "active configurations must be activated, not inserted".into(),
            ));
        }
        self.tables.lock().await.configs.push(config.clone());
        Ok(())
    }

    async fn get_active_default_credit_config(&self) -> Result<Option<DefaultCreditConfig>> {
        let tables = self.tables.lock().await;
        Ok(tables.configs.iter().find(|c| c.is_active).cloned())
    }

    async fn get_default_credit_config(
        &self,
        id: &ConfigId,
    ) -> Result<Option<DefaultCreditConfig>> {
        let tables = self.tables.lock().await;
        Ok(tables.configs.iter().find(|c| c.id == *id).cloned())
    }

    async fn list_default_credit_configs(&self, limit: usize) -> Result<Vec<DefaultCreditConfig>> {
        let tables = self.tables.lock().await;
        Ok(tables.configs.iter().rev().take(limit).cloned().collect())
    }

    async fn update_default_credit_config(
        &self,
        id: &ConfigId,
        patch: &DefaultCreditConfigPatch,
    ) -> Result<DefaultCreditConfig> {
        let mut tables = self.tables.lock().await;
        let index = tables
            .configs
            .iter()
            .position(|c| c.id == *id)
            .ok_or_else(|| StoreError::not_found("default credit config", id))?;

        let mut updated = tables.configs[index].clone();
        updated.apply_patch(patch)?;

        if patch.activates() {
            let now = Utc::now();
            for other in tables
                .configs
                .iter_mut()
                .filter(|c| c.is_active && c.id != *id)
            {
                other.is_active = false;
                other.updated_at = now;
            }
        }
        tables.configs[index] = updated.clone();
        Ok(updated)
    }

    async fn delete_default_credit_config(&self, id: &ConfigId) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let index = tables
            .configs
            .iter()
            .position(|c| c.id == *id)
            .ok_or_else(|| StoreError::not_found("default credit config", id))?;
        tables.configs.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use examprep_core::{LedgerIntegrity, PaymentDetails};

    async fn student(store: &MemoryStore, credits: i64) -> User {
        let user = User::new_student(None, None, "S".into());
        store.create_user(&user, credits).await.unwrap()
    }

    fn pending(user_id: UserId) -> (Paper, GenerationJob) {
        let paper = Paper::pending(PaperId::generate(), user_id, "Kinematics".into());
        let job = GenerationJob::pending(JobId::generate(), &paper);
        (paper, job)
    }

    #[tokio::test]
    async fn welcome_credits_are_a_bonus_transaction() {
        let store = MemoryStore::new();
        let user = student(&store, 10).await;

        assert_eq!(user.credit_balance, 10);
        let txs = store.list_transactions(&user.id, 10, 0).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].transaction_type, TransactionType::Bonus);
        assert_eq!(txs[0].notes.as_deref(), Some(WELCOME_CREDITS_NOTE));

        let (stored, sum) = store.ledger_totals(&user.id).await.unwrap();
        assert!(LedgerIntegrity::new(stored, sum).is_valid);
    }

    #[tokio::test]
    async fn duplicate_contact_is_a_conflict() {
        let store = MemoryStore::new();
        let first = User::new_student(Some("a@x.io".into()), None, "A".into());
        store.create_user(&first, 0).await.unwrap();

        let second = User::new_student(Some("a@x.io".into()), None, "B".into());
        let result = store.create_user(&second, 0).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(store.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn deduction_without_credits_changes_nothing() {
        let store = MemoryStore::new();
        let user = student(&store, 0).await;

        let entry = LedgerEntry::paper_deduction(user.id, PaperId::generate());
        let result = store.apply_ledger_entry(&entry).await;

        assert!(matches!(
            result,
            Err(StoreError::InsufficientCredits {
                balance: 0,
                required: 1
            })
        ));
        assert_eq!(store.count_transactions(&user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_user_has_zero_balance_but_no_totals() {
        let store = MemoryStore::new();
        let ghost = UserId::generate();
        assert_eq!(store.get_balance(&ghost).await.unwrap(), 0);
        assert!(matches!(
            store.ledger_totals(&ghost).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store
                .apply_ledger_entry(&LedgerEntry::credit(ghost, TransactionType::Bonus, 1))
                .await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn paper_is_paid_for_once() {
        let store = MemoryStore::new();
        let user = student(&store, 5).await;
        let paper = PaperId::generate();

        store
            .apply_ledger_entry(&LedgerEntry::paper_deduction(user.id, paper))
            .await
            .unwrap();
        let again = store
            .apply_ledger_entry(&LedgerEntry::paper_deduction(user.id, paper))
            .await;

        assert!(matches!(
            again,
            Err(StoreError::DuplicateEntry {
                kind: "deduction",
                ..
            })
        ));
        assert_eq!(store.get_balance(&user.id).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn payment_is_credited_once() {
        let store = MemoryStore::new();
        let user = student(&store, 0).await;
        let payment = PaymentDetails {
            razorpay_payment_id: Some("pay_1".into()),
            amount_paise: Some(49_900),
            status: Some("captured".into()),
            gateway_id: None,
        };
        let entry = LedgerEntry::credit(user.id, TransactionType::Purchase, 50)
            .with_payment(payment);

        store.apply_ledger_entry(&entry).await.unwrap();
        assert!(store.apply_ledger_entry(&entry).await.is_err());

        let found = store.find_transaction_by_payment_id("pay_1").await.unwrap();
        assert_eq!(found.map(|tx| tx.credits_change), Some(50));
        let user = store.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(user.total_credits_purchased, 50);
    }

    #[tokio::test]
    async fn transactions_are_listed_newest_first() {
        let store = MemoryStore::new();
        let user = student(&store, 0).await;
        for amount in 1..=3 {
            store
                .apply_ledger_entry(&LedgerEntry::credit(user.id, TransactionType::Bonus, amount))
                .await
                .unwrap();
        }

        let txs = store.list_transactions(&user.id, 2, 0).await.unwrap();
        assert_eq!(
            txs.iter().map(|tx| tx.credits_change).collect::<Vec<_>>(),
            vec![3, 2]
        );
        let rest = store.list_transactions(&user.id, 2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].balance_after, 1);
    }

    #[tokio::test]
    async fn concurrent_deductions_never_overdraw() {
        let store = Arc::new(MemoryStore::new());
        let user_id = student(&store, 10).await.id;

        let mut handles = Vec::new();
        for _ in 0..25 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .apply_ledger_entry(&LedgerEntry::paper_deduction(
                        user_id,
                        PaperId::generate(),
                    ))
                    .await
                    .is_ok()
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 10);
        assert_eq!(store.get_balance(&user_id).await.unwrap(), 0);
        let (stored, sum) = store.ledger_totals(&user_id).await.unwrap();
        assert_eq!(stored, sum);
    }

    #[tokio::test]
    async fn begin_generation_is_all_or_nothing() {
        let store = MemoryStore::new();
        let user = student(&store, 0).await;
        let (paper, job) = pending(user.id);

        let result = store
            .begin_generation(&LedgerEntry::paper_deduction(user.id, paper.id), &paper, &job)
            .await;

        assert!(matches!(result, Err(StoreError::InsufficientCredits { .. })));
        assert!(store.get_paper(&paper.id).await.unwrap().is_none());
        assert!(store.get_job(&job.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_generation_refunds_once() {
        let store = MemoryStore::new();
        let user = student(&store, 2).await;
        let (paper, job) = pending(user.id);

        let receipt = store
            .begin_generation(&LedgerEntry::paper_deduction(user.id, paper.id), &paper, &job)
            .await
            .unwrap();
        assert_eq!(receipt.new_balance, 1);

        assert_eq!(store.record_job_attempt(&job.id, "timeout").await.unwrap(), 1);
        let refund = LedgerEntry::paper_refund(user.id, paper.id);
        let receipt = store
            .fail_generation(&job.id, "timeout", &refund)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receipt.new_balance, 2);

        let job = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(job.status, GenerationStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("timeout"));
        let paper = store.get_paper(&paper.id).await.unwrap().unwrap();
        assert_eq!(paper.status, GenerationStatus::Failed);

        let again = store.fail_generation(&job.id, "timeout", &refund).await;
        assert!(matches!(again, Err(StoreError::Conflict(_))));
        assert_eq!(store.get_balance(&user.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn failing_an_already_refunded_paper_closes_the_job() {
        let store = MemoryStore::new();
        let user = student(&store, 1).await;
        let (paper, job) = pending(user.id);
        store
            .begin_generation(&LedgerEntry::paper_deduction(user.id, paper.id), &paper, &job)
            .await
            .unwrap();

        let refund = LedgerEntry::paper_refund(user.id, paper.id);
        store.apply_ledger_entry(&refund).await.unwrap();

        let receipt = store.fail_generation(&job.id, "down", &refund).await.unwrap();
        assert!(receipt.is_none());
        assert_eq!(store.get_balance(&user.id).await.unwrap(), 1);
        assert_eq!(store.count_transactions(&user.id).await.unwrap(), 3);

        let job = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(job.status, GenerationStatus::Failed);
        let paper = store.get_paper(&paper.id).await.unwrap().unwrap();
        assert_eq!(paper.status, GenerationStatus::Failed);
        assert!(store.list_pending_jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_pending_jobs_are_listed() {
        let store = MemoryStore::new();
        let user = student(&store, 2).await;
        let (first, first_job) = pending(user.id);
        let (second, second_job) = pending(user.id);
        for (paper, job) in [(&first, &first_job), (&second, &second_job)] {
            store
                .begin_generation(&LedgerEntry::paper_deduction(user.id, paper.id), paper, job)
                .await
                .unwrap();
        }
        store
            .fail_generation(&first_job.id, "down", &LedgerEntry::paper_refund(user.id, first.id))
            .await
            .unwrap();

        let pending_jobs = store.list_pending_jobs().await.unwrap();
        assert_eq!(pending_jobs.len(), 1);
        assert_eq!(pending_jobs[0].id, second_job.id);
    }

    #[tokio::test]
    async fn completed_generation_stores_questions() {
        let store = MemoryStore::new();
        let user = student(&store, 1).await;
        let (paper, job) = pending(user.id);
        store
            .begin_generation(&LedgerEntry::paper_deduction(user.id, paper.id), &paper, &job)
            .await
            .unwrap();

        let questions = vec![PaperQuestion {
            question_text: "2 + 2?".into(),
            options: vec!["3".into(), "4".into()],
            correct_answer: "4".into(),
        }];
        store.complete_generation(&job.id, &questions).await.unwrap();

        let paper = store.get_paper(&paper.id).await.unwrap().unwrap();
        assert_eq!(paper.status, GenerationStatus::Done);
        assert_eq!(paper.questions, questions);
        assert_eq!(store.list_papers(&user.id, 10, 0).await.unwrap().len(), 1);
        assert!(store.complete_generation(&job.id, &questions).await.is_err());
    }

    #[tokio::test]
    async fn single_active_default_config() {
        let store = MemoryStore::new();
        let first = DefaultCreditConfig::new(10, None, true, None).unwrap();
        let second = DefaultCreditConfig::new(20, None, true, None).unwrap();
        store.activate_default_credit_config(&first).await.unwrap();
        store.activate_default_credit_config(&second).await.unwrap();

        let active = store.get_active_default_credit_config().await.unwrap().unwrap();
        assert_eq!(active.id, second.id);

        let patch = DefaultCreditConfigPatch {
            is_active: Some(true),
            ..DefaultCreditConfigPatch::default()
        };
        store
            .update_default_credit_config(&first.id, &patch)
            .await
            .unwrap();

        let configs = store.list_default_credit_configs(10).await.unwrap();
        assert_eq!(configs.iter().filter(|c| c.is_active).count(), 1);
        let active = store.get_active_default_credit_config().await.unwrap().unwrap();
        assert_eq!(active.id, first.id);
    }

    #[tokio::test]
    async fn delete_missing_config_is_not_found() {
        let store = MemoryStore::new();
        let result = store.delete_default_credit_config(&ConfigId::generate()).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }
}
