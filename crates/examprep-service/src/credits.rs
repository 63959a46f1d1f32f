//! Credit service: balances, deductions, top-ups, history and reconciliation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use examprep_core::ledger::CREDITS_PER_PAPER;
use examprep_core::{
    CreditTransaction, LedgerEntry, LedgerIntegrity, LedgerReceipt, PaperId, PaymentDetails,
    TransactionId, TransactionType, UserId, LOW_BALANCE_THRESHOLD,
};
use examprep_store::Store;

use crate::error::ApiError;
use crate::notify::Notifier;
use crate::pagination::{PageRequest, Pagination};

/// Default page size for transaction history.
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

/// A user's balance.
#[derive(Debug, Clone, Serialize)]
pub struct Balance {
    /// The user.
    pub user_id: UserId,
    /// Credits available.
    pub balance: i64,
}

/// Result of a deduction.
#[derive(Debug, Clone, Serialize)]
pub struct DeductionOutcome {
    /// Always true; failures are errors.
    pub success: bool,
    /// Balance after the deduction.
    pub new_balance: i64,
    /// Balance before the deduction.
    pub previous_balance: i64,
    /// The ledger row written.
    pub transaction_id: TransactionId,
    /// Whether this deduction crossed the low-credit threshold.
    pub should_notify: bool,
}

/// Credits to add to a user's balance.
#[derive(Debug, Clone, Deserialize)]
pub struct AddCredits {
    /// Whose balance grows.
    pub user_id: UserId,
    /// Positive number of credits.
    pub amount: i64,
    /// `purchase`, `bonus` or `refund`.
    pub transaction_type: TransactionType,
    /// Gateway metadata for purchases.
    #[serde(default)]
    pub payment: PaymentDetails,
    /// Paper the credit relates to (refunds).
    #[serde(default)]
    pub related_paper_id: Option<PaperId>,
    /// Free-form note.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of adding credits.
#[derive(Debug, Clone, Serialize)]
pub struct CreditOutcome {
    /// Always true; failures are errors.
    pub success: bool,
    /// Balance after the credit.
    pub new_balance: i64,
    /// The ledger row written.
    pub transaction_id: TransactionId,
}

/// One page of transaction history.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionPage {
    /// Transactions, newest first.
    pub transactions: Vec<CreditTransaction>,
    /// Page metadata.
    pub pagination: Pagination,
}

/// Balance operations on top of the ledger store.
pub struct CreditService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl CreditService {
    /// Create the service.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Current balance. Unknown users read as zero.
    pub async fn get_balance(&self, user_id: UserId) -> Result<Balance, ApiError> {
        let balance = self.store.get_balance(&user_id).await?;
        Ok(Balance { user_id, balance })
    }

    /// Deduct one credit, optionally keyed by the paper it pays for.
    ///
    /// A paper can only be paid for once; a second deduction for the same
    /// paper is rejected as a duplicate.
    pub async fn deduct_credit(
        &self,
        user_id: UserId,
        related_paper_id: Option<PaperId>,
        notes: Option<String>,
    ) -> Result<DeductionOutcome, ApiError> {
        let entry = LedgerEntry {
            user_id,
            transaction_type: TransactionType::Deduction,
            amount: CREDITS_PER_PAPER,
            payment: None,
            related_paper_id,
            notes: Some(notes.unwrap_or_else(|| "Paper generation".into())),
        };

        let receipt = self.store.apply_ledger_entry(&entry).await.map_err(|e| {
            tracing::info!(user_id = %user_id, error = %e, "Credit deduction rejected");
            ApiError::from(e)
        })?;
        let should_notify = self.notify_if_low(&receipt).await;

        tracing::info!(
            user_id = %user_id,
            previous_balance = receipt.previous_balance,
            new_balance = receipt.new_balance,
            "Credit deducted"
        );

        Ok(DeductionOutcome {
            success: true,
            new_balance: receipt.new_balance,
            previous_balance: receipt.previous_balance,
            transaction_id: receipt.transaction.id,
            should_notify,
        })
    }

    /// Add credits through a purchase, bonus or refund.
    pub async fn add_credits(&self, input: AddCredits) -> Result<CreditOutcome, ApiError> {
        if input.amount <= 0 {
            return Err(ApiError::InvalidAmount(
                "Amount must be a positive integer".into(),
            ));
        }
        if !input.transaction_type.is_credit() {
            return Err(ApiError::BadRequest(format!(
                "transaction type {} cannot add credits",
                input.transaction_type
            )));
        }

        let mut entry = LedgerEntry::credit(input.user_id, input.transaction_type, input.amount)
            .with_payment(input.payment);
        entry.related_paper_id = input.related_paper_id;
        entry.notes = input.notes;

        let receipt = self.store.apply_ledger_entry(&entry).await?;

        tracing::info!(
            user_id = %input.user_id,
            amount = input.amount,
            transaction_type = %input.transaction_type,
            new_balance = receipt.new_balance,
            "Credits added"
        );

        Ok(CreditOutcome {
            success: true,
            new_balance: receipt.new_balance,
            transaction_id: receipt.transaction.id,
        })
    }

    /// A page of the user's transactions, newest first.
    pub async fn get_transaction_history(
        &self,
        user_id: UserId,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<TransactionPage, ApiError> {
        let request = PageRequest::new(page, limit, DEFAULT_HISTORY_LIMIT)?;
        let transactions = self
            .store
            .list_transactions(&user_id, request.limit(), request.offset())
            .await?;
        let total = self.store.count_transactions(&user_id).await?;

        Ok(TransactionPage {
            transactions,
            pagination: request.paginate(total),
        })
    }

    /// Compare the stored balance with the sum of the transaction log.
    pub async fn verify_ledger_integrity(&self, user_id: UserId) -> Result<LedgerIntegrity, ApiError> {
        let (current, calculated) = self.store.ledger_totals(&user_id).await?;
        let integrity = LedgerIntegrity::new(current, calculated);
        if !integrity.is_valid {
            tracing::error!(
                user_id = %user_id,
                current_balance = current,
                calculated_balance = calculated,
                "Ledger integrity check failed"
            );
        }
        Ok(integrity)
    }

    /// Call the notifier when `receipt` crossed the low-credit threshold.
    /// Returns whether it did.
    pub(crate) async fn notify_if_low(&self, receipt: &LedgerReceipt) -> bool {
        let crossed = receipt.crossed_low_balance(LOW_BALANCE_THRESHOLD);
        if crossed {
            self.notifier
                .low_credit(receipt.transaction.user_id, receipt.new_balance)
                .await;
        }
        crossed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use examprep_core::User;
    use examprep_store::MemoryStore;

    use super::*;

    #[derive(Default)]
    struct RecordingNotifier {
        calls: Mutex<Vec<(UserId, i64)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn low_credit(&self, user_id: UserId, balance: i64) {
            self.calls.lock().unwrap().push((user_id, balance));
        }
    }

    async fn setup(initial: i64) -> (CreditService, Arc<RecordingNotifier>, UserId) {
        let store = Arc::new(MemoryStore::new());
        let user = User::new_student(Some("s@example.com".into()), None, "s".into());
        let user = store.create_user(&user, initial).await.unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let service = CreditService::new(store, notifier.clone());
        (service, notifier, user.id)
    }

    #[tokio::test]
    async fn deduction_notifies_once_on_crossing() {
        let (service, notifier, user_id) = setup(7).await;

        let first = service.deduct_credit(user_id, None, None).await.unwrap();
        assert_eq!((first.previous_balance, first.new_balance), (7, 6));
        assert!(!first.should_notify);

        let second = service.deduct_credit(user_id, None, None).await.unwrap();
        assert_eq!(second.new_balance, 5);
        assert!(second.should_notify);

        let third = service.deduct_credit(user_id, None, None).await.unwrap();
        assert!(!third.should_notify);

        assert_eq!(*notifier.calls.lock().unwrap(), vec![(user_id, 5)]);
    }

    #[tokio::test]
    async fn deduction_with_no_credits_is_payment_required() {
        let (service, _, user_id) = setup(0).await;
        let err = service.deduct_credit(user_id, None, None).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::InsufficientCredits {
                balance: 0,
                required: 1
            }
        ));
    }

    #[tokio::test]
    async fn same_paper_is_charged_once() {
        let (service, _, user_id) = setup(3).await;
        let paper = PaperId::generate();
        service.deduct_credit(user_id, Some(paper), None).await.unwrap();
        let err = service.deduct_credit(user_id, Some(paper), None).await.unwrap_err();
        assert!(matches!(err, ApiError::DuplicateEvent(_)));
        assert_eq!(service.get_balance(user_id).await.unwrap().balance, 2);
    }

    #[tokio::test]
    async fn add_credits_validates_amount_and_type() {
        let (service, _, user_id) = setup(0).await;
        let input = |amount, transaction_type| AddCredits {
            user_id,
            amount,
            transaction_type,
            payment: PaymentDetails::default(),
            related_paper_id: None,
            notes: None,
        };

        let err = service.add_credits(input(0, TransactionType::Bonus)).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidAmount(_)));

        let err = service
            .add_credits(input(5, TransactionType::Deduction))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let outcome = service.add_credits(input(25, TransactionType::Purchase)).await.unwrap();
        assert_eq!(outcome.new_balance, 25);
    }

    #[tokio::test]
    async fn history_paginates_newest_first() {
        let (service, _, user_id) = setup(10).await;
        for _ in 0..4 {
            service.deduct_credit(user_id, None, None).await.unwrap();
        }

        let page = service
            .get_transaction_history(user_id, Some(1), Some(2))
            .await
            .unwrap();
        assert_eq!(page.transactions.len(), 2);
        assert_eq!(page.transactions[0].balance_after, 6);
        assert_eq!(page.pagination.total, 5);
        assert_eq!(page.pagination.total_pages, 3);

        let last = service
            .get_transaction_history(user_id, Some(3), Some(2))
            .await
            .unwrap();
        assert_eq!(last.transactions.len(), 1);
        assert_eq!(last.transactions[0].transaction_type, TransactionType::Bonus);

        assert!(matches!(
            service.get_transaction_history(user_id, Some(0), None).await,
            Err(ApiError::InvalidPage)
        ));
    }

    #[tokio::test]
    async fn integrity_holds_after_mixed_activity() {
        let (service, _, user_id) = setup(10).await;
        service.deduct_credit(user_id, None, None).await.unwrap();
        service
            .add_credits(AddCredits {
                user_id,
                amount: 4,
                transaction_type: TransactionType::Refund,
                payment: PaymentDetails::default(),
                related_paper_id: None,
                notes: Some("goodwill".into()),
            })
            .await
            .unwrap();

        let integrity = service.verify_ledger_integrity(user_id).await.unwrap();
        assert!(integrity.is_valid);
        assert_eq!(integrity.current_balance, 13);
        assert_eq!(integrity.difference, 0);
    }

    #[tokio::test]
    async fn unknown_user_reads_zero_balance() {
        let (service, _, _) = setup(0).await;
        let balance = service.get_balance(UserId::generate()).await.unwrap();
        assert_eq!(balance.balance, 0);
    }
}
