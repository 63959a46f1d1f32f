//! Idempotency keys for ledger entries.
//!
//! A paper is paid for at most once and refunded at most once, and a
//! captured payment is credited at most once. Every backend checks these
//! keys under the same lock that guards the balance update.

use examprep_core::{LedgerEntry, LedgerReceipt, PaperId, TransactionType};

use crate::error::Result;
use crate::StoreError;

/// A key that may appear on at most one ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LedgerKey {
    /// The deduction paying for a paper.
    PaperDeduction(PaperId),
    /// The refund for a paper.
    PaperRefund(PaperId),
    /// A gateway payment ID.
    Payment(String),
}

impl LedgerKey {
    /// Keys carried by `entry`.
    #[must_use]
    pub fn for_entry(entry: &LedgerEntry) -> Vec<Self> {
        let mut keys = Vec::new();
        match (entry.transaction_type, entry.related_paper_id) {
            (TransactionType::Deduction, Some(paper_id)) => {
                keys.push(Self::PaperDeduction(paper_id));
            }
            (TransactionType::Refund, Some(paper_id)) => keys.push(Self::PaperRefund(paper_id)),
            _ => {}
        }
        if let Some(payment_id) = entry
            .payment
            .as_ref()
            .and_then(|p| p.razorpay_payment_id.as_ref())
        {
            keys.push(Self::Payment(payment_id.clone()));
        }
        keys
    }

    /// Short name of the key kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PaperDeduction(_) => "deduction",
            Self::PaperRefund(_) => "refund",
            Self::Payment(_) => "payment",
        }
    }

    /// The key value as a string.
    #[must_use]
    pub fn value(&self) -> String {
        match self {
            Self::PaperDeduction(id) | Self::PaperRefund(id) => id.to_string(),
            Self::Payment(id) => id.clone(),
        }
    }

    /// Storage encoding: `kind:value`.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        format!("{}:{}", self.kind(), self.value()).into_bytes()
    }

    /// The error reported when this key is already taken.
    #[must_use]
    pub fn duplicate(&self) -> StoreError {
        StoreError::DuplicateEntry {
            kind: self.kind(),
            key: self.value(),
        }
    }
}

/// Result of refunding a paper while closing its failed job.
///
/// A refund already on the ledger for the paper (an admin refund issued while
/// the job was retrying) is `None`: the job still closes, and the user is not
/// refunded twice.
pub(crate) fn refund_once(result: Result<LedgerReceipt>) -> Result<Option<LedgerReceipt>> {
    match result {
        Ok(receipt) => Ok(Some(receipt)),
        Err(StoreError::DuplicateEntry { kind: "refund", .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examprep_core::{PaymentDetails, UserId};

    #[test]
    fn deduction_and_refund_keys_are_distinct() {
        let user = UserId::generate();
        let paper = PaperId::generate();
        let deduction = LedgerKey::for_entry(&LedgerEntry::paper_deduction(user, paper));
        let refund = LedgerKey::for_entry(&LedgerEntry::paper_refund(user, paper));

        assert_eq!(deduction, vec![LedgerKey::PaperDeduction(paper)]);
        assert_eq!(refund, vec![LedgerKey::PaperRefund(paper)]);
        assert_ne!(deduction[0].encode(), refund[0].encode());
    }

    #[test]
    fn purchase_with_payment_id_is_keyed() {
        let entry = LedgerEntry::credit(UserId::generate(), TransactionType::Purchase, 10)
            .with_payment(PaymentDetails {
                razorpay_payment_id: Some("pay_ABC".into()),
                ..PaymentDetails::default()
            });
        let keys = LedgerKey::for_entry(&entry);
        assert_eq!(keys, vec![LedgerKey::Payment("pay_ABC".into())]);
        assert_eq!(keys[0].encode(), b"payment:pay_ABC".to_vec());
    }

    #[test]
    fn bonus_without_paper_has_no_keys() {
        let entry = LedgerEntry::credit(UserId::generate(), TransactionType::Bonus, 5);
        assert!(LedgerKey::for_entry(&entry).is_empty());
    }
}
