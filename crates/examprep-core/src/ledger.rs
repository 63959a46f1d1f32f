//! Ledger arithmetic.
//!
//! A [`LedgerEntry`] describes one balance move. Storage backends lock the
//! user's row, load its [`CreditAccount`], call [`LedgerEntry::apply`] and
//! persist the updated account together with the returned transaction in a
//! single atomic write. The arithmetic and the sufficiency check live here so
//! that every backend behaves identically.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{CreditError, Result};
use crate::{
    CreditAccount, CreditTransaction, PaperId, PaymentDetails, TransactionId, TransactionType,
    UserId,
};

/// Balance at or below which a student is told to top up.
pub const LOW_BALANCE_THRESHOLD: i64 = 5;

/// Credits charged per generated paper.
pub const CREDITS_PER_PAPER: i64 = 1;

/// A requested balance move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Whose balance moves.
    pub user_id: UserId,
    /// Kind of move. Decides the sign of the delta.
    pub transaction_type: TransactionType,
    /// Unsigned amount, must be positive.
    pub amount: i64,
    /// Payment metadata for purchases.
    pub payment: Option<PaymentDetails>,
    /// Paper the move belongs to.
    pub related_paper_id: Option<PaperId>,
    /// Free-form note.
    pub notes: Option<String>,
}

impl LedgerEntry {
    /// A credit-adding entry (purchase, bonus or refund).
    #[must_use]
    pub const fn credit(user_id: UserId, transaction_type: TransactionType, amount: i64) -> Self {
        Self {
            user_id,
            transaction_type,
            amount,
            payment: None,
            related_paper_id: None,
            notes: None,
        }
    }

    /// The one-credit deduction paying for `paper_id`.
    #[must_use]
    pub const fn paper_deduction(user_id: UserId, paper_id: PaperId) -> Self {
        Self {
            user_id,
            transaction_type: TransactionType::Deduction,
            amount: CREDITS_PER_PAPER,
            payment: None,
            related_paper_id: Some(paper_id),
            notes: None,
        }
    }

    /// The one-credit refund for a paper whose generation failed.
    #[must_use]
    pub const fn paper_refund(user_id: UserId, paper_id: PaperId) -> Self {
        Self {
            user_id,
            transaction_type: TransactionType::Refund,
            amount: CREDITS_PER_PAPER,
            payment: None,
            related_paper_id: Some(paper_id),
            notes: None,
        }
    }

    /// Attach a note.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Attach payment metadata. Empty details are dropped.
    #[must_use]
    pub fn with_payment(mut self, payment: PaymentDetails) -> Self {
        self.payment = (!payment.is_empty()).then_some(payment);
        self
    }

    /// Attach the related paper.
    #[must_use]
    pub const fn with_paper(mut self, paper_id: PaperId) -> Self {
        self.related_paper_id = Some(paper_id);
        self
    }

    /// The signed delta this entry applies.
    #[must_use]
    pub const fn signed_delta(&self) -> i64 {
        if self.transaction_type.is_debit() {
            -self.amount
        } else {
            self.amount
        }
    }

    /// Apply the entry to `account` and return the transaction recording it.
    ///
    /// The account is only modified when the entry is valid.
    ///
    /// # Errors
    ///
    /// - [`CreditError::InvalidAmount`] if `amount <= 0` or the balance would overflow.
    /// - [`CreditError::InsufficientCredits`] if a deduction exceeds the balance.
    /// - [`CreditError::AccountMismatch`] if the account belongs to another user.
    pub fn apply(&self, account: &mut CreditAccount) -> Result<CreditTransaction> {
        if account.user_id != self.user_id {
            return Err(CreditError::AccountMismatch {
                entry: self.user_id.to_string(),
                account: account.user_id.to_string(),
            });
        }
        if self.amount <= 0 {
            return Err(CreditError::InvalidAmount(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        if self.transaction_type.is_debit() && !account.has_sufficient_credits(self.amount) {
            return Err(CreditError::InsufficientCredits {
                balance: account.balance,
                required: self.amount,
            });
        }

        let new_balance = account
            .balance
            .checked_add(self.signed_delta())
            .ok_or_else(|| CreditError::InvalidAmount("balance overflow".into()))?;
        let new_total_purchased = if self.transaction_type == TransactionType::Purchase {
            account
                .total_purchased
                .checked_add(self.amount)
                .ok_or_else(|| CreditError::InvalidAmount("purchase total overflow".into()))?
        } else {
            account.total_purchased
        };

        account.balance = new_balance;
        account.total_purchased = new_total_purchased;

        Ok(CreditTransaction {
            id: TransactionId::generate(),
            user_id: self.user_id,
            transaction_type: self.transaction_type,
            credits_change: self.signed_delta(),
            balance_after: new_balance,
            payment: self.payment.clone(),
            related_paper_id: self.related_paper_id,
            notes: self.notes.clone(),
            created_at: Utc::now(),
        })
    }
}

/// Outcome of an applied ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    /// The transaction that was appended.
    pub transaction: CreditTransaction,
    /// Balance before the move.
    pub previous_balance: i64,
    /// Balance after the move.
    pub new_balance: i64,
}

impl LedgerReceipt {
    /// Build a receipt from the account balance before the move and the transaction.
    #[must_use]
    pub fn new(previous_balance: i64, transaction: CreditTransaction) -> Self {
        Self {
            new_balance: transaction.balance_after,
            previous_balance,
            transaction,
        }
    }

    /// Whether this move took the balance from above `threshold` to at or below it.
    #[must_use]
    pub const fn crossed_low_balance(&self, threshold: i64) -> bool {
        crosses_low_balance(self.previous_balance, self.new_balance, threshold)
    }
}

/// True only when the balance drops from above `threshold` to at or below it.
///
/// A balance that was already low does not trigger again, so the
/// notification fires once per crossing.
#[must_use]
pub const fn crosses_low_balance(previous: i64, new: i64, threshold: i64) -> bool {
    previous > threshold && new <= threshold
}

/// Result of reconciling a stored balance with the transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerIntegrity {
    /// Whether the stored balance equals the sum of deltas.
    pub is_valid: bool,
    /// Balance stored on the user.
    pub current_balance: i64,
    /// Sum of every `credits_change` for the user.
    pub calculated_balance: i64,
    /// `current_balance - calculated_balance`.
    pub difference: i64,
}

impl LedgerIntegrity {
    /// Compare the stored balance with the sum of the log.
    #[must_use]
    pub const fn new(current_balance: i64, calculated_balance: i64) -> Self {
        Self {
            is_valid: current_balance == calculated_balance,
            current_balance,
            calculated_balance,
            difference: current_balance - calculated_balance,
        }
    }
}
