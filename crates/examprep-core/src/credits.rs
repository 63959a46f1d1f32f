//! Credit transaction types.
//!
//! Every balance change produces exactly one immutable [`CreditTransaction`].
//! Transactions are append-only: nothing updates or deletes them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{PaperId, TransactionId, UserId};

/// An immutable record of a balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Unique transaction ID (ULID for time-ordering).
    pub id: TransactionId,

    /// The user whose balance was affected.
    pub user_id: UserId,

    /// Type of transaction.
    pub transaction_type: TransactionType,

    /// Signed change. Positive = credit, negative = debit.
    pub credits_change: i64,

    /// Balance after this transaction.
    pub balance_after: i64,

    /// Payment gateway metadata for purchases.
    pub payment: Option<PaymentDetails>,

    /// Paper this transaction paid for (deductions) or was returned for (refunds).
    pub related_paper_id: Option<PaperId>,

    /// Free-form note.
    pub notes: Option<String>,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    /// Whether this transaction removed credits.
    #[must_use]
    pub const fn is_deduction(&self) -> bool {
        self.transaction_type.is_debit()
    }

    /// Whether this transaction added credits.
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        self.transaction_type.is_credit()
    }
}

/// Payment metadata attached to purchase transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// Gateway-side order or payment link ID.
    pub gateway_id: Option<String>,
    /// Amount paid, in paise.
    pub amount_paise: Option<i64>,
    /// Gateway payment status (`captured`, `authorized`, ...).
    pub status: Option<String>,
    /// Razorpay payment ID, unique per captured payment.
    pub razorpay_payment_id: Option<String>,
}

impl PaymentDetails {
    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gateway_id.is_none()
            && self.amount_paise.is_none()
            && self.status.is_none()
            && self.razorpay_payment_id.is_none()
    }
}

/// Type of credit transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// User bought credits.
    Purchase,

    /// One credit spent on a generated paper.
    Deduction,

    /// Credit returned after a failed generation, or by an admin.
    Refund,

    /// Promotional, welcome or admin-granted credits.
    Bonus,
}

impl TransactionType {
    /// Check if this transaction type adds credits.
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        matches!(self, Self::Purchase | Self::Refund | Self::Bonus)
    }

    /// Check if this transaction type removes credits.
    #[must_use]
    pub const fn is_debit(&self) -> bool {
        matches!(self, Self::Deduction)
    }

    /// Database / wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Deduction => "deduction",
            Self::Refund => "refund",
            Self::Bonus => "bonus",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(Self::Purchase),
            "deduction" => Ok(Self::Deduction),
            "refund" => Ok(Self::Refund),
            "bonus" => Ok(Self::Bonus),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_type_is_credit_debit() {
        assert!(TransactionType::Purchase.is_credit());
        assert!(TransactionType::Refund.is_credit());
        assert!(TransactionType::Bonus.is_credit());
        assert!(!TransactionType::Deduction.is_credit());

        assert!(TransactionType::Deduction.is_debit());
        assert!(!TransactionType::Purchase.is_debit());
    }

    #[test]
    fn transaction_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&TransactionType::Deduction).unwrap(),
            "\"deduction\""
        );
        assert_eq!("refund".parse::<TransactionType>(), Ok(TransactionType::Refund));
        assert!("usage".parse::<TransactionType>().is_err());
    }

    #[test]
    fn empty_payment_details() {
        assert!(PaymentDetails::default().is_empty());
        let paid = PaymentDetails {
            razorpay_payment_id: Some("pay_1".into()),
            ..PaymentDetails::default()
        };
        assert!(!paid.is_empty());
    }
}
