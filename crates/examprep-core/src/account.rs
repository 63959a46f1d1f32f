//! User and credit account types.
//!
//! A [`User`] carries the credit balance, but callers never write it
//! directly: every balance change goes through a [`crate::LedgerEntry`]
//! applied to the user's [`CreditAccount`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The user ID.
    pub id: UserId,

    /// Email address, if the user registered by email.
    pub email: Option<String>,

    /// Normalised phone number (`+<country><number>`), if registered by phone.
    pub phone: Option<String>,

    /// Display name.
    pub full_name: String,

    /// Role of the user.
    pub user_type: UserType,

    /// Inactive users have not completed their first OTP verification yet.
    pub is_active: bool,

    /// Current credit balance.
    pub credit_balance: i64,

    /// Lifetime credits bought through purchases.
    pub total_credits_purchased: i64,

    /// Last successful login.
    pub last_login_at: Option<DateTime<Utc>>,

    /// When the user was created.
    pub created_at: DateTime<Utc>,

    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new, inactive student with a zero balance.
    #[must_use]
    pub fn new_student(email: Option<String>, phone: Option<String>, full_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::generate(),
            email,
            phone,
            full_name,
            user_type: UserType::Student,
            is_active: false,
            credit_balance: 0,
            total_credits_purchased: 0,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Snapshot of the balance fields the ledger operates on.
    #[must_use]
    pub fn account(&self) -> CreditAccount {
        CreditAccount {
            user_id: self.id,
            balance: self.credit_balance,
            total_purchased: self.total_credits_purchased,
        }
    }

    /// Copy balance fields back from an account the ledger has updated.
    pub fn set_account(&mut self, account: &CreditAccount) {
        self.credit_balance = account.balance;
        self.total_credits_purchased = account.total_purchased;
        self.updated_at = Utc::now();
    }
}

/// The balance fields of a user, as seen by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAccount {
    /// Owner of the balance.
    pub user_id: UserId,
    /// Current balance.
    pub balance: i64,
    /// Lifetime purchased credits.
    pub total_purchased: i64,
}

impl CreditAccount {
    /// An empty account.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            balance: 0,
            total_purchased: 0,
        }
    }

    /// Check whether the account can pay `amount` credits.
    #[must_use]
    pub const fn has_sufficient_credits(&self, amount: i64) -> bool {
        self.balance >= amount
    }
}

/// User roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    /// A student generating papers.
    Student,
    /// Platform administrator.
    Admin,
    /// Content manager with admin dashboard access.
    ContentManager,
}

impl UserType {
    /// Database / wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Admin => "admin",
            Self::ContentManager => "content_manager",
        }
    }

    /// Whether this role may use admin endpoints.
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        matches!(self, Self::Admin | Self::ContentManager)
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "admin" => Ok(Self::Admin),
            "content_manager" => Ok(Self::ContentManager),
            other => Err(format!("unknown user type: {other}")),
        }
    }
}
