//! Core types and ledger arithmetic for examprep.
//!
//! This crate provides the foundational types used throughout the platform:
//!
//! - **Identifiers**: `UserId`, `TransactionId`, `PaperId`, `JobId`, `ConfigId`
//! - **Accounts**: `User`, `UserType`, `CreditAccount`
//! - **Credits**: `CreditTransaction`, `TransactionType`, `PaymentDetails`
//! - **Ledger**: `LedgerEntry`, `LedgerReceipt`, `LedgerIntegrity`
//! - **Default credits**: `DefaultCreditConfig`
//! - **Papers**: `Paper`, `GenerationJob`, `PaperQuestion`
//!
//! # Credit unit
//!
//! **1 credit = 1 generated paper.** Balances are `i64` and only ever move
//! through a [`LedgerEntry`], which also produces the immutable
//! [`CreditTransaction`] describing the move. Payment amounts are integer
//! paise (1 INR = 100 paise).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod credits;
pub mod default_credit;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod paper;

pub use account::{CreditAccount, User, UserType};
pub use credits::{CreditTransaction, PaymentDetails, TransactionType};
pub use default_credit::{
    DefaultCreditConfig, DefaultCreditConfigPatch, FALLBACK_CREDITS_PER_NEW_STUDENT,
};
pub use error::{CreditError, Result};
pub use ids::{ConfigId, IdError, JobId, PaperId, TransactionId, UserId};
pub use ledger::{
    crosses_low_balance, LedgerEntry, LedgerIntegrity, LedgerReceipt, LOW_BALANCE_THRESHOLD,
};
pub use paper::{GenerationJob, GenerationStatus, Paper, PaperQuestion};
