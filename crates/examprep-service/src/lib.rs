//! ExamPrep HTTP API service.
//!
//! This crate provides the HTTP API for the exam-preparation backend, including:
//!
//! - Student sign-in by OTP, with JWT access and refresh tokens
//! - Credit balance, transaction history and ledger reconciliation
//! - Paid paper generation with automatic refunds on failure
//! - Default-credit configuration for new students
//! - Razorpay payment webhooks
//!
//! # Authentication
//!
//! The service supports three authentication methods:
//!
//! 1. **Bearer access tokens** - For students (and staff) after OTP sign-in
//! 2. **Service API keys** - For internal services deducting credits
//! 3. **Admin API key** - For the admin dashboard, alongside staff tokens

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers need async for consistency

pub mod auth;
pub mod config;
pub mod credits;
pub mod crypto;
pub mod default_credits;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod notify;
pub mod otp;
pub mod pagination;
pub mod papers;
pub mod routes;
pub mod state;

pub use config::{ServiceConfig, StoreBackend};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
