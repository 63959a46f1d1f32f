//! ExamPrep Client SDK.
//!
//! This crate provides a client library for services and the dashboard
//! backend to interact with the examprep credit API.
//!
//! # Example
//!
//! ```no_run
//! use examprep_client::ExamPrepClient;
//! use examprep_core::UserId;
//!
//! # async fn example(user_id: UserId) -> Result<(), examprep_client::ClientError> {
//! let client = ExamPrepClient::new(
//!     "http://examprep.internal:8080",
//!     "your-service-api-key",
//! )?;
//!
//! // Charge one credit on the user's behalf
//! let outcome = client.deduct_credit(user_id, None, Some("Mock test")).await?;
//!
//! println!("New balance: {} credits", outcome.new_balance);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, ExamPrepClient};
pub use error::ClientError;
pub use types::*;
