//! Paylio Core Library
//!
//! Shared functionality for the Paylio subscription review tool:
//! - Validated transaction model with a single dirty-data boundary
//! - Recurrence detector (pure, deterministic)
//! - Subscription ledger with the approve/deny state machine
//! - Transaction sources (Plaid-style HTTP proxy, local fixtures)

pub mod detect;
pub mod error;
pub mod ledger;
pub mod models;
pub mod source;

pub use detect::{detect, normalize_merchant, DetectionConfig};
pub use error::{Error, Result};
pub use ledger::{Ledger, MergePolicy, Metrics};
pub use models::{
    round_cents, total_spend, Category, DetectedSubscription, Frequency, PlaidTransaction,
    SubscriptionStatus, Transaction,
};
pub use source::{FailingSource, FixtureSource, PlaidSource, TransactionSource};
