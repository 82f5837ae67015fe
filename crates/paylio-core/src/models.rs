//! Data models for Paylio
//!
//! The wire-facing `PlaidTransaction` is deliberately loose (the aggregator
//! sends partial/dirty records); `Transaction` is the validated form the rest
//! of the crate works with. Conversion happens at a single boundary,
//! [`Transaction::from_plaid`].

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A raw transaction record as returned by the Plaid-style aggregator.
///
/// Every field except the id may be missing or malformed; malformed records
/// are excluded at the validation boundary rather than failing the fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaidTransaction {
    pub transaction_id: String,
    /// Free-text merchant description
    pub name: Option<String>,
    /// Calendar date as YYYY-MM-DD
    pub date: Option<String>,
    /// Negative = debit (spend), positive = credit. Kept as a raw JSON value
    /// so non-numeric garbage can be dropped instead of failing deserialization.
    pub amount: Option<serde_json::Value>,
    pub pending: Option<bool>,
}

/// A validated financial transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// Free-text merchant description (may be empty)
    pub merchant_label: String,
    pub date: NaiveDate,
    /// Negative = expense, positive = income
    pub amount: Decimal,
    /// Whether the charge has settled
    pub pending: bool,
}

impl Transaction {
    /// Validate a raw aggregator record.
    ///
    /// Returns `None` when the amount is missing/non-numeric or the date is
    /// unparseable. A missing merchant name becomes an empty label; the
    /// normalizer later maps that to the "unknown" merchant key.
    pub fn from_plaid(raw: PlaidTransaction) -> Option<Self> {
        let amount = raw
            .amount
            .as_ref()
            .and_then(|v| v.as_f64())
            .and_then(Decimal::from_f64)?;
        let date = raw
            .date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())?;

        Some(Self {
            id: raw.transaction_id,
            merchant_label: raw.name.unwrap_or_default(),
            date,
            amount,
            pending: raw.pending.unwrap_or(false),
        })
    }
}

/// Estimated subscription billing frequency.
///
/// Annual recurrence is indistinguishable from a one-off charge with only a
/// short look-back window, so there is no `Yearly` variant; sparse cadences
/// land in `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Weekly,
    Monthly,
    Unknown,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User-decision state for a detected subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Awaiting user review (initial state)
    Pending,
    /// User approved the charge
    Active,
    /// User denied the charge
    Denied,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Denied => "denied",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category tag. Placeholder for future categorization - detection only
/// ever emits `Recurring`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Recurring,
}

/// A detected recurring subscription charge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedSubscription {
    /// Deterministic key: normalized merchant + typical amount to the cent.
    /// Stable across re-runs on identical input.
    pub id: String,
    /// Display name, taken from one representative transaction
    pub merchant: String,
    /// Median absolute amount of the qualifying charge cluster (always positive)
    pub typical_amount: Decimal,
    pub frequency: Frequency,
    /// Last observed charge plus the frequency's nominal interval
    pub next_charge_estimate: NaiveDate,
    pub status: SubscriptionStatus,
    pub category: Category,
}

/// Round a currency amount half-up to the cent, keeping two decimal places
/// so ids and API payloads render "10.00" rather than "10".
pub fn round_cents(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Total spend for an already-windowed transaction list: the sum of the
/// absolute values of all debits. Credits/refunds are ignored.
pub fn total_spend(transactions: &[Transaction]) -> Decimal {
    transactions
        .iter()
        .filter(|tx| tx.amount < Decimal::ZERO)
        .map(|tx| tx.amount.abs())
        .sum()
}
