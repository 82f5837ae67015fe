//! Transaction sources
//!
//! The detector only ever sees already-fetched data; fetching lives behind
//! the [`TransactionSource`] trait so the server and CLI can run against the
//! real aggregator or local fixtures. A fetch failure is always surfaced as
//! an error, never masked as an empty result.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{PlaidTransaction, Transaction};

/// Supplies validated transactions for a look-back window.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Fetch transactions for the last `window_days` days.
    ///
    /// An empty Vec means the window genuinely had no transactions; upstream
    /// failure is reported as [`Error::Source`].
    async fn fetch(&self, window_days: u32) -> Result<Vec<Transaction>>;
}

/// Response envelope from the Plaid proxy's transactions endpoint
#[derive(Debug, Deserialize)]
struct TransactionsResponse {
    #[serde(default)]
    transactions: Vec<PlaidTransaction>,
}

/// HTTP client for a Plaid-style transaction proxy.
///
/// Talks to `GET {base}/v1/plaid/transactions?days=N&count=M`. The base URL
/// is a constructor argument - there is no ambient endpoint configuration.
pub struct PlaidSource {
    client: reqwest::Client,
    base_url: String,
    /// Maximum records per fetch
    count: u32,
}

impl PlaidSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            count: 250,
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TransactionSource for PlaidSource {
    async fn fetch(&self, window_days: u32) -> Result<Vec<Transaction>> {
        let url = format!(
            "{}/v1/plaid/transactions?days={}&count={}",
            self.base_url, window_days, self.count
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Source(format!("fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Source(format!(
                "aggregator returned HTTP {}",
                response.status()
            )));
        }

        let payload: TransactionsResponse = response
            .json()
            .await
            .map_err(|e| Error::Source(format!("invalid response body: {}", e)))?;

        Ok(validate_batch(payload.transactions))
    }
}

/// Static in-memory source, used for offline CLI runs and tests.
pub struct FixtureSource {
    transactions: Vec<Transaction>,
}

impl FixtureSource {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    /// Load raw Plaid records from a JSON file (either a bare array or a
    /// `{"transactions": [...]}` envelope) and run them through the
    /// validation boundary.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&contents)?;
        let raw: Vec<PlaidTransaction> = if value.is_object() {
            serde_json::from_value::<TransactionsResponse>(value)?.transactions
        } else {
            serde_json::from_value(value)?
        };
        Ok(Self::new(validate_batch(raw)))
    }
}

#[async_trait]
impl TransactionSource for FixtureSource {
    async fn fetch(&self, _window_days: u32) -> Result<Vec<Transaction>> {
        Ok(self.transactions.clone())
    }
}

/// Source that always fails, for exercising the "source unavailable" path.
pub struct FailingSource {
    message: String,
}

impl FailingSource {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl TransactionSource for FailingSource {
    async fn fetch(&self, _window_days: u32) -> Result<Vec<Transaction>> {
        Err(Error::Source(self.message.clone()))
    }
}

/// Apply the validation boundary to a raw batch, logging how many records
/// were dropped. Dirty single records never fail the whole fetch.
fn validate_batch(raw: Vec<PlaidTransaction>) -> Vec<Transaction> {
    let total = raw.len();
    let valid: Vec<Transaction> = raw.into_iter().filter_map(Transaction::from_plaid).collect();

    let dropped = total - valid.len();
    if dropped > 0 {
        warn!(dropped, total, "Dropped malformed aggregator records");
    } else {
        debug!(total, "Validated aggregator batch");
    }

    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_fixture_source_returns_all() {
        let raw = serde_json::json!([
            {"transaction_id": "t1", "name": "Netflix", "date": "2024-03-01", "amount": -15.99},
            {"transaction_id": "t2", "name": "Bad", "date": "not-a-date", "amount": -5.00},
            {"transaction_id": "t3", "name": "Garbage", "date": "2024-03-02", "amount": "NaN"}
        ]);
        let records: Vec<PlaidTransaction> = serde_json::from_value(raw).unwrap();
        let source = FixtureSource::new(validate_batch(records));

        let txs = source.fetch(90).await.unwrap();
        assert_eq!(txs.len(), 1, "malformed records silently excluded");
        assert_eq!(txs[0].amount, dec!(-15.99));
    }

    #[tokio::test]
    async fn test_failing_source_is_distinct_from_empty() {
        let source = FailingSource::new("connection refused");
        let err = source.fetch(90).await.unwrap_err();
        assert!(matches!(err, Error::Source(_)));
    }

    #[test]
    fn test_validate_batch_keeps_credits() {
        let records = vec![PlaidTransaction {
            transaction_id: "t1".into(),
            name: Some("Refund".into()),
            date: Some("2024-03-01".into()),
            amount: Some(serde_json::json!(20.0)),
            pending: Some(true),
        }];
        let valid = validate_batch(records);
        // Credits pass validation; the detector filters them, not the source
        assert_eq!(valid.len(), 1);
        assert!(valid[0].pending);
    }
}
