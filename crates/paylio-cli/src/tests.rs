//! CLI command tests

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use paylio_core::{
    Category, DetectedSubscription, FixtureSource, Frequency, SubscriptionStatus, Transaction,
};

use crate::commands::{self, format_subscription_row, truncate};

fn fixture_source() -> FixtureSource {
    let tx = |id: &str, merchant: &str, date: &str, amount| Transaction {
        id: id.to_string(),
        merchant_label: merchant.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        amount,
        pending: false,
    };
    FixtureSource::new(vec![
        tx("t1", "Netflix", "2024-01-02", dec!(-15.99)),
        tx("t2", "Netflix", "2024-02-01", dec!(-15.99)),
        tx("t3", "Diner", "2024-02-20", dec!(-23.40)),
    ])
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("Netflix", 20), "Netflix");
    assert_eq!(truncate("A Very Long Merchant Name Indeed", 10), "A Very Lo…");
}

#[test]
fn test_format_subscription_row() {
    let sub = DetectedSubscription {
        id: "netflix-15.99".to_string(),
        merchant: "Netflix".to_string(),
        typical_amount: dec!(15.99),
        frequency: Frequency::Monthly,
        next_charge_estimate: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        status: SubscriptionStatus::Pending,
        category: Category::Recurring,
    };

    let row = format_subscription_row(&sub);
    assert!(row.contains("Netflix"));
    assert!(row.contains("$15.99"));
    assert!(row.contains("Monthly"));
    assert!(row.contains("next 2024-03-02"));
}

#[tokio::test]
async fn test_cmd_detect_runs() {
    let source = fixture_source();
    let result = commands::cmd_detect(&source, 90, false).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_detect_json_output() {
    let source = fixture_source();
    let result = commands::cmd_detect(&source, 90, true).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_spend_runs() {
    let source = fixture_source();
    let result = commands::cmd_spend(&source, 30).await;
    assert!(result.is_ok());
}
