//! Recurrence detection
//!
//! Turns a flat transaction list into a list of detected subscriptions:
//! group debits by normalized merchant, keep clusters of similar amounts,
//! estimate cadence from the average gap between charges, and project the
//! next charge date.
//!
//! Detection is a pure batch computation: no I/O, no shared state, and the
//! same input always produces the same output (including ids and ordering).

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::models::{
    round_cents, Category, DetectedSubscription, Frequency, SubscriptionStatus, Transaction,
};

/// Detection thresholds, passed explicitly at call time.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Minimum qualifying charges before a cluster counts as recurring
    pub min_support: usize,
    /// Amount similarity band around the typical amount (0.20 = ±20%).
    /// Absorbs tax/tip jitter while rejecting unrelated charges that merely
    /// share a merchant name.
    pub amount_tolerance: Decimal,
    /// Average charge gap (days) below which a cluster is weekly
    pub weekly_max_avg_gap: f64,
    /// Average charge gap (days) below which a cluster is monthly
    pub monthly_max_avg_gap: f64,
    /// Nominal interval used to project the next weekly charge
    pub weekly_interval_days: i64,
    /// Nominal interval used to project the next monthly (and unknown) charge
    pub monthly_interval_days: i64,
    /// Average gap assumed when a cluster has no computable gap
    pub fallback_avg_gap: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_support: 2,
            amount_tolerance: dec!(0.20),
            weekly_max_avg_gap: 10.0,
            monthly_max_avg_gap: 45.0,
            weekly_interval_days: 7,
            monthly_interval_days: 30,
            fallback_avg_gap: 30.0,
        }
    }
}

/// Detect recurring subscription charges in a transaction list.
///
/// Only debits participate. Every emitted subscription is backed by at least
/// `min_support` charges of similar amount, starts as `pending`, and carries
/// a deterministic id, so re-running on the same input never creates
/// duplicate entries. Output is sorted by merchant display name.
pub fn detect(transactions: &[Transaction], config: &DetectionConfig) -> Vec<DetectedSubscription> {
    // Group debits by normalized merchant key, preserving input order
    let mut groups: HashMap<String, Vec<&Transaction>> = HashMap::new();
    for tx in transactions {
        if tx.amount >= Decimal::ZERO {
            continue; // Skip income/credits
        }
        groups
            .entry(normalize_merchant(&tx.merchant_label))
            .or_default()
            .push(tx);
    }

    let mut out = Vec::new();

    for (key, group) in groups {
        if group.len() < config.min_support {
            continue; // Recurrence cannot be inferred from a single charge
        }

        // Typical amount = median of absolute values
        let amounts: Vec<Decimal> = group.iter().map(|t| t.amount.abs()).collect();
        let typical = median(&amounts);

        // Keep only charges inside the similarity band (inclusive)
        let low = typical * (Decimal::ONE - config.amount_tolerance);
        let high = typical * (Decimal::ONE + config.amount_tolerance);
        let similar: Vec<&&Transaction> = group
            .iter()
            .filter(|t| {
                let a = t.amount.abs();
                a >= low && a <= high
            })
            .collect();

        if similar.len() < config.min_support {
            debug!(merchant = %key, "Dropping group - too few similar-amount charges");
            continue;
        }

        // Estimate cadence from the average gap between consecutive charges
        let mut dates: Vec<NaiveDate> = similar.iter().map(|t| t.date).collect();
        dates.sort();

        let gaps: Vec<i64> = dates.windows(2).map(|w| (w[1] - w[0]).num_days()).collect();
        let avg_gap = if gaps.is_empty() {
            config.fallback_avg_gap
        } else {
            gaps.iter().sum::<i64>() as f64 / gaps.len() as f64
        };

        let frequency = if avg_gap < config.weekly_max_avg_gap {
            Frequency::Weekly
        } else if avg_gap < config.monthly_max_avg_gap {
            Frequency::Monthly
        } else {
            Frequency::Unknown
        };

        // Project the next charge from the latest surviving date. Unknown
        // cadences get the monthly interval.
        let interval = match frequency {
            Frequency::Weekly => config.weekly_interval_days,
            Frequency::Monthly | Frequency::Unknown => config.monthly_interval_days,
        };
        let last = *dates.last().expect("non-empty after min_support check");
        let next_charge_estimate = last + Duration::days(interval);

        let typical_amount = round_cents(typical);

        // Display name = the label of the first charge in original group
        // order (before the similarity filter)
        let merchant = match group[0].merchant_label.as_str() {
            "" => "Subscription".to_string(),
            label => label.to_string(),
        };

        debug!(
            merchant = %merchant,
            amount = %typical_amount,
            frequency = %frequency,
            charges = similar.len(),
            "Detected recurring charge"
        );

        out.push(DetectedSubscription {
            id: format!("{}-{}", key, typical_amount),
            merchant,
            typical_amount,
            frequency,
            next_charge_estimate,
            status: SubscriptionStatus::Pending,
            category: Category::Recurring,
        });
    }

    // Stable presentation order. The id tiebreak only matters when distinct
    // clusters share a display name.
    out.sort_by(|a, b| a.merchant.cmp(&b.merchant).then_with(|| a.id.cmp(&b.id)));
    out
}

/// Normalize a merchant label into a grouping key: lowercase, runs of
/// whitespace collapsed, trimmed. An empty result becomes "unknown".
pub fn normalize_merchant(label: &str) -> String {
    let key = label
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if key.is_empty() {
        "unknown".to_string()
    } else {
        key
    }
}

/// Median of a slice of amounts. Even-sized sets take the mean of the two
/// middle sorted values.
fn median(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }

    let mut sorted = values.to_vec();
    sorted.sort();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / dec!(2)
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tx(id: &str, merchant: &str, date: &str, amount: Decimal) -> Transaction {
        Transaction {
            id: id.to_string(),
            merchant_label: merchant.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            amount,
            pending: false,
        }
    }

    fn detect_default(txs: &[Transaction]) -> Vec<DetectedSubscription> {
        detect(txs, &DetectionConfig::default())
    }

    #[test]
    fn test_normalize_merchant() {
        assert_eq!(normalize_merchant("  Netflix   Inc "), "netflix inc");
        assert_eq!(normalize_merchant("SPOTIFY"), "spotify");
        assert_eq!(normalize_merchant(""), "unknown");
        assert_eq!(normalize_merchant("   "), "unknown");
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(
            median(&[dec!(10), dec!(12), dec!(10)]),
            dec!(10),
            "odd-sized set takes the middle value"
        );
        assert_eq!(median(&[dec!(10), dec!(20)]), dec!(15));
        assert_eq!(median(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_empty_input() {
        assert!(detect_default(&[]).is_empty());
    }

    #[test]
    fn test_all_credits_no_output() {
        let txs = vec![
            tx("t1", "Payroll", "2024-01-01", dec!(2500.00)),
            tx("t2", "Payroll", "2024-02-01", dec!(2500.00)),
        ];
        assert!(detect_default(&txs).is_empty());
    }

    #[test]
    fn test_minimum_support_single_charge() {
        let txs = vec![tx("t1", "One Off Store", "2024-01-15", dec!(-42.00))];
        assert!(detect_default(&txs).is_empty());
    }

    #[test]
    fn test_similarity_filter_excludes_outlier() {
        // The 50 outlier shifts nothing: median 10, band [8, 12], two survive
        let txs = vec![
            tx("t1", "Gym", "2024-01-01", dec!(-10)),
            tx("t2", "Gym", "2024-02-01", dec!(-10)),
            tx("t3", "Gym", "2024-02-15", dec!(-50)),
        ];
        let subs = detect_default(&txs);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].typical_amount, dec!(10.00));
        // Outlier excluded from cadence: gap is Jan 1 -> Feb 1
        assert_eq!(subs[0].frequency, Frequency::Monthly);
    }

    #[test]
    fn test_similarity_filter_can_drop_whole_group() {
        // Median of [10, 90] is 50; neither charge lands in [40, 60]
        let txs = vec![
            tx("t1", "Mixed", "2024-01-01", dec!(-10)),
            tx("t2", "Mixed", "2024-02-01", dec!(-90)),
        ];
        assert!(detect_default(&txs).is_empty());
    }

    #[test]
    fn test_identical_amounts_fully_retained() {
        let txs = vec![
            tx("t1", "Spotify", "2024-01-03", dec!(-9.99)),
            tx("t2", "Spotify", "2024-02-03", dec!(-9.99)),
            tx("t3", "Spotify", "2024-03-03", dec!(-9.99)),
        ];
        let subs = detect_default(&txs);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].typical_amount, dec!(9.99));
    }

    #[test]
    fn test_frequency_classification() {
        let weekly = detect_default(&[
            tx("t1", "Lawn Care", "2024-03-01", dec!(-25)),
            tx("t2", "Lawn Care", "2024-03-08", dec!(-25)),
        ]);
        assert_eq!(weekly[0].frequency, Frequency::Weekly);

        let monthly = detect_default(&[
            tx("t1", "Netflix", "2024-03-01", dec!(-15.99)),
            tx("t2", "Netflix", "2024-03-31", dec!(-15.99)),
        ]);
        assert_eq!(monthly[0].frequency, Frequency::Monthly);

        let unknown = detect_default(&[
            tx("t1", "Insurance", "2024-01-01", dec!(-120)),
            tx("t2", "Insurance", "2024-04-10", dec!(-120)),
        ]);
        assert_eq!(unknown[0].frequency, Frequency::Unknown);
    }

    #[test]
    fn test_next_charge_projection() {
        let weekly = detect_default(&[
            tx("t1", "Lawn Care", "2024-03-01", dec!(-25)),
            tx("t2", "Lawn Care", "2024-03-08", dec!(-25)),
        ]);
        assert_eq!(
            weekly[0].next_charge_estimate,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );

        let unknown = detect_default(&[
            tx("t1", "Insurance", "2024-01-01", dec!(-120)),
            tx("t2", "Insurance", "2024-04-10", dec!(-120)),
        ]);
        // Unknown cadence projects with the monthly interval
        assert_eq!(
            unknown[0].next_charge_estimate,
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
        );
    }

    #[test]
    fn test_id_is_key_plus_cents() {
        let subs = detect_default(&[
            tx("t1", "Netflix  Inc", "2024-01-01", dec!(-15.99)),
            tx("t2", "NETFLIX INC", "2024-02-01", dec!(-15.99)),
        ]);
        assert_eq!(subs[0].id, "netflix inc-15.99");
    }

    #[test]
    fn test_id_pads_whole_dollar_amounts() {
        let subs = detect_default(&[
            tx("t1", "Gym", "2024-01-01", dec!(-10)),
            tx("t2", "Gym", "2024-02-01", dec!(-10)),
        ]);
        assert_eq!(subs[0].id, "gym-10.00");
    }

    #[test]
    fn test_determinism_across_runs() {
        let txs = vec![
            tx("t1", "Netflix", "2024-01-05", dec!(-15.99)),
            tx("t2", "Spotify", "2024-01-07", dec!(-9.99)),
            tx("t3", "Netflix", "2024-02-05", dec!(-15.99)),
            tx("t4", "Spotify", "2024-02-07", dec!(-9.99)),
            tx("t5", "Gym", "2024-01-10", dec!(-35.00)),
            tx("t6", "Gym", "2024-02-09", dec!(-35.00)),
        ];
        let first = detect_default(&txs);
        let second = detect_default(&txs);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.merchant, b.merchant);
        }
        // Sorted by merchant, case-sensitive lexical ascending
        let merchants: Vec<_> = first.iter().map(|s| s.merchant.as_str()).collect();
        assert_eq!(merchants, vec!["Gym", "Netflix", "Spotify"]);
    }

    #[test]
    fn test_empty_label_groups_as_unknown() {
        let subs = detect_default(&[
            tx("t1", "", "2024-01-01", dec!(-5.00)),
            tx("t2", "  ", "2024-02-01", dec!(-5.00)),
        ]);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].id, "unknown-5.00");
        assert_eq!(subs[0].merchant, "Subscription");
    }

    #[test]
    fn test_end_to_end_netflix_scenario() {
        let txs = vec![
            tx("t1", "Netflix", "2024-01-02", dec!(-15.99)),
            tx("t2", "Netflix", "2024-02-01", dec!(-15.99)),
            tx("t3", "Netflix", "2024-03-03", dec!(-15.99)),
            tx("t4", "Netflix", "2024-04-02", dec!(-15.99)),
            tx("t5", "Netflix", "2024-05-02", dec!(-15.99)),
            tx("t6", "Hardware Store", "2024-01-15", dec!(-82.13)),
            tx("t7", "Diner", "2024-02-20", dec!(-23.40)),
            tx("t8", "Bookshop", "2024-03-11", dec!(-17.00)),
        ];
        let subs = detect_default(&txs);
        assert_eq!(subs.len(), 1, "single-occurrence merchants produce nothing");

        let sub = &subs[0];
        assert_eq!(sub.merchant, "Netflix");
        assert_eq!(sub.typical_amount, dec!(15.99));
        assert_eq!(sub.frequency, Frequency::Monthly);
        assert_eq!(sub.status, SubscriptionStatus::Pending);
        assert_eq!(
            sub.next_charge_estimate,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
    }
}
