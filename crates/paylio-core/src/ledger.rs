//! Subscription ledger and approval state machine
//!
//! Holds one detection run's subscriptions in memory and applies user
//! approve/deny decisions. Transitions:
//!
//! ```text
//! pending --approve--> active
//! pending --deny-----> denied
//! ```
//!
//! `active` and `denied` are terminal under the ledger's own operations;
//! only a fresh detection run (via [`Ledger::replace`]) can change them,
//! subject to the merge policy.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{round_cents, DetectedSubscription, Frequency, SubscriptionStatus};

/// Average weeks per month, used to normalize weekly charges to a monthly
/// spend figure.
const WEEKS_PER_MONTH: Decimal = dec!(4.345);

/// What happens to existing user decisions when a new detection run replaces
/// the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Ids that recur keep their prior approve/deny status; new ids start
    /// pending. This is the default: re-detection must not silently discard
    /// decisions the user already made.
    #[default]
    PreserveDecisions,
    /// Every subscription starts over as pending.
    Reset,
}

/// Aggregate metrics over the ledger
#[derive(Debug, Clone, Serialize)]
pub struct Metrics {
    pub active_count: usize,
    pub pending_count: usize,
    /// Frequency-normalized monthly cost of approved subscriptions, rounded
    /// half-up to the cent. Unknown cadences contribute nothing - better to
    /// understate than overstate a cost we are not confident about.
    pub projected_monthly_spend: Decimal,
}

/// In-memory collection of detected subscriptions plus user decisions.
///
/// Iteration order is the detector's presentation order. Single-session,
/// single-actor; callers sharing a ledger across tasks wrap it in a mutex.
#[derive(Debug, Default)]
pub struct Ledger {
    subscriptions: Vec<DetectedSubscription>,
    by_id: HashMap<String, usize>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fresh ledger from one detection run.
    pub fn from_detected(subscriptions: Vec<DetectedSubscription>) -> Self {
        let mut ledger = Self::new();
        ledger.replace(subscriptions, MergePolicy::Reset);
        ledger
    }

    /// Replace the working set with a new detection run's output.
    ///
    /// Duplicate ids in the input keep only the first occurrence (the
    /// detector never emits duplicates for one run).
    pub fn replace(&mut self, subscriptions: Vec<DetectedSubscription>, policy: MergePolicy) {
        let prior: HashMap<String, SubscriptionStatus> = match policy {
            MergePolicy::PreserveDecisions => self
                .subscriptions
                .iter()
                .map(|s| (s.id.clone(), s.status))
                .collect(),
            MergePolicy::Reset => HashMap::new(),
        };

        self.subscriptions.clear();
        self.by_id.clear();

        for mut sub in subscriptions {
            if self.by_id.contains_key(&sub.id) {
                continue;
            }
            if let Some(&status) = prior.get(&sub.id) {
                sub.status = status;
            }
            self.by_id.insert(sub.id.clone(), self.subscriptions.len());
            self.subscriptions.push(sub);
        }

        debug!(count = self.subscriptions.len(), ?policy, "Ledger reseeded");
    }

    /// Approve a pending subscription. Idempotent on already-active entries;
    /// a denied entry cannot be approved (denied is terminal).
    pub fn approve(&mut self, id: &str) -> Result<&DetectedSubscription> {
        self.transition(id, SubscriptionStatus::Active)
    }

    /// Deny a pending subscription. Idempotent on already-denied entries;
    /// an active entry cannot be denied (active is terminal).
    pub fn deny(&mut self, id: &str) -> Result<&DetectedSubscription> {
        self.transition(id, SubscriptionStatus::Denied)
    }

    fn transition(&mut self, id: &str, target: SubscriptionStatus) -> Result<&DetectedSubscription> {
        let idx = *self
            .by_id
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("Subscription {} not found", id)))?;

        let sub = &mut self.subscriptions[idx];
        if sub.status != SubscriptionStatus::Pending && sub.status != target {
            return Err(Error::Conflict(format!(
                "Subscription {} is already {}",
                id, sub.status
            )));
        }

        sub.status = target;
        Ok(&self.subscriptions[idx])
    }

    pub fn get(&self, id: &str) -> Option<&DetectedSubscription> {
        self.by_id.get(id).map(|&idx| &self.subscriptions[idx])
    }

    /// Current working set in presentation order.
    pub fn snapshot(&self) -> &[DetectedSubscription] {
        &self.subscriptions
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Recompute aggregate metrics from the current working set.
    pub fn metrics(&self) -> Metrics {
        let mut active_count = 0;
        let mut pending_count = 0;
        let mut spend = Decimal::ZERO;

        for sub in &self.subscriptions {
            match sub.status {
                SubscriptionStatus::Active => {
                    active_count += 1;
                    spend += match sub.frequency {
                        Frequency::Monthly => sub.typical_amount,
                        Frequency::Weekly => sub.typical_amount * WEEKS_PER_MONTH,
                        Frequency::Unknown => Decimal::ZERO,
                    };
                }
                SubscriptionStatus::Pending => pending_count += 1,
                SubscriptionStatus::Denied => {}
            }
        }

        Metrics {
            active_count,
            pending_count,
            projected_monthly_spend: round_cents(spend),
        }
    }
}
