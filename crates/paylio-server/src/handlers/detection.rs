//! Detection run handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{handlers::with_ledger, AppError, AppState, DEFAULT_DETECT_WINDOW_DAYS, MAX_WINDOW_DAYS};
use paylio_core::{detect, MergePolicy, SubscriptionStatus};

/// Request body for a detection run. An empty body uses the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct DetectRequest {
    /// Look-back window in days (default 90)
    pub days: Option<u32>,
    /// Merge policy for ids that recur: "preserve" (default) keeps prior
    /// approve/deny decisions, "reset" starts everything over as pending.
    pub merge: Option<String>,
}

/// Response for a detection run
#[derive(Serialize)]
pub struct DetectResponse {
    pub detected: usize,
    pub pending: usize,
    pub window_days: u32,
}

/// POST /api/detect - Fetch transactions and rebuild the working set
///
/// Upstream fetch failure surfaces as 502; the ledger is left untouched in
/// that case rather than being replaced with fabricated empty results.
pub async fn run_detection(
    State(state): State<Arc<AppState>>,
    body: Option<Json<DetectRequest>>,
) -> Result<Json<DetectResponse>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let window_days = request.days.unwrap_or(DEFAULT_DETECT_WINDOW_DAYS);
    if window_days == 0 || window_days > MAX_WINDOW_DAYS {
        return Err(AppError::bad_request(&format!(
            "days must be between 1 and {}",
            MAX_WINDOW_DAYS
        )));
    }

    let policy = match request.merge.as_deref() {
        None | Some("preserve") => MergePolicy::PreserveDecisions,
        Some("reset") => MergePolicy::Reset,
        Some(other) => {
            return Err(AppError::bad_request(&format!(
                "unknown merge policy: {}",
                other
            )))
        }
    };

    // Fetch completes (or fails) before the ledger is touched
    let transactions = state
        .source
        .fetch(window_days)
        .await
        .map_err(AppError::from_core)?;

    let subscriptions = detect(&transactions, &state.detection);

    info!(
        transactions = transactions.len(),
        detected = subscriptions.len(),
        window_days,
        "Detection run complete"
    );

    with_ledger(&state, |ledger| {
        ledger.replace(subscriptions, policy);
        let pending = ledger
            .snapshot()
            .iter()
            .filter(|s| s.status == SubscriptionStatus::Pending)
            .count();
        Ok(Json(DetectResponse {
            detected: ledger.len(),
            pending,
            window_days,
        }))
    })
}
