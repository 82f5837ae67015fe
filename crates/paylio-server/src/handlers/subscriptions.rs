//! Subscription review handlers
//!
//! Approve/deny are only ever invoked on explicit user intent; the server
//! never transitions a subscription on its own.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::{AppError, AppState};
use paylio_core::{DetectedSubscription, Ledger, Metrics};

/// Run a closure against the locked ledger, mapping lock poisoning to a
/// sanitized 500.
pub(crate) fn with_ledger<T>(
    state: &AppState,
    f: impl FnOnce(&mut Ledger) -> Result<T, AppError>,
) -> Result<T, AppError> {
    let mut ledger = state
        .ledger
        .lock()
        .map_err(|_| AppError::internal("Ledger lock poisoned"))?;
    f(&mut ledger)
}

/// GET /api/subscriptions - Current working set in presentation order
pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DetectedSubscription>>, AppError> {
    with_ledger(&state, |ledger| Ok(Json(ledger.snapshot().to_vec())))
}

/// Response for an approval action
#[derive(Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub subscription: DetectedSubscription,
}

/// POST /api/subscriptions/:id/approve - Approve a pending subscription
pub async fn approve_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    with_ledger(&state, |ledger| {
        let subscription = ledger.approve(&id).map_err(AppError::from_core)?.clone();
        Ok(Json(ActionResponse {
            success: true,
            subscription,
        }))
    })
}

/// POST /api/subscriptions/:id/deny - Deny a pending subscription
pub async fn deny_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    with_ledger(&state, |ledger| {
        let subscription = ledger.deny(&id).map_err(AppError::from_core)?.clone();
        Ok(Json(ActionResponse {
            success: true,
            subscription,
        }))
    })
}

/// GET /api/metrics - Aggregate counts and projected monthly spend
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Result<Json<Metrics>, AppError> {
    with_ledger(&state, |ledger| Ok(Json(ledger.metrics())))
}
