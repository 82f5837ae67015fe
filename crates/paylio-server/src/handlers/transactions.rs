//! Transaction passthrough and spend summary handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, DEFAULT_SPEND_WINDOW_DAYS, MAX_WINDOW_DAYS};
use paylio_core::{round_cents, total_spend, Transaction};

/// Query params for window-based fetches
#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    /// Look-back window in days (default 30)
    pub days: Option<u32>,
}

fn validate_window(days: Option<u32>) -> Result<u32, AppError> {
    let days = days.unwrap_or(DEFAULT_SPEND_WINDOW_DAYS);
    if days == 0 || days > MAX_WINDOW_DAYS {
        return Err(AppError::bad_request(&format!(
            "days must be between 1 and {}",
            MAX_WINDOW_DAYS
        )));
    }
    Ok(days)
}

/// GET /api/transactions - Validated transactions for a look-back window
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let days = validate_window(query.days)?;

    let transactions = state.source.fetch(days).await.map_err(AppError::from_core)?;

    Ok(Json(transactions))
}

/// Spend summary for a look-back window
#[derive(Serialize)]
pub struct SpendResponse {
    pub window_days: u32,
    /// Sum of absolute debit amounts over the window
    pub total_spend: Decimal,
}

/// GET /api/spend - Total debit spend for a look-back window
pub async fn get_spend(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<SpendResponse>, AppError> {
    let days = validate_window(query.days)?;

    let transactions = state.source.fetch(days).await.map_err(AppError::from_core)?;

    Ok(Json(SpendResponse {
        window_days: days,
        total_spend: round_cents(total_spend(&transactions)),
    }))
}
