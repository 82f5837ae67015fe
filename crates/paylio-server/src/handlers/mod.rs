//! HTTP request handlers

use axum::Json;
use serde::Serialize;

mod detection;
mod subscriptions;
mod transactions;

pub use detection::*;
pub use subscriptions::*;
pub use transactions::*;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
