//! Paylio Web Server
//!
//! Axum-based REST API over the subscription ledger.
//!
//! Security features:
//! - Optional bearer API-key authentication (secure by default, use --no-auth
//!   for local dev)
//! - Restrictive CORS policy
//! - Input validation (look-back window bounds)
//! - Sanitized error responses
//!
//! The server owns a single in-memory [`Ledger`] behind a mutex; every
//! mutating operation is atomic with respect to the ledger (single writer at
//! a time), which is all the concurrency the approval flow needs.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use paylio_core::{DetectionConfig, Ledger, TransactionSource};

mod handlers;

/// Maximum look-back window accepted by fetching endpoints
pub const MAX_WINDOW_DAYS: u32 = 365;

/// Default look-back window for detection runs
pub const DEFAULT_DETECT_WINDOW_DAYS: u32 = 90;

/// Default look-back window for spend summaries
pub const DEFAULT_SPEND_WINDOW_DAYS: u32 = 30;

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// API keys accepted as "Bearer <key>" in the Authorization header
    pub api_keys: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
        }
    }
}

/// Shared application state
pub struct AppState {
    /// The session's working set of detected subscriptions
    pub ledger: Mutex<Ledger>,
    /// Where detection runs fetch transactions from
    pub source: Arc<dyn TransactionSource>,
    /// Detection thresholds, fixed at server construction
    pub detection: DetectionConfig,
    pub config: ServerConfig,
}

/// Authentication middleware - validates bearer API keys.
///
/// Keys are compared using constant-time comparison to prevent timing
/// attacks.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        return next.run(request).await;
    }

    let api_key_valid = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false);

    if api_key_valid {
        info!(path = %request.uri().path(), "Authenticated via API key");
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Validate an API key against the configured keys using constant-time
/// comparison to prevent timing attacks.
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();

    for key in valid_keys {
        let key_bytes = key.as_bytes();
        // Only compare if lengths match (constant-time for same-length keys)
        if provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes)) {
            return true;
        }
    }
    false
}

/// Create the application router
pub fn create_router(source: Arc<dyn TransactionSource>, config: ServerConfig) -> Router {
    create_router_with_detection(source, config, DetectionConfig::default())
}

/// Create the application router with custom detection thresholds
pub fn create_router_with_detection(
    source: Arc<dyn TransactionSource>,
    config: ServerConfig,
    detection: DetectionConfig,
) -> Router {
    let state = Arc::new(AppState {
        ledger: Mutex::new(Ledger::new()),
        source,
        detection,
        config: config.clone(),
    });

    let api_routes = Router::new()
        // Health
        .route("/health", get(handlers::health))
        // Subscriptions (ledger snapshot + approval actions)
        .route("/subscriptions", get(handlers::list_subscriptions))
        .route(
            "/subscriptions/:id/approve",
            post(handlers::approve_subscription),
        )
        .route("/subscriptions/:id/deny", post(handlers::deny_subscription))
        // Aggregate metrics
        .route("/metrics", get(handlers::get_metrics))
        // Detection runs
        .route("/detect", post(handlers::run_detection))
        // Transaction passthrough + spend summary
        .route("/transactions", get(handlers::list_transactions))
        .route("/spend", get(handlers::get_spend));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Start the server
pub async fn serve(
    source: Arc<dyn TransactionSource>,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    }

    let app = create_router(source, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn conflict(msg: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Map core errors onto HTTP semantics. Lookup failures and illegal
    /// transitions keep their message; upstream failure becomes 502 so the
    /// caller can tell "source unavailable" apart from "no data".
    pub fn from_core(err: paylio_core::Error) -> Self {
        use paylio_core::Error;

        match err {
            Error::NotFound(msg) => Self::not_found(&msg),
            Error::Conflict(msg) => Self::conflict(&msg),
            Error::InvalidData(msg) => Self::bad_request(&msg),
            Error::Source(msg) => Self {
                status: StatusCode::BAD_GATEWAY,
                message: format!("Transaction source unavailable: {}", msg),
                internal: None,
            },
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "An internal error occurred".to_string(),
                internal: Some(other.into()),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
