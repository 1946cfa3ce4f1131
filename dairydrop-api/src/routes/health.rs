/// Health check endpoints
///
/// # Endpoints
///
/// - `GET /` - Service banner
/// - `GET /api/health` - Health check with database connectivity
///
/// # Response
///
/// ```json
/// {
///   "service": "dairydrop-api",
///   "status": "healthy",
///   "version": "0.1.0",
///   "uptimeSeconds": 42,
///   "timestamp": "2025-01-01T00:00:00Z",
///   "database": "connected"
/// }
/// ```

use crate::{app::AppState, error::ApiError};
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use dairydrop_shared::db::pool::is_reachable;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Upper bound on the database probe
const DB_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub service: String,

    /// `healthy` or `degraded`
    pub status: String,

    /// Application version
    pub version: String,

    pub uptime_seconds: u64,

    pub timestamp: DateTime<Utc>,

    /// `connected` or `disconnected`
    pub database: String,
}

/// Service banner
pub async fn root() -> Json<Value> {
    Json(json!({ "name": "Dairy Drop API", "status": "ok" }))
}

/// Health check handler
///
/// Always answers 200; a failed database probe is reported as `degraded`.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = is_reachable(&state.db, DB_PROBE_TIMEOUT).await;

    Json(HealthResponse {
        service: "dairydrop-api".to_string(),
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        timestamp: Utc::now(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
    })
}

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
