use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::state::AppState;

/// Liveness probe. The database decides the status; the cache is only
/// reported.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match state.repos.health.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            error!("Health check database ping failed: {}", e);
            "disconnected"
        }
    };
    let cache = match state.cache.ping().await {
        Ok(()) => "connected",
        Err(_) => "unavailable",
    };

    let healthy = database == "connected";
    let status = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (status, Json(json!({
        "success": healthy,
        "status": if healthy { "OK" } else { "ERROR" },
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": database,
            "cache": cache,
        },
    })))
}
