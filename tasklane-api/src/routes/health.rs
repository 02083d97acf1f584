/// Health check endpoint
///
/// Reports whether the server is up and whether the last snapshot write
/// succeeded.
///
/// # Endpoint
///
/// ```text
/// GET /api/health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "storage": "ok"
/// }
/// ```
///
/// `status` is `degraded` and `storage` is `degraded` while the most recent
/// persist has failed. The endpoint still answers 200 because reads and
/// writes keep working in memory.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Snapshot persistence status
    pub storage: String,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let persist_error = state.store.persistence_error().await;

    if let Some(err) = &persist_error {
        tracing::debug!(
            error = %err,
            backend = %state.store.backend_description(),
            "Storage degraded"
        );
    }

    let (status, storage) = match persist_error {
        None => ("healthy", "ok"),
        Some(_) => ("degraded", "degraded"),
    };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: storage.to_string(),
    }))
}
