/// Health check endpoint
///
/// Reports whether the server is up and, when running on PostgreSQL, whether
/// the database answers.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected"
/// }
/// ```
///
/// `database` is `"memory"` when the server runs on in-memory stores. A
/// database that does not answer yields `503 Service Unavailable`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Json};
use docket_shared::db::pool;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database = match &state.db {
        Some(db) => {
            pool::health_check(db).await.map_err(|e| {
                tracing::warn!(error = %e, "Database health check failed");
                ApiError::ServiceUnavailable("database unavailable".to_string())
            })?;
            "connected"
        }
        None => "memory",
    };

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
    }))
}
