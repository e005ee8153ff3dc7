// handlers/public/healthcheck.rs - GET /v1/healthcheck handler

use axum::extract::State;
use serde_json::{json, Value};

use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /v1/healthcheck - liveness plus database reachability
pub async fn healthcheck(State(state): State<AppState>) -> ApiResult<Value> {
    let database = match &state.pool {
        Some(pool) => {
            let limit = state.config.database.query_timeout();
            match tokio::time::timeout(limit, DatabaseManager::health_check(pool)).await {
                Ok(Ok(())) => "available",
                Ok(Err(e)) => {
                    tracing::warn!("Database health check failed: {}", e);
                    "unavailable"
                }
                Err(_) => {
                    tracing::warn!("Database health check timed out after {:?}", limit);
                    "unavailable"
                }
            }
        }
        None => "not configured",
    };

    Ok(ApiResponse::success(json!({
        "status": "available",
        "system_info": {
            "environment": state.config.environment.as_str(),
            "version": env!("CARGO_PKG_VERSION"),
            "database": database,
        }
    })))
}
