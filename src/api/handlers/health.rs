//! Health endpoint

use std::sync::Arc;

use axum::extract::State;
use serde::Serialize;
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, ok};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
}

/// Liveness probe including a database ping.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable")
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    match state.db.ping().await {
        Ok(()) => ok(HealthResponse { status: "ok" }),
        Err(e) => ApiError::service_unavailable(format!("database unreachable: {e}")).into_err(),
    }
}
