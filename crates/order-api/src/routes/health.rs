//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use placement::BreakerSnapshot;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub circuit_breaker: BreakerSnapshot,
}

/// GET /health: service status plus the inventory breaker's state.
///
/// An open breaker does not make the service unhealthy; placements still
/// answer, just with a degraded outcome.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        circuit_breaker: state.coordinator.breaker_snapshot(),
    })
}
