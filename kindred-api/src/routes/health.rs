use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use kindred_shared::types::api::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let store_check = match state.store.ping() {
        Ok(()) => HealthCheck::healthy("store"),
        Err(e) => {
            tracing::warn!(error = %e, "store health check failed");
            HealthCheck::unhealthy("store", e.to_string())
        }
    };

    let response = HealthResponse::healthy("kindred-api", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![store_check]);
    let status = match response.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (status, Json(response))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, StatusCode> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(StatusCode::NOT_FOUND)
}
