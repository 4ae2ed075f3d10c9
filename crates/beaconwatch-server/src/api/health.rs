//! Health check API endpoint.
//!
//! Provides a simple health check endpoint for monitoring and load balancers.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use beaconwatch_core::ScanState;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::SharedState;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "status": "ok",
    "version": "0.1.0",
    "scanning": true,
    "radio_ready": true,
    "uptime_secs": 3600
}))]
pub struct HealthResponse {
    /// `ok`, or `degraded` if the beacon engine has stopped.
    #[schema(example = "ok")]
    pub status: String,

    /// Service version from Cargo.toml.
    #[schema(example = "0.1.0")]
    pub version: String,

    /// Whether the radio is currently scanning.
    #[schema(example = true)]
    pub scanning: bool,

    /// Whether the Bluetooth adapter is powered and usable.
    #[schema(example = true)]
    pub radio_ready: bool,

    /// Server uptime in seconds.
    #[schema(example = 3600)]
    pub uptime_secs: u64,
}

/// Creates the health router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(health_check))
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    operation_id = "healthCheck",
    summary = "Check service health",
    description = "Returns service status, including whether the beacon scanner \
        is running and the Bluetooth adapter is ready.",
    responses(
        (status = 200, description = "Service status", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let status = state.scanner().status().await.ok();

    Json(HealthResponse {
        status: if status.is_some() { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        scanning: status.is_some_and(|s| s.state == ScanState::Scanning),
        radio_ready: status.is_some_and(|s| s.radio_ready),
        uptime_secs: state.uptime_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            scanning: false,
            radio_ready: true,
            uptime_secs: 5,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"scanning\":false"));
    }
}
