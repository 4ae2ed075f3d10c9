//! Scan control API endpoints.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use beaconwatch_core::{ScanState, ScannerStatus};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Creates the scan router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/start", post(start_scan))
        .route("/stop", post(stop_scan))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Scanner lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// Not scanning.
    Idle,
    /// Scan requested, waiting for the Bluetooth adapter.
    Pending,
    /// Scanning.
    Scanning,
}

impl From<ScanState> for ScanStatus {
    fn from(state: ScanState) -> Self {
        match state {
            ScanState::Idle => Self::Idle,
            ScanState::Pending => Self::Pending,
            ScanState::Scanning => Self::Scanning,
        }
    }
}

/// Scanner state after a start or stop request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "state": "scanning",
    "radio_ready": true,
    "present": 0
}))]
pub struct ScanResponse {
    /// Scanner state.
    pub state: ScanStatus,

    /// Whether the Bluetooth adapter is powered and usable.
    #[schema(example = true)]
    pub radio_ready: bool,

    /// Beacons currently present.
    #[schema(example = 0)]
    pub present: usize,
}

impl From<ScannerStatus> for ScanResponse {
    fn from(status: ScannerStatus) -> Self {
        Self {
            state: status.state.into(),
            radio_ready: status.radio_ready,
            present: status.present,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Start scanning for beacons.
///
/// If the adapter is not ready the scan starts as soon as it is.
#[utoipa::path(
    post,
    path = "/api/scan/start",
    tag = "scan",
    operation_id = "startScan",
    summary = "Start scanning",
    description = "Starts scanning for Eddystone beacons. If the Bluetooth \
        adapter is not ready, the state is `pending` and scanning starts once \
        it becomes ready. Starting while already scanning has no effect.",
    responses(
        (status = 200, description = "Scan requested", body = ScanResponse),
        (status = 503, description = "Beacon engine unavailable")
    )
)]
pub async fn start_scan(State(state): State<SharedState>) -> ApiResult<Json<ScanResponse>> {
    let scanner = state.scanner();
    scanner.start().await?;
    Ok(Json(scanner.status().await?.into()))
}

/// Stop scanning and forget every present beacon.
#[utoipa::path(
    post,
    path = "/api/scan/stop",
    tag = "scan",
    operation_id = "stopScan",
    summary = "Stop scanning",
    description = "Stops scanning. Present beacons are forgotten without \
        being reported lost.",
    responses(
        (status = 200, description = "Scanning stopped", body = ScanResponse),
        (status = 503, description = "Beacon engine unavailable")
    )
)]
pub async fn stop_scan(State(state): State<SharedState>) -> ApiResult<Json<ScanResponse>> {
    let scanner = state.scanner();
    scanner.stop().await?;
    Ok(Json(scanner.status().await?.into()))
}
