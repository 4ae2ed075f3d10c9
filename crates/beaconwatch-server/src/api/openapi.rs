//! OpenAPI specification generation for the beaconwatch API.
//!
//! Served at `/api/openapi.json` and written to disk by the `gen-openapi`
//! binary for client generation.

use axum::Json;
use utoipa::OpenApi;

use super::beacons::{BeaconSummary, BeaconsResponse, PresentBeacon};
use super::error::ErrorResponse;
use super::health::HealthResponse;
use super::proximity::{ProximityResponse, RankedBeaconResponse};
use super::scan::{ScanResponse, ScanStatus};

/// Serve the OpenAPI specification as JSON.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> serde_json::Result<String> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for beaconwatch.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "beaconwatch API",
        version = "0.1.0",
        description = r#"
# beaconwatch API

beaconwatch listens for Eddystone Bluetooth beacons and reports which are nearby.

## Overview

1. **Presence**: Beacons are *found* when first heard and *lost* after going
   unheard for the configured timeout (15 seconds by default).
2. **Proximity**: A short sampling scan ranks beacons by average signal
   strength. URL beacons are labeled with the title of the page they advertise.
3. **Scan control**: Scanning can be started and stopped explicitly.

Beacons are identified by UID (namespace + instance), EID (ephemeral id) or
URL. Telemetry (TLM) frames are attached to the next identity frame from the
same device.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local beaconwatch server")
    ),
    tags(
        (name = "system", description = "Health checks"),
        (name = "beacons", description = "Beacons currently present"),
        (name = "scan", description = "Start and stop scanning"),
        (name = "proximity", description = "Nearest-beacon ranking")
    ),
    paths(
        super::health::health_check,
        super::beacons::list_beacons,
        super::scan::start_scan,
        super::scan::stop_scan,
        super::proximity::check_proximity,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            BeaconSummary,
            PresentBeacon,
            BeaconsResponse,
            ScanStatus,
            ScanResponse,
            RankedBeaconResponse,
            ProximityResponse,
        )
    )
)]
pub struct ApiDoc;
