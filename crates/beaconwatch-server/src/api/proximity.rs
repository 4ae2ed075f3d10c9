//! Nearest-beacon API endpoint.

use std::time::Duration;

use axum::extract::{Query, State};
use axum::Json;
use beaconwatch_core::config::MAX_SAMPLE_WINDOW_SECS;
use beaconwatch_core::RankedBeacon;
use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::api::beacons::BeaconSummary;
use crate::api::error::{ApiError, ApiResult};
use crate::pages::TitleResolver;
use crate::state::SharedState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Proximity query parameters.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProximityQuery {
    /// Sampling window in seconds (1-60). Defaults to the configured window.
    #[param(example = 3, minimum = 1, maximum = 60)]
    pub window_secs: Option<u64>,
}

/// A beacon ranked by average signal strength.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RankedBeaconResponse {
    /// 1-based rank; 1 is nearest.
    #[schema(example = 1)]
    pub rank: usize,

    /// Identity and latest sampled sighting.
    #[serde(flatten)]
    pub beacon: BeaconSummary,

    /// Mean RSSI over the window, truncated toward zero.
    #[schema(example = -61)]
    pub average_rssi_dbm: i16,

    /// Sightings averaged.
    #[schema(example = 4)]
    pub samples: u32,

    /// Page title, for URL beacons whose page could be fetched.
    #[schema(example = "Example Domain")]
    pub title: Option<String>,

    /// Page URL after redirects, when the title was fetched.
    #[schema(example = "https://example.com/")]
    pub page_url: Option<String>,
}

/// Beacons ranked nearest first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "window_secs": 3,
    "nearest": "https://example.com/",
    "beacons": [],
    "sampled_at_utc": "2025-01-15T03:30:00Z"
}))]
pub struct ProximityResponse {
    /// Sampling window used, in seconds.
    #[schema(example = 3)]
    pub window_secs: u64,

    /// Identity key of the nearest beacon, if any was ranked.
    #[schema(example = "https://example.com/")]
    pub nearest: Option<String>,

    /// Ranked beacons, strongest average signal first.
    pub beacons: Vec<RankedBeaconResponse>,

    /// When sampling finished.
    #[schema(example = "2025-01-15T03:30:00Z")]
    pub sampled_at_utc: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Find the nearest beacons.
///
/// Scans for the sampling window, then ranks every beacon sighted more than
/// once by its average RSSI.
#[utoipa::path(
    get,
    path = "/api/proximity",
    tag = "proximity",
    operation_id = "checkProximity",
    summary = "Rank nearby beacons",
    description = "Scans for the sampling window and ranks beacons by average \
        signal strength, nearest first. The first sighting of each beacon in \
        the window is not averaged, so beacons heard only once are not ranked. \
        Sampling uses its own scanner, so the presence scan behind \
        `/api/beacons` is not interrupted. URL beacons are labeled with \
        their page title when it can be fetched; titles are fetched in \
        parallel. Concurrent requests are served one window at a time.",
    params(ProximityQuery),
    responses(
        (status = 200, description = "Ranking completed", body = ProximityResponse),
        (status = 400, description = "Invalid sampling window", body = super::error::ErrorResponse),
        (status = 503, description = "Beacon engine unavailable")
    )
)]
pub async fn check_proximity(
    State(state): State<SharedState>,
    Query(query): Query<ProximityQuery>,
) -> ApiResult<Json<ProximityResponse>> {
    let window_secs = query
        .window_secs
        .unwrap_or(state.config().scanner.sample_window_secs);
    if !(1..=MAX_SAMPLE_WINDOW_SECS).contains(&window_secs) {
        return Err(ApiError::BadRequest {
            error_code: "invalid_window".to_string(),
            message: format!("window_secs must be between 1 and {MAX_SAMPLE_WINDOW_SECS}"),
        });
    }

    let ranked = state
        .proximity()
        .sample(state.sampler(), Duration::from_secs(window_secs))
        .await?;

    let beacons = join_all(
        ranked
            .iter()
            .enumerate()
            .map(|(index, beacon)| label(state.titles(), index + 1, beacon)),
    )
    .await;

    Ok(Json(ProximityResponse {
        window_secs,
        nearest: ranked.first().map(|beacon| beacon.key.clone()),
        beacons,
        sampled_at_utc: Utc::now().to_rfc3339(),
    }))
}

async fn label(titles: &TitleResolver, rank: usize, ranked: &RankedBeacon) -> RankedBeaconResponse {
    let page = match ranked.info.id.url() {
        Some(url) => match titles.resolve(url).await {
            Ok(page) => Some(page),
            Err(err) => {
                debug!(%url, error = %err, "No page title for beacon");
                None
            }
        },
        None => None,
    };

    RankedBeaconResponse {
        rank,
        beacon: BeaconSummary::from(&ranked.info),
        average_rssi_dbm: ranked.average_rssi,
        samples: ranked.samples,
        title: page.as_ref().map(|p| p.title.clone()),
        page_url: page.map(|p| p.url),
    }
}
