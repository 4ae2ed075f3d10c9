//! Beacon presence API endpoints.

use axum::extract::State;
use axum::Json;
use beaconwatch_core::{BeaconId, BeaconInfo, BeaconKind, PresenceEntry, TelemetryReadings};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::api::scan::ScanStatus;
use crate::state::SharedState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Decoded identity and latest sighting of a beacon.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "key": "uid:0102030405060708090a0b0c0d0e0f10",
    "kind": "uid",
    "namespace": "0102030405060708090a",
    "instance": "0b0c0d0e0f10",
    "ephemeral_id": null,
    "url": null,
    "tx_power_dbm": -18,
    "rssi_dbm": -62,
    "device": "AA:BB:CC:DD:EE:FF",
    "telemetry": null
}))]
pub struct BeaconSummary {
    /// Stable identity key.
    pub key: String,

    /// Frame kind the identity came from.
    pub kind: BeaconKind,

    /// UID namespace, lowercase hex.
    pub namespace: Option<String>,

    /// UID instance, lowercase hex.
    pub instance: Option<String>,

    /// EID ephemeral identifier, lowercase hex.
    pub ephemeral_id: Option<String>,

    /// Expanded URL for URL beacons.
    pub url: Option<String>,

    /// Calibrated transmit power at 0 m.
    #[schema(example = -18)]
    pub tx_power_dbm: i8,

    /// Signal strength of the latest sighting, if readable.
    #[schema(example = -62)]
    pub rssi_dbm: Option<i16>,

    /// Transport identifier of the latest sighting.
    #[schema(example = "AA:BB:CC:DD:EE:FF")]
    pub device: String,

    /// Telemetry attached to the latest sighting, if decodable.
    pub telemetry: Option<TelemetryReadings>,
}

impl From<&BeaconInfo> for BeaconSummary {
    fn from(info: &BeaconInfo) -> Self {
        let (namespace, instance, ephemeral_id, url) = match &info.id {
            BeaconId::Uid {
                namespace,
                instance,
            } => (
                Some(hex::encode(namespace)),
                Some(hex::encode(instance)),
                None,
                None,
            ),
            BeaconId::Eid { ephemeral_id } => (None, None, Some(hex::encode(ephemeral_id)), None),
            BeaconId::Url { url } => (None, None, None, Some(url.clone())),
        };

        Self {
            key: info.key.clone(),
            kind: info.id.kind(),
            namespace,
            instance,
            ephemeral_id,
            url,
            tx_power_dbm: info.tx_power,
            rssi_dbm: info.has_rssi().then_some(info.rssi),
            device: info.device.to_string(),
            telemetry: info.telemetry.as_ref().and_then(|t| t.readings()),
        }
    }
}

/// A beacon currently present.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PresentBeacon {
    /// Identity and latest sighting.
    #[serde(flatten)]
    pub beacon: BeaconSummary,

    /// Sightings since the beacon was found.
    #[schema(example = 12)]
    pub sightings: u64,

    /// When the beacon was found.
    #[schema(example = "2025-01-15T03:30:00Z")]
    pub first_seen_utc: String,

    /// When the beacon was last sighted.
    #[schema(example = "2025-01-15T03:30:42Z")]
    pub last_seen_utc: String,
}

impl From<PresenceEntry> for PresentBeacon {
    fn from(entry: PresenceEntry) -> Self {
        Self {
            beacon: BeaconSummary::from(&entry.info),
            sightings: entry.sightings,
            first_seen_utc: entry.first_seen_utc.to_rfc3339(),
            last_seen_utc: entry.last_seen_utc.to_rfc3339(),
        }
    }
}

/// Beacons currently present.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BeaconsResponse {
    /// Present beacons, ordered by when they were found.
    pub beacons: Vec<PresentBeacon>,

    /// Number of present beacons.
    #[schema(example = 1)]
    pub count: usize,

    /// Scanner state at the time of the snapshot.
    pub scan_state: ScanStatus,
}

// ============================================================================
// Handlers
// ============================================================================

/// List beacons currently present.
#[utoipa::path(
    get,
    path = "/api/beacons",
    tag = "beacons",
    operation_id = "listBeacons",
    summary = "List present beacons",
    description = "Returns every beacon sighted within the lost timeout of the \
        current scan session. The list is empty while the scanner is stopped.",
    responses(
        (status = 200, description = "Present beacons", body = BeaconsResponse),
        (status = 503, description = "Beacon engine unavailable")
    )
)]
pub async fn list_beacons(State(state): State<SharedState>) -> ApiResult<Json<BeaconsResponse>> {
    let scanner = state.scanner();
    let status = scanner.status().await?;
    let beacons: Vec<PresentBeacon> = scanner
        .snapshot()
        .await?
        .into_iter()
        .map(PresentBeacon::from)
        .collect();

    Ok(Json(BeaconsResponse {
        count: beacons.len(),
        beacons,
        scan_state: status.state.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use beaconwatch_core::{TelemetryFrame, RSSI_UNREADABLE};

    fn info(id: BeaconId, rssi: i16) -> BeaconInfo {
        BeaconInfo {
            key: "k".to_string(),
            id,
            tx_power: -18,
            telemetry: None,
            rssi,
            device: "AA:BB:CC:DD:EE:FF".into(),
        }
    }

    #[test]
    fn test_uid_summary_renders_hex() {
        let summary = BeaconSummary::from(&info(
            BeaconId::Uid {
                namespace: [0x0a; 10],
                instance: [0, 1, 2, 3, 4, 0xff],
            },
            -60,
        ));
        assert_eq!(summary.kind, BeaconKind::Uid);
        assert_eq!(summary.namespace.as_deref(), Some("0a0a0a0a0a0a0a0a0a0a"));
        assert_eq!(summary.instance.as_deref(), Some("0001020304ff"));
        assert!(summary.url.is_none());
        assert_eq!(summary.rssi_dbm, Some(-60));
    }

    #[test]
    fn test_unreadable_rssi_is_omitted() {
        let summary = BeaconSummary::from(&info(
            BeaconId::Url {
                url: "https://example.com/".to_string(),
            },
            RSSI_UNREADABLE,
        ));
        assert_eq!(summary.rssi_dbm, None);
        assert_eq!(summary.url.as_deref(), Some("https://example.com/"));
    }

    #[test]
    fn test_telemetry_readings_are_decoded() {
        let mut beacon = info(
            BeaconId::Eid {
                ephemeral_id: [1; 8],
            },
            -60,
        );
        beacon.telemetry = Some(TelemetryFrame::new(vec![
            0x20, 0x00, 0x0b, 0xb8, 0x80, 0x00, 0, 0, 0, 5, 0, 0, 0, 10,
        ]));
        let readings = BeaconSummary::from(&beacon).telemetry.unwrap();
        assert_eq!(readings.battery_mv, Some(3000));
        assert_eq!(readings.temperature_celsius, None);
        assert_eq!(readings.advertisement_count, 5);
    }
}
