//! Shared types for advertisements and resolved beacons.
//!
//! Radio backends produce [`RawAdvertisement`]s; the engine turns them into
//! [`BeaconInfo`] records that observers receive.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::frame::{Frame, TelemetryFrame};
use crate::identity;

/// RSSI value reported when the signal strength cannot be read.
pub const RSSI_UNREADABLE: i16 = 127;

/// Transport-level device identifier.
///
/// Only stable for the lifetime of an advertising session, so it is used to
/// correlate frames seen close together and never as a beacon identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap a backend-specific identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One advertisement as delivered by the radio layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAdvertisement {
    /// Transport identifier of the advertiser.
    pub device: DeviceId,

    /// Service data published under the Eddystone service UUID.
    pub service_data: Vec<u8>,

    /// Received signal strength in dBm, or [`RSSI_UNREADABLE`].
    pub rssi: i16,
}

/// Which Eddystone identity a beacon broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BeaconKind {
    /// Static namespace + instance identifier.
    Uid,
    /// Rotating ephemeral identifier.
    Eid,
    /// Compressed URL.
    Url,
}

/// The identity carried by a beacon's identity frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BeaconId {
    /// Eddystone-UID.
    Uid {
        /// 10-byte namespace.
        namespace: [u8; 10],
        /// 6-byte instance.
        instance: [u8; 6],
    },
    /// Eddystone-EID. The bytes are opaque here.
    Eid {
        /// 8-byte ephemeral identifier.
        ephemeral_id: [u8; 8],
    },
    /// Eddystone-URL.
    Url {
        /// Expanded URL.
        url: String,
    },
}

impl BeaconId {
    /// The frame kind this identity came from.
    #[must_use]
    pub const fn kind(&self) -> BeaconKind {
        match self {
            Self::Uid { .. } => BeaconKind::Uid,
            Self::Eid { .. } => BeaconKind::Eid,
            Self::Url { .. } => BeaconKind::Url,
        }
    }

    /// The URL for URL beacons.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Url { url } => Some(url),
            _ => None,
        }
    }
}

/// A resolved beacon sighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconInfo {
    /// Stable identity key; equal keys mean the same beacon.
    pub key: String,

    /// Decoded identity.
    pub id: BeaconId,

    /// Calibrated transmit power at 0 m, in dBm.
    pub tx_power: i8,

    /// Telemetry seen from the same device just before this frame, if any.
    pub telemetry: Option<TelemetryFrame>,

    /// Signal strength of this sighting, or [`RSSI_UNREADABLE`].
    pub rssi: i16,

    /// Transport identifier the frame arrived from.
    pub device: DeviceId,
}

impl BeaconInfo {
    /// Build a record from an identity frame.
    ///
    /// Returns `None` for telemetry and unknown frames.
    #[must_use]
    pub fn from_frame(
        frame: &Frame,
        telemetry: Option<TelemetryFrame>,
        rssi: i16,
        device: DeviceId,
    ) -> Option<Self> {
        let key = identity::resolve_key(frame)?;
        let (id, tx_power) = match frame {
            Frame::Uid(uid) => (
                BeaconId::Uid {
                    namespace: uid.namespace,
                    instance: uid.instance,
                },
                uid.tx_power,
            ),
            Frame::Eid(eid) => (
                BeaconId::Eid {
                    ephemeral_id: eid.ephemeral_id,
                },
                eid.tx_power,
            ),
            Frame::Url(url) => (
                BeaconId::Url {
                    url: url.url.clone(),
                },
                url.tx_power,
            ),
            Frame::Telemetry(_) | Frame::Unknown => return None,
        };

        Some(Self {
            key,
            id,
            tx_power,
            telemetry,
            rssi,
            device,
        })
    }

    /// Whether this sighting carries a usable signal strength.
    #[inline]
    #[must_use]
    pub const fn has_rssi(&self) -> bool {
        self.rssi != RSSI_UNREADABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{EidFrame, UidFrame, UrlFrame};

    #[test]
    fn test_from_uid_frame() {
        let frame = Frame::Uid(UidFrame {
            tx_power: -20,
            namespace: [0xAB; 10],
            instance: [0x01, 0x02, 0x03, 0x04, 0x05, 0x06],
        });
        let info = BeaconInfo::from_frame(&frame, None, -60, "dev-1".into()).unwrap();
        assert_eq!(info.id.kind(), BeaconKind::Uid);
        assert_eq!(info.tx_power, -20);
        assert_eq!(info.key, "uid:abababababababababab010203040506");
        assert!(info.has_rssi());
    }

    #[test]
    fn test_from_url_frame_exposes_url() {
        let frame = Frame::Url(UrlFrame {
            tx_power: -10,
            url: "https://example.com/".to_string(),
        });
        let info = BeaconInfo::from_frame(&frame, None, RSSI_UNREADABLE, "d".into()).unwrap();
        assert_eq!(info.id.url(), Some("https://example.com/"));
        assert!(!info.has_rssi());
    }

    #[test]
    fn test_from_eid_frame() {
        let frame = Frame::Eid(EidFrame {
            tx_power: 0,
            ephemeral_id: [1, 2, 3, 4, 5, 6, 7, 8],
        });
        let info = BeaconInfo::from_frame(&frame, None, -70, "d".into()).unwrap();
        assert_eq!(info.id.kind(), BeaconKind::Eid);
        assert_eq!(info.id.url(), None);
    }

    #[test]
    fn test_non_identity_frames_have_no_info() {
        assert!(BeaconInfo::from_frame(&Frame::Unknown, None, -50, "d".into()).is_none());
        let tlm = Frame::Telemetry(TelemetryFrame::new(vec![0x20, 0x00]));
        assert!(BeaconInfo::from_frame(&tlm, None, -50, "d".into()).is_none());
    }

    #[test]
    fn test_device_id_display() {
        let id = DeviceId::new("AA:BB:CC:DD:EE:FF");
        assert_eq!(id.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(id.as_str(), "AA:BB:CC:DD:EE:FF");
    }
}
