//! Telemetry (TLM) correlation.
//!
//! TLM frames carry no beacon identity. A beacon interleaves them with its
//! identity frames, so the only link is the transport device identifier of
//! advertisements seen close together. The correlator keeps the latest TLM
//! per device and hands it to the next identity frame from that device.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;
use utoipa::ToSchema;

use crate::frame::TelemetryFrame;
use crate::types::DeviceId;

const TLM_UNENCRYPTED: u8 = 0x00;
const TLM_UNENCRYPTED_LEN: usize = 14;
const BATTERY_NOT_SUPPORTED: u16 = 0;
const TEMPERATURE_NOT_SUPPORTED: u16 = 0x8000;

/// Pending telemetry per device.
#[derive(Debug, Default)]
pub struct TelemetryCorrelator {
    pending: HashMap<DeviceId, TelemetryFrame>,
}

impl TelemetryCorrelator {
    /// Create an empty correlator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `frame` as the latest telemetry for `device`.
    ///
    /// Older pending telemetry for the device is replaced.
    pub fn store(&mut self, device: DeviceId, frame: TelemetryFrame) {
        if let Some(replaced) = self.pending.insert(device, frame) {
            trace!(version = ?replaced.version(), "Replaced pending telemetry");
        }
    }

    /// Remove and return the pending telemetry for `device`.
    pub fn take_and_clear(&mut self, device: &DeviceId) -> Option<TelemetryFrame> {
        self.pending.remove(device)
    }

    /// Drop all pending telemetry.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Decoded fields of an unencrypted TLM frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TelemetryReadings {
    /// Battery voltage in millivolts, if the beacon reports it.
    #[schema(example = 3000)]
    pub battery_mv: Option<u16>,

    /// Beacon temperature in degrees Celsius, if the beacon reports it.
    #[schema(example = 21.5)]
    pub temperature_celsius: Option<f32>,

    /// Advertising PDUs sent since power-on or reboot.
    #[schema(example = 1024)]
    pub advertisement_count: u32,

    /// Time since power-on or reboot, in 0.1 second units.
    #[schema(example = 36000)]
    pub uptime_deciseconds: u32,
}

impl TelemetryReadings {
    /// Parse raw TLM service data (frame type byte included).
    #[must_use]
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < TLM_UNENCRYPTED_LEN || data[1] != TLM_UNENCRYPTED {
            return None;
        }

        let battery = u16::from_be_bytes([data[2], data[3]]);
        let temperature = u16::from_be_bytes([data[4], data[5]]);

        Some(Self {
            battery_mv: (battery != BATTERY_NOT_SUPPORTED).then_some(battery),
            temperature_celsius: (temperature != TEMPERATURE_NOT_SUPPORTED)
                .then(|| f32::from(i16::from_be_bytes([data[4], data[5]])) / 256.0),
            advertisement_count: u32::from_be_bytes([data[6], data[7], data[8], data[9]]),
            uptime_deciseconds: u32::from_be_bytes([data[10], data[11], data[12], data[13]]),
        })
    }
}
