//! In-memory radio for tests and machines without BlueZ.
//!
//! [`MockRadio`] records scan requests; advertisements are injected by
//! sending [`RadioEvent`](super::RadioEvent)s on the channel handed to the
//! engine. The helper constructors build advertisements with valid
//! Eddystone service data.

use std::sync::{Arc, Mutex, PoisonError};

use super::{Radio, ScanFilter};
use crate::frame::{self, FRAME_TYPE_EID, FRAME_TYPE_TLM, FRAME_TYPE_UID};
use crate::types::{DeviceId, RawAdvertisement};

/// A request the engine made of the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioRequest {
    /// `request_scan` with this filter.
    Scan(ScanFilter),
    /// `request_stop`.
    Stop,
}

/// Radio that only records what it was asked to do.
///
/// Clones share the same request log.
#[derive(Debug, Clone, Default)]
pub struct MockRadio {
    requests: Arc<Mutex<Vec<RadioRequest>>>,
}

impl MockRadio {
    /// Create a radio with an empty request log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RadioRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many scans were requested.
    #[must_use]
    pub fn scan_count(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| matches!(r, RadioRequest::Scan(_)))
            .count()
    }

    fn record(&self, request: RadioRequest) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }
}

impl Radio for MockRadio {
    fn request_scan(&mut self, filter: &ScanFilter) {
        self.record(RadioRequest::Scan(filter.clone()));
    }

    fn request_stop(&mut self) {
        self.record(RadioRequest::Stop);
    }
}

/// A UID frame advertisement.
#[must_use]
pub fn uid_advertisement(
    device: impl Into<DeviceId>,
    namespace: [u8; 10],
    instance: [u8; 6],
    rssi: i16,
) -> RawAdvertisement {
    let mut service_data = vec![FRAME_TYPE_UID, 0xEE];
    service_data.extend_from_slice(&namespace);
    service_data.extend_from_slice(&instance);
    RawAdvertisement {
        device: device.into(),
        service_data,
        rssi,
    }
}

/// An EID frame advertisement.
#[must_use]
pub fn eid_advertisement(
    device: impl Into<DeviceId>,
    ephemeral_id: [u8; 8],
    rssi: i16,
) -> RawAdvertisement {
    let mut service_data = vec![FRAME_TYPE_EID, 0xEE];
    service_data.extend_from_slice(&ephemeral_id);
    RawAdvertisement {
        device: device.into(),
        service_data,
        rssi,
    }
}

/// A URL frame advertisement.
///
/// URLs without an encodable scheme produce service data that decodes as
/// unknown.
#[must_use]
pub fn url_advertisement(device: impl Into<DeviceId>, url: &str, rssi: i16) -> RawAdvertisement {
    RawAdvertisement {
        device: device.into(),
        service_data: frame::url_frame_bytes(-18, url).unwrap_or_default(),
        rssi,
    }
}

/// An unencrypted TLM frame advertisement.
#[must_use]
pub fn telemetry_advertisement(
    device: impl Into<DeviceId>,
    battery_mv: u16,
    advertisement_count: u32,
    rssi: i16,
) -> RawAdvertisement {
    let mut service_data = vec![FRAME_TYPE_TLM, 0x00];
    service_data.extend_from_slice(&battery_mv.to_be_bytes());
    service_data.extend_from_slice(&[0x80, 0x00]);
    service_data.extend_from_slice(&advertisement_count.to_be_bytes());
    service_data.extend_from_slice(&0u32.to_be_bytes());
    RawAdvertisement {
        device: device.into(),
        service_data,
        rssi,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    #[test]
    fn test_requests_are_shared_between_clones() {
        let radio = MockRadio::new();
        let mut handle = radio.clone();
        handle.request_scan(&ScanFilter::eddystone());
        handle.request_stop();

        assert_eq!(
            radio.requests(),
            vec![RadioRequest::Scan(ScanFilter::eddystone()), RadioRequest::Stop]
        );
        assert_eq!(radio.scan_count(), 1);
    }

    #[test]
    fn test_fixtures_decode() {
        let uid = uid_advertisement("d", [1; 10], [2; 6], -50);
        assert!(matches!(frame::decode(&uid.service_data), Frame::Uid(_)));

        let eid = eid_advertisement("d", [3; 8], -50);
        assert!(matches!(frame::decode(&eid.service_data), Frame::Eid(_)));

        let url = url_advertisement("d", "https://example.com/", -50);
        assert!(matches!(frame::decode(&url.service_data), Frame::Url(_)));

        let tlm = telemetry_advertisement("d", 2900, 10, -50);
        let Frame::Telemetry(frame) = frame::decode(&tlm.service_data) else {
            panic!("expected telemetry");
        };
        let readings = frame.readings().unwrap();
        assert_eq!(readings.battery_mv, Some(2900));
        assert_eq!(readings.temperature_celsius, None);
        assert_eq!(readings.advertisement_count, 10);
    }

    #[test]
    fn test_unencodable_url_is_unknown() {
        let adv = url_advertisement("d", "gopher://x", -50);
        assert_eq!(frame::decode(&adv.service_data), Frame::Unknown);
    }
}
