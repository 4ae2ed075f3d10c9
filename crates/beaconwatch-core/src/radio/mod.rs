//! Radio layer seam.
//!
//! The engine never talks to Bluetooth directly. A [`Radio`] accepts
//! fire-and-forget scan requests, and reports readiness changes and
//! advertisements back through a [`RadioSender`].
//!
//! Backends:
//! - [`BluezRadio`] (feature `bluetooth`): BlueZ via `bluer`
//! - [`mock::MockRadio`] (feature `mock-bluetooth`, or without `bluetooth`)

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::types::RawAdvertisement;

#[cfg(feature = "bluetooth")]
mod bluez;
#[cfg(any(test, feature = "mock-bluetooth", not(feature = "bluetooth")))]
pub mod mock;

#[cfg(feature = "bluetooth")]
pub use bluez::BluezRadio;

/// The Eddystone 16-bit service UUID `0xFEAA` in 128-bit form.
pub const EDDYSTONE_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_feaa_0000_1000_8000_0080_5f9b_34fb);

/// What the radio should scan for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilter {
    /// Only report advertisements for these services.
    pub service_uuids: Vec<Uuid>,

    /// Report every advertisement, not just the first per device.
    pub allow_duplicates: bool,
}

impl ScanFilter {
    /// Eddystone beacons, duplicates included.
    #[must_use]
    pub fn eddystone() -> Self {
        Self {
            service_uuids: vec![EDDYSTONE_SERVICE_UUID],
            allow_duplicates: true,
        }
    }
}

impl Default for ScanFilter {
    fn default() -> Self {
        Self::eddystone()
    }
}

/// Events a radio delivers to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    /// The radio became able (`true`) or unable (`false`) to scan.
    ReadinessChanged(bool),

    /// An advertisement carrying Eddystone service data.
    Advertisement(RawAdvertisement),
}

/// Sending half of the radio event channel.
pub type RadioSender = mpsc::UnboundedSender<RadioEvent>;

/// Receiving half of the radio event channel.
pub type RadioReceiver = mpsc::UnboundedReceiver<RadioEvent>;

/// Create the channel a radio backend reports through.
#[must_use]
pub fn radio_channel() -> (RadioSender, RadioReceiver) {
    mpsc::unbounded_channel()
}

/// Scan control for a radio backend.
///
/// Both calls return immediately; failures are logged by the backend and
/// surface only as missing advertisements.
pub trait Radio: Send + 'static {
    /// Start (or restart) scanning with `filter`.
    fn request_scan(&mut self, filter: &ScanFilter);

    /// Stop scanning. Stopping an idle radio is a no-op.
    fn request_stop(&mut self);
}

/// Errors from setting up a radio backend.
#[derive(Debug, Error)]
pub enum RadioError {
    /// No adapter is present.
    #[error("No Bluetooth adapter found")]
    AdapterNotFound,

    /// Connecting to the Bluetooth daemon failed.
    #[error("Failed to initialize Bluetooth session: {message}")]
    SessionInitFailed {
        /// Backend error text.
        message: String,
    },

    /// The adapter could not be queried or watched.
    #[error("Bluetooth adapter error: {message}")]
    Adapter {
        /// Backend error text.
        message: String,
    },
}

/// Result type for radio setup.
pub type RadioResult<T> = std::result::Result<T, RadioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eddystone_uuid_text() {
        assert_eq!(
            EDDYSTONE_SERVICE_UUID.to_string(),
            "0000feaa-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_default_filter_is_eddystone() {
        let filter = ScanFilter::default();
        assert_eq!(filter.service_uuids, vec![EDDYSTONE_SERVICE_UUID]);
        assert!(filter.allow_duplicates);
    }

    #[test]
    fn test_radio_error_messages() {
        let err = RadioError::SessionInitFailed {
            message: "dbus unavailable".into(),
        };
        assert!(err.to_string().contains("dbus unavailable"));
        assert!(RadioError::AdapterNotFound.to_string().contains("No Bluetooth adapter"));
    }
}
