//! # beaconwatch-core
//!
//! Core logic for the beaconwatch Eddystone presence tracker.
//!
//! This crate provides:
//! - Eddystone frame decoding (UID, EID, URL and TLM) and URL encoding
//! - Beacon presence tracking with Found / Updated / Lost transitions
//! - Telemetry correlation between TLM frames and identity frames
//! - Nearest-beacon ranking over a sampling window
//! - Configuration loading, saving, and validation
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`frame`] - Service data parsing and URL compression
//! - [`identity`] - Stable identity keys for decoded frames
//! - [`telemetry`] - TLM readings and per-device correlation
//! - [`registry`] - Present beacons and their lost-timer stamps
//! - [`timer`] - Reschedulable per-key expiry timers
//! - [`radio`] - Bluetooth backends (BlueZ, and a mock for tests)
//! - [`scanner`] - Radio start/stop control with deferred start
//! - [`engine`] - The single-task engine tying the above together
//! - [`observer`] - Lifecycle notification sinks
//! - [`proximity`] - RSSI averaging and ranking
//! - [`config`] - Application configuration
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared beacon types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use beaconwatch_core::{
//!     radio::{mock::MockRadio, radio_channel},
//!     BeaconScanner, Config, LoggingObserver,
//! };
//!
//! # async fn run() {
//! let config = Config::default();
//! let (_radio_events, radio_rx) = radio_channel();
//! let scanner = BeaconScanner::new(&config.scanner, MockRadio::new(), Arc::new(LoggingObserver));
//! let (handle, _task) = scanner.spawn(radio_rx);
//! handle.start().await.ok();
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod identity;
pub mod observer;
pub mod proximity;
pub mod radio;
pub mod registry;
pub mod scanner;
pub mod telemetry;
pub mod timer;
pub mod types;

// Re-export primary types for convenience
pub use config::{Config, ConfigError, ConfigResult, LoggingConfig, ScannerConfig, ServerConfig};
pub use engine::{BeaconScanner, ScannerError, ScannerHandle, ScannerStatus};
pub use error::{BeaconError, Result};
pub use frame::{Frame, TelemetryFrame};
pub use observer::{BeaconEvent, BeaconObserver, ChannelObserver, LoggingObserver, ObserverSet};
pub use proximity::{ProximityAggregator, RankedBeacon};
pub use radio::{Radio, RadioError, RadioEvent, ScanFilter};
pub use registry::PresenceEntry;
pub use scanner::ScanState;
pub use telemetry::TelemetryReadings;
pub use types::{BeaconId, BeaconInfo, BeaconKind, DeviceId, RawAdvertisement, RSSI_UNREADABLE};
