//! Unified error types for the beaconwatch core library.
//!
//! Beacon tracking itself is infallible: malformed frames are dropped and
//! races resolve to no-ops. What can fail is setting things up (configuration,
//! the Bluetooth backend) and talking to an engine that has shut down. Each
//! module has its own error enum ([`ConfigError`](crate::config::ConfigError),
//! [`RadioError`](crate::radio::RadioError),
//! [`ScannerError`](crate::engine::ScannerError)); [`BeaconError`] unifies
//! them for callers such as the HTTP API.
//!
//! # Example
//!
//! ```rust
//! use beaconwatch_core::error::{BeaconError, Result};
//! use std::path::PathBuf;
//!
//! fn require_config(path: &PathBuf) -> Result<()> {
//!     if !path.exists() {
//!         return Err(BeaconError::ConfigNotFound(path.clone()));
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for beaconwatch operations.
#[derive(Debug, Error)]
pub enum BeaconError {
    // =========================================================================
    // BLUETOOTH ERRORS
    // =========================================================================
    /// No Bluetooth adapter was found on this system.
    #[error(
        "No Bluetooth adapter found. Ensure Bluetooth hardware is present and drivers are loaded."
    )]
    BluetoothAdapterNotFound,

    /// The Bluetooth backend could not be used.
    #[error("Bluetooth unavailable: {0}")]
    BluetoothUnavailable(String),

    // =========================================================================
    // SCANNER ERRORS
    // =========================================================================
    /// The scanner engine task is no longer running.
    #[error("Beacon scanner is not running")]
    ScannerStopped,

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration could not be loaded or parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // I/O ERRORS
    // =========================================================================
    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for beaconwatch operations.
pub type Result<T> = std::result::Result<T, BeaconError>;

impl BeaconError {
    /// Returns `true` if retrying later may succeed without user intervention.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::BluetoothUnavailable(_))
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::ConfigNotFound(_) => 404,
            Self::ConfigParseError(_) | Self::ConfigValidationError(_) => 422,
            Self::IoError(_) => 500,
            Self::BluetoothAdapterNotFound
            | Self::BluetoothUnavailable(_)
            | Self::ScannerStopped => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BluetoothAdapterNotFound => "BLUETOOTH_ADAPTER_NOT_FOUND",
            Self::BluetoothUnavailable(_) => "BLUETOOTH_UNAVAILABLE",
            Self::ScannerStopped => "SCANNER_STOPPED",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for BeaconError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::LoadError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::WriteError { source, .. } => Self::IoError(source),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

impl From<crate::radio::RadioError> for BeaconError {
    fn from(err: crate::radio::RadioError) -> Self {
        use crate::radio::RadioError;
        match err {
            RadioError::AdapterNotFound => Self::BluetoothAdapterNotFound,
            RadioError::SessionInitFailed { message } | RadioError::Adapter { message } => {
                Self::BluetoothUnavailable(message)
            }
        }
    }
}

impl From<crate::engine::ScannerError> for BeaconError {
    fn from(err: crate::engine::ScannerError) -> Self {
        match err {
            crate::engine::ScannerError::EngineStopped => Self::ScannerStopped,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
