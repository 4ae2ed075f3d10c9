//! Application configuration management.
//!
//! Settings come from an optional TOML file overlaid with environment
//! variables of the form `BEACONWATCH__<SECTION>__<KEY>`, e.g.
//! `BEACONWATCH__SCANNER__LOST_TIMEOUT_SECS=30`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::radio::{ScanFilter, EDDYSTONE_SERVICE_UUID};

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "BEACONWATCH";

/// Default lost-beacon timeout in seconds.
pub const DEFAULT_LOST_TIMEOUT_SECS: u64 = 15;

/// Longest lost-beacon timeout accepted, in seconds (one day).
pub const MAX_LOST_TIMEOUT_SECS: u64 = 86_400;

/// Default proximity sampling window in seconds.
pub const DEFAULT_SAMPLE_WINDOW_SECS: u64 = 3;

/// Longest proximity sampling window accepted, in seconds.
pub const MAX_SAMPLE_WINDOW_SECS: u64 = 60;

/// Errors from loading, saving, or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration file was required but does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Reading, merging, or deserializing sources failed.
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] ::config::ConfigError),

    /// Serializing to TOML failed.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Writing the configuration file failed.
    #[error("Failed to write {}: {source}", path.display())]
    WriteError {
        /// File being written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A single field has an invalid value.
    #[error("{field}: {message}")]
    ValidationError {
        /// Dotted field path.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields have invalid values.
    #[error("{} validation errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Beacon scanning.
    pub scanner: ScannerConfig,

    /// HTTP server.
    pub server: ServerConfig,

    /// Logging output.
    pub logging: LoggingConfig,
}

/// Beacon scanning settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Seconds without a sighting before a beacon is lost.
    pub lost_timeout_secs: u64,

    /// Service UUID to scan for.
    pub service_uuid: Uuid,

    /// Report repeated advertisements from the same device.
    pub allow_duplicates: bool,

    /// Default proximity sampling window in seconds.
    pub sample_window_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            lost_timeout_secs: DEFAULT_LOST_TIMEOUT_SECS,
            service_uuid: EDDYSTONE_SERVICE_UUID,
            allow_duplicates: true,
            sample_window_secs: DEFAULT_SAMPLE_WINDOW_SECS,
        }
    }
}

impl ScannerConfig {
    /// The lost-beacon timeout.
    #[must_use]
    pub const fn lost_timeout(&self) -> Duration {
        Duration::from_secs(self.lost_timeout_secs)
    }

    /// Radio filter for these settings.
    #[must_use]
    pub fn scan_filter(&self) -> ScanFilter {
        ScanFilter {
            service_uuids: vec![self.service_uuid],
            allow_duplicates: self.allow_duplicates,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_address: String,

    /// Timeout for fetching beacon page titles, in seconds.
    pub title_fetch_timeout_secs: u64,
}

impl ServerConfig {
    /// Page title fetch timeout as a [`Duration`].
    #[must_use]
    pub const fn title_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.title_fetch_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            title_fetch_timeout_secs: 10,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// JSON file logging plus compact stdout instead of pretty stdout.
    pub production: bool,

    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            production: false,
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from `path`, which must exist, plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, or invalid.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Self::load_from(path, env_source())
    }

    /// Load from `path` if it exists, otherwise from defaults, plus
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file or an override is invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::load_from(path.as_ref(), env_source())
    }

    fn load_from(path: &Path, env: ::config::Environment) -> ConfigResult<Self> {
        let config: Self = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(env)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Write the configuration to `path` as TOML, creating parent dirs.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let write_error = |source| ConfigError::WriteError {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(write_error)?;
        Ok(())
    }

    /// Check every field, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns the validation error, or several wrapped together.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if !(1..=MAX_LOST_TIMEOUT_SECS).contains(&self.scanner.lost_timeout_secs) {
            errors.push(ConfigError::ValidationError {
                field: "scanner.lost_timeout_secs",
                message: format!("must be between 1 and {MAX_LOST_TIMEOUT_SECS}"),
            });
        }
        if !(1..=MAX_SAMPLE_WINDOW_SECS).contains(&self.scanner.sample_window_secs) {
            errors.push(ConfigError::ValidationError {
                field: "scanner.sample_window_secs",
                message: format!("must be between 1 and {MAX_SAMPLE_WINDOW_SECS}"),
            });
        }
        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ConfigError::ValidationError {
                field: "server.bind_address",
                message: format!("'{}' is not a socket address", self.server.bind_address),
            });
        }
        if self.server.title_fetch_timeout_secs == 0 {
            errors.push(ConfigError::ValidationError {
                field: "server.title_fetch_timeout_secs",
                message: "must be greater than 0".to_string(),
            });
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }

    /// Default configuration file location.
    ///
    /// On Linux: `/etc/beaconwatch/config.toml`.
    /// Elsewhere: the platform config dir, falling back to `./config.toml`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        #[cfg(target_os = "linux")]
        {
            PathBuf::from("/etc/beaconwatch/config.toml")
        }
        #[cfg(not(target_os = "linux"))]
        {
            directories::ProjectDirs::from("", "", "beaconwatch").map_or_else(
                || PathBuf::from("config.toml"),
                |dirs| dirs.config_dir().join("config.toml"),
            )
        }
    }
}

fn env_source() -> ::config::Environment {
    ::config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(pairs: &[(&str, &str)]) -> ::config::Environment {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        env_source().source(Some(map))
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.scanner.lost_timeout(), Duration::from_secs(15));
        assert_eq!(config.scanner.sample_window_secs, DEFAULT_SAMPLE_WINDOW_SECS);
        assert_eq!(config.scanner.scan_filter(), ScanFilter::eddystone());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = Config::load_from(&path, env_with(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_requires_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scanner]\nlost_timeout_secs = 30\n").unwrap();

        let config = Config::load_from(&path, env_with(&[])).unwrap();
        assert_eq!(config.scanner.lost_timeout_secs, 30);
        assert_eq!(config.scanner.service_uuid, EDDYSTONE_SERVICE_UUID);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scanner]\nlost_timeout_secs = 30\n").unwrap();

        let config = Config::load_from(
            &path,
            env_with(&[("BEACONWATCH__SCANNER__LOST_TIMEOUT_SECS", "45")]),
        )
        .unwrap();
        assert_eq!(config.scanner.lost_timeout_secs, 45);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.scanner.lost_timeout_secs = 20;
        config.server.bind_address = "127.0.0.1:8080".to_string();

        config.save(&path).unwrap();
        let loaded = Config::load_from(&path, env_with(&[])).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_values_are_collected() {
        let mut config = Config::default();
        config.scanner.lost_timeout_secs = 0;
        config.scanner.sample_window_secs = 0;
        config.server.bind_address = "nowhere".to_string();

        let Err(ConfigError::MultipleValidationErrors(errors)) = config.validate() else {
            panic!("expected multiple validation errors");
        };
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_single_invalid_value() {
        let mut config = Config::default();
        config.scanner.sample_window_secs = MAX_SAMPLE_WINDOW_SECS + 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scanner.sample_window_secs"));
    }

    #[test]
    fn test_lost_timeout_has_upper_bound() {
        let mut config = Config::default();
        config.scanner.lost_timeout_secs = MAX_LOST_TIMEOUT_SECS;
        assert!(config.validate().is_ok());

        config.scanner.lost_timeout_secs = 100_000_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scanner.lost_timeout_secs"));
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scanner]\nlost_timeout_secs = 0\n").unwrap();
        assert!(Config::load_from(&path, env_with(&[])).is_err());
    }

    #[test]
    fn test_default_path_is_toml() {
        assert_eq!(
            Config::default_path().extension().and_then(|e| e.to_str()),
            Some("toml")
        );
    }
}
