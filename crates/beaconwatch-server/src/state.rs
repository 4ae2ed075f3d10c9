//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Instant;

use beaconwatch_core::radio::{radio_channel, Radio, RadioReceiver};
use beaconwatch_core::{BeaconScanner, Config, LoggingObserver, ProximityAggregator, ScannerHandle};
use tracing::info;
#[cfg(any(feature = "mock-bluetooth", not(feature = "bluetooth")))]
use tracing::warn;

use crate::pages::TitleResolver;

/// Handle passed to every axum handler.
pub type SharedState = AppState;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    scanner: ScannerHandle,
    sampler: ScannerHandle,
    proximity: Arc<ProximityAggregator>,
    titles: TitleResolver,
    started_at: Instant,
}

impl AppState {
    /// Spawn the beacon engines on the platform radio and wrap them.
    ///
    /// # Errors
    ///
    /// Returns an error if the Bluetooth backend or the HTTP client cannot
    /// be initialized.
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        let (presence, presence_events) = platform_radio().await?;
        let (sampling, sampling_events) = platform_radio().await?;
        Self::with_radios(config, (presence, presence_events), (sampling, sampling_events))
    }

    /// Spawn the beacon engines and wrap them.
    ///
    /// `presence` drives the long-running scan behind `/api/beacons`;
    /// `sampling` is used only by proximity samples, so a sample never
    /// stops or clears the presence scan. Each radio comes with the receiver
    /// it reports on. Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn with_radios<R: Radio, S: Radio>(
        config: Config,
        presence: (R, RadioReceiver),
        sampling: (S, RadioReceiver),
    ) -> anyhow::Result<Self> {
        let (radio, radio_events) = presence;
        let (scanner, _engine) =
            BeaconScanner::new(&config.scanner, radio, Arc::new(LoggingObserver))
                .spawn(radio_events);

        let proximity = ProximityAggregator::new();
        let (radio, radio_events) = sampling;
        let (sampler, _engine) =
            BeaconScanner::new(&config.scanner, radio, proximity.clone()).spawn(radio_events);
        info!(
            lost_timeout_secs = config.scanner.lost_timeout_secs,
            "Beacon engines started"
        );

        let titles = TitleResolver::new(config.server.title_fetch_timeout())?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                scanner,
                sampler,
                proximity,
                titles,
                started_at: Instant::now(),
            }),
        })
    }

    /// Loaded configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Handle to the presence engine.
    #[must_use]
    pub fn scanner(&self) -> &ScannerHandle {
        &self.inner.scanner
    }

    /// Handle to the engine proximity samples run on.
    #[must_use]
    pub fn sampler(&self) -> &ScannerHandle {
        &self.inner.sampler
    }

    /// Proximity aggregator observing the sampling engine.
    #[must_use]
    pub fn proximity(&self) -> &ProximityAggregator {
        &self.inner.proximity
    }

    /// Page title resolver.
    #[must_use]
    pub fn titles(&self) -> &TitleResolver {
        &self.inner.titles
    }

    /// Seconds since the state was created.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}

#[cfg(all(feature = "bluetooth", not(feature = "mock-bluetooth")))]
async fn platform_radio() -> anyhow::Result<(beaconwatch_core::radio::BluezRadio, RadioReceiver)> {
    let (events, radio_events) = radio_channel();
    let radio = beaconwatch_core::radio::BluezRadio::new(events)
        .await
        .map_err(beaconwatch_core::BeaconError::from)?;
    Ok((radio, radio_events))
}

#[cfg(any(feature = "mock-bluetooth", not(feature = "bluetooth")))]
#[allow(clippy::unused_async)]
async fn platform_radio(
) -> anyhow::Result<(beaconwatch_core::radio::mock::MockRadio, RadioReceiver)> {
    warn!("Built without Bluetooth support, using mock radio");
    let (events, radio_events) = radio_channel();
    drop(events);
    Ok((beaconwatch_core::radio::mock::MockRadio::new(), radio_events))
}
