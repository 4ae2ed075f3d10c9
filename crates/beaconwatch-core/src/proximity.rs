//! Nearest-beacon ranking.
//!
//! [`ProximityAggregator`] is registered as an observer on the engine. During
//! a sampling window it accumulates the RSSI of every `Updated` sighting per
//! identity key, then ranks the keys by average RSSI, strongest first.
//!
//! `Found` sightings are not sampled, so a beacon heard only once during the
//! window is not ranked. Sightings carrying [`RSSI_UNREADABLE`] are skipped.
//!
//! Sampling starts and stops the engine it is given and stopping clears that
//! engine's registry, so give the aggregator an engine of its own when a
//! long-running scan must keep going alongside it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info};

use crate::engine::{ScannerError, ScannerHandle};
use crate::observer::BeaconObserver;
use crate::types::{BeaconInfo, RSSI_UNREADABLE};

/// One ranked beacon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedBeacon {
    /// Identity key.
    pub key: String,
    /// Most recent sampled sighting.
    pub info: BeaconInfo,
    /// Integer mean of the sampled RSSI values, truncated toward zero.
    pub average_rssi: i16,
    /// Number of sampled sightings.
    pub samples: u32,
}

#[derive(Debug)]
struct Samples {
    info: BeaconInfo,
    sum: i64,
    count: u32,
}

#[derive(Debug, Default)]
struct Accumulator {
    order: Vec<Samples>,
    index: HashMap<String, usize>,
}

impl Accumulator {
    fn record(&mut self, info: &BeaconInfo) {
        if let Some(&slot) = self.index.get(&info.key) {
            let samples = &mut self.order[slot];
            samples.sum += i64::from(info.rssi);
            samples.count += 1;
            samples.info = info.clone();
        } else {
            self.index.insert(info.key.clone(), self.order.len());
            self.order.push(Samples {
                info: info.clone(),
                sum: i64::from(info.rssi),
                count: 1,
            });
        }
    }

    fn ranked(&self) -> Vec<RankedBeacon> {
        let mut ranked: Vec<RankedBeacon> = self
            .order
            .iter()
            .filter(|samples| samples.count > 0)
            .map(|samples| RankedBeacon {
                key: samples.info.key.clone(),
                info: samples.info.clone(),
                average_rssi: average(samples.sum, samples.count),
                samples: samples.count,
            })
            .collect();
        // Stable: equal averages keep first-sampled order.
        ranked.sort_by(|a, b| b.average_rssi.cmp(&a.average_rssi));
        ranked
    }

    fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }
}

#[allow(clippy::cast_possible_truncation)]
fn average(sum: i64, count: u32) -> i16 {
    // RSSI samples are all within i16, so their mean is too.
    (sum / i64::from(count)) as i16
}

/// Observer that ranks beacons by average signal strength.
#[derive(Debug, Default)]
pub struct ProximityAggregator {
    samples: Mutex<Accumulator>,
    sampling: tokio::sync::Mutex<()>,
}

impl ProximityAggregator {
    /// Create an aggregator with no samples.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Drop all accumulated samples.
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Current ranking, strongest first.
    #[must_use]
    pub fn ranked(&self) -> Vec<RankedBeacon> {
        self.lock().ranked()
    }

    /// Scan for `window` and rank what was heard.
    ///
    /// Scanning is started through `handle` and stopped before the ranking is
    /// taken. Concurrent calls are serialized; each gets its own window.
    ///
    /// # Errors
    ///
    /// Returns [`ScannerError::EngineStopped`] if the engine has exited.
    pub async fn sample(
        &self,
        handle: &ScannerHandle,
        window: Duration,
    ) -> Result<Vec<RankedBeacon>, ScannerError> {
        let _window = self.sampling.lock().await;

        self.reset();
        handle.start().await?;
        debug!(?window, "Sampling beacon proximity");
        tokio::time::sleep(window).await;
        handle.stop().await?;

        let ranked = self.ranked();
        if let Some(nearest) = ranked.first() {
            info!(
                beacon = %nearest.key,
                average_rssi = nearest.average_rssi,
                candidates = ranked.len(),
                "Nearest beacon"
            );
        } else {
            info!("No beacons sampled");
        }
        Ok(ranked)
    }

    fn lock(&self) -> MutexGuard<'_, Accumulator> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BeaconObserver for ProximityAggregator {
    fn on_found(&self, _info: &BeaconInfo) {}

    fn on_updated(&self, info: &BeaconInfo) {
        if info.rssi != RSSI_UNREADABLE {
            self.lock().record(info);
        }
    }

    fn on_lost(&self, _info: &BeaconInfo) {}
}
