//! Radio lifecycle control.
//!
//! A start request made while the radio is not ready is remembered and
//! carried out on the next readiness notification, exactly once.

use tracing::{debug, info};

use crate::radio::{Radio, ScanFilter};

/// Where the controller is in the scan lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// No scan wanted.
    Idle,
    /// Scan wanted, waiting for the radio to become ready.
    Pending,
    /// Scan requested from a ready radio.
    Scanning,
}

/// Owns a [`Radio`] and decides when to start and stop it.
#[derive(Debug)]
pub struct ScannerController<R> {
    radio: R,
    filter: ScanFilter,
    ready: bool,
    state: ScanState,
}

impl<R: Radio> ScannerController<R> {
    /// Wrap `radio`; it is assumed not ready until told otherwise.
    pub const fn new(radio: R, filter: ScanFilter) -> Self {
        Self {
            radio,
            filter,
            ready: false,
            state: ScanState::Idle,
        }
    }

    /// Ask for scanning. Deferred until the radio is ready.
    pub fn start(&mut self) {
        match self.state {
            ScanState::Scanning => {}
            ScanState::Idle | ScanState::Pending if self.ready => self.begin_scan(),
            ScanState::Idle | ScanState::Pending => {
                debug!("Radio not ready, deferring scan");
                self.state = ScanState::Pending;
            }
        }
    }

    /// Stop scanning regardless of readiness.
    pub fn stop(&mut self) {
        self.radio.request_stop();
        if self.state != ScanState::Idle {
            info!("Stopped scanning");
        }
        self.state = ScanState::Idle;
    }

    /// Record a readiness change from the radio.
    ///
    /// Losing readiness while scanning moves back to pending so the scan is
    /// requested again once the radio returns.
    pub fn on_readiness_changed(&mut self, ready: bool) {
        self.ready = ready;
        match (ready, self.state) {
            (true, ScanState::Pending) => self.begin_scan(),
            (false, ScanState::Scanning) => {
                info!("Radio no longer ready, scan will resume when it returns");
                self.state = ScanState::Pending;
            }
            _ => {}
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ScanState {
        self.state
    }

    /// Whether scanning is wanted (scanning or pending).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state != ScanState::Idle
    }

    /// Last readiness reported by the radio.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    fn begin_scan(&mut self) {
        info!(services = ?self.filter.service_uuids, "Starting to scan for Eddystones");
        self.radio.request_scan(&self.filter);
        self.state = ScanState::Scanning;
    }
}
