//! The beacon scanner engine.
//!
//! One tokio task owns the scanner controller, the telemetry correlator, the
//! presence registry and the expiry timers. Handle commands, radio events and
//! timer expiries are all processed on that task, so every read-modify-write
//! of the registry is serialized without a lock.
//!
//! ```text
//! RadioEvent ─┐
//! Command ────┼─> engine task ─> decode ─> correlate ─> registry ─> observer
//! Expired ────┘                                          └─> timers
//! ```
//!
//! Stopping bumps the session counter and clears the registry and timers.
//! Nothing from an older session reaches the observer.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::config::ScannerConfig;
use crate::frame::{self, Frame};
use crate::observer::BeaconObserver;
use crate::radio::{Radio, RadioEvent, RadioReceiver};
use crate::registry::{PresenceEntry, PresenceRegistry, Transition};
use crate::scanner::{ScanState, ScannerController};
use crate::telemetry::TelemetryCorrelator;
use crate::timer::{next_expired, DelayQueueTimer, Expired, ExpiryTimer};
use crate::types::{BeaconInfo, RawAdvertisement};

const COMMAND_BUFFER: usize = 32;

/// Errors from talking to the engine.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ScannerError {
    /// The engine task has exited.
    #[error("Beacon scanner engine has stopped")]
    EngineStopped,
}

/// Point-in-time engine status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerStatus {
    /// Scan lifecycle state.
    pub state: ScanState,
    /// Last readiness reported by the radio.
    pub radio_ready: bool,
    /// Beacons currently present.
    pub present: usize,
    /// Current session number.
    pub session: u64,
}

enum Command {
    Start(oneshot::Sender<()>),
    Stop(oneshot::Sender<()>),
    Snapshot(oneshot::Sender<Vec<PresenceEntry>>),
    Status(oneshot::Sender<ScannerStatus>),
}

/// Cloneable handle to a running engine.
///
/// The engine shuts down once every handle is dropped.
#[derive(Debug, Clone)]
pub struct ScannerHandle {
    commands: mpsc::Sender<Command>,
}

impl ScannerHandle {
    /// Start scanning, or defer until the radio is ready.
    ///
    /// # Errors
    ///
    /// Returns [`ScannerError::EngineStopped`] if the engine has exited.
    pub async fn start(&self) -> Result<(), ScannerError> {
        self.request(Command::Start).await
    }

    /// Stop scanning.
    ///
    /// Once this returns, no further event for the stopped session is
    /// delivered to the observer.
    ///
    /// # Errors
    ///
    /// Returns [`ScannerError::EngineStopped`] if the engine has exited.
    pub async fn stop(&self) -> Result<(), ScannerError> {
        self.request(Command::Stop).await
    }

    /// Beacons currently present, ordered by first sighting.
    ///
    /// # Errors
    ///
    /// Returns [`ScannerError::EngineStopped`] if the engine has exited.
    pub async fn snapshot(&self) -> Result<Vec<PresenceEntry>, ScannerError> {
        self.request(Command::Snapshot).await
    }

    /// Current engine status.
    ///
    /// # Errors
    ///
    /// Returns [`ScannerError::EngineStopped`] if the engine has exited.
    pub async fn status(&self) -> Result<ScannerStatus, ScannerError> {
        self.request(Command::Status).await
    }

    /// Whether a scan is running on the radio right now.
    ///
    /// # Errors
    ///
    /// Returns [`ScannerError::EngineStopped`] if the engine has exited.
    pub async fn is_scanning(&self) -> Result<bool, ScannerError> {
        Ok(self.status().await?.state == ScanState::Scanning)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ScannerError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| ScannerError::EngineStopped)?;
        response.await.map_err(|_| ScannerError::EngineStopped)
    }
}

/// Beacon presence tracking engine.
pub struct BeaconScanner<R, T = DelayQueueTimer> {
    controller: ScannerController<R>,
    correlator: TelemetryCorrelator,
    registry: PresenceRegistry,
    timers: T,
    observer: Arc<dyn BeaconObserver>,
    lost_timeout: Duration,
    session: u64,
}

impl<R: Radio> BeaconScanner<R, DelayQueueTimer> {
    /// Create an engine with the default timer backing.
    pub fn new(config: &ScannerConfig, radio: R, observer: Arc<dyn BeaconObserver>) -> Self {
        Self::with_timer(config, radio, DelayQueueTimer::new(), observer)
    }
}

impl<R: Radio, T: ExpiryTimer + 'static> BeaconScanner<R, T> {
    /// Create an engine with a custom [`ExpiryTimer`].
    pub fn with_timer(
        config: &ScannerConfig,
        radio: R,
        timers: T,
        observer: Arc<dyn BeaconObserver>,
    ) -> Self {
        Self {
            controller: ScannerController::new(radio, config.scan_filter()),
            correlator: TelemetryCorrelator::new(),
            registry: PresenceRegistry::new(),
            timers,
            observer,
            lost_timeout: config.lost_timeout(),
            session: 0,
        }
    }

    /// Run the engine on the current tokio runtime.
    ///
    /// `radio_events` must be the receiving half of the channel the radio
    /// backend reports on.
    pub fn spawn(self, radio_events: RadioReceiver) -> (ScannerHandle, JoinHandle<()>) {
        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(self.run(command_rx, radio_events));
        (ScannerHandle { commands }, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut radio_events: RadioReceiver,
    ) {
        let mut radio_open = true;
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                event = radio_events.recv(), if radio_open => match event {
                    Some(event) => self.handle_radio_event(event),
                    None => {
                        debug!("Radio event channel closed");
                        radio_open = false;
                    }
                },
                Some(expired) = next_expired(&mut self.timers) => self.handle_expired(expired),
            }
        }

        self.stop();
        debug!("Beacon scanner engine exited");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start(reply) => {
                self.controller.start();
                let _ = reply.send(());
            }
            Command::Stop(reply) => {
                self.stop();
                let _ = reply.send(());
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.registry.snapshot());
            }
            Command::Status(reply) => {
                let _ = reply.send(ScannerStatus {
                    state: self.controller.state(),
                    radio_ready: self.controller.is_ready(),
                    present: self.registry.len(),
                    session: self.session,
                });
            }
        }
    }

    fn handle_radio_event(&mut self, event: RadioEvent) {
        match event {
            RadioEvent::ReadinessChanged(ready) => self.controller.on_readiness_changed(ready),
            RadioEvent::Advertisement(advertisement) => self.handle_advertisement(advertisement),
        }
    }

    fn handle_advertisement(&mut self, advertisement: RawAdvertisement) {
        if !self.controller.is_active() {
            trace!(device = %advertisement.device, "Dropping advertisement while stopped");
            return;
        }

        let RawAdvertisement {
            device,
            service_data,
            rssi,
        } = advertisement;

        let frame = match frame::decode(&service_data) {
            Frame::Telemetry(telemetry) => {
                trace!(%device, "Holding telemetry for next identity frame");
                self.correlator.store(device, telemetry);
                return;
            }
            Frame::Unknown => {
                trace!(%device, len = service_data.len(), "Dropping undecodable service data");
                return;
            }
            frame => frame,
        };

        let telemetry = self.correlator.take_and_clear(&device);
        let Some(info) = BeaconInfo::from_frame(&frame, telemetry, rssi, device) else {
            return;
        };

        let key = info.key.clone();
        let session = self.session;
        let sighting = self.registry.observe(info, session);
        self.timers.schedule(key.clone(), sighting.stamp, self.lost_timeout);

        if !self.may_emit(session) {
            return;
        }
        if let Some(entry) = self.registry.get(&key) {
            match sighting.transition {
                Transition::Found => self.observer.on_found(&entry.info),
                Transition::Updated => self.observer.on_updated(&entry.info),
            }
        }
    }

    fn handle_expired(&mut self, expired: Expired) {
        let session = self.session;
        match self.registry.expire(&expired.key, session, expired.stamp) {
            Some(info) if self.may_emit(session) => self.observer.on_lost(&info),
            Some(_) => {}
            None => trace!(beacon = %expired.key, "Ignoring stale expiry"),
        }
    }

    fn may_emit(&self, session: u64) -> bool {
        session == self.session && self.controller.is_active()
    }

    fn stop(&mut self) {
        self.controller.stop();
        self.session += 1;
        let dropped = self.registry.len();
        self.registry.clear();
        self.timers.clear();
        self.correlator.clear();
        if dropped > 0 {
            info!(dropped, "Cleared beacon registry");
        }
    }
}
