//! Beacon lifecycle notifications.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::types::BeaconInfo;

/// Receives beacon lifecycle transitions.
///
/// Calls are made from the engine task, one at a time, and must not block.
pub trait BeaconObserver: Send + Sync {
    /// A beacon was sighted for the first time (or again after being lost).
    fn on_found(&self, info: &BeaconInfo);

    /// A present beacon was sighted again.
    fn on_updated(&self, info: &BeaconInfo);

    /// A beacon went unseen for the lost timeout. `info` is its last sighting.
    fn on_lost(&self, info: &BeaconInfo);
}

/// A lifecycle transition as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeaconEvent {
    /// See [`BeaconObserver::on_found`].
    Found(BeaconInfo),
    /// See [`BeaconObserver::on_updated`].
    Updated(BeaconInfo),
    /// See [`BeaconObserver::on_lost`].
    Lost(BeaconInfo),
}

impl BeaconEvent {
    /// The beacon the event is about.
    #[must_use]
    pub const fn info(&self) -> &BeaconInfo {
        match self {
            Self::Found(info) | Self::Updated(info) | Self::Lost(info) => info,
        }
    }
}

/// Forwards events into a tokio channel.
///
/// Events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<BeaconEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiver its events arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BeaconEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: BeaconEvent) {
        let _ = self.sender.send(event);
    }
}

impl BeaconObserver for ChannelObserver {
    fn on_found(&self, info: &BeaconInfo) {
        self.send(BeaconEvent::Found(info.clone()));
    }

    fn on_updated(&self, info: &BeaconInfo) {
        self.send(BeaconEvent::Updated(info.clone()));
    }

    fn on_lost(&self, info: &BeaconInfo) {
        self.send(BeaconEvent::Lost(info.clone()));
    }
}

/// Logs every transition through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl BeaconObserver for LoggingObserver {
    fn on_found(&self, info: &BeaconInfo) {
        info!(beacon = %info.key, rssi = info.rssi, "Found beacon");
    }

    fn on_updated(&self, info: &BeaconInfo) {
        debug!(
            beacon = %info.key,
            rssi = info.rssi,
            telemetry = info.telemetry.is_some(),
            "Updated beacon"
        );
    }

    fn on_lost(&self, info: &BeaconInfo) {
        info!(beacon = %info.key, "Lost beacon");
    }
}

/// Fans every event out to several observers, in insertion order.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn BeaconObserver>>,
}

impl ObserverSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer.
    #[must_use]
    pub fn with(mut self, observer: Arc<dyn BeaconObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Number of observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl BeaconObserver for ObserverSet {
    fn on_found(&self, info: &BeaconInfo) {
        for observer in &self.observers {
            observer.on_found(info);
        }
    }

    fn on_updated(&self, info: &BeaconInfo) {
        for observer in &self.observers {
            observer.on_updated(info);
        }
    }

    fn on_lost(&self, info: &BeaconInfo) {
        for observer in &self.observers {
            observer.on_lost(info);
        }
    }
}
