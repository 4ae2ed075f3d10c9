//! BlueZ backend built on `bluer`.

use futures::{pin_mut, StreamExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Radio, RadioError, RadioEvent, RadioResult, RadioSender, ScanFilter};
use crate::types::{DeviceId, RawAdvertisement, RSSI_UNREADABLE};

/// Radio backed by the default BlueZ adapter.
///
/// Adapter power is reported as readiness. Each scan request runs LE
/// discovery in its own task; stopping aborts the task, which ends the
/// discovery session.
pub struct BluezRadio {
    _session: bluer::Session,
    adapter: bluer::Adapter,
    events: RadioSender,
    power_monitor: JoinHandle<()>,
    discovery: Option<JoinHandle<()>>,
}

impl BluezRadio {
    /// Connect to BlueZ and start reporting adapter readiness on `events`.
    ///
    /// # Errors
    ///
    /// Returns an error if the Bluetooth daemon is unreachable or there is
    /// no adapter.
    pub async fn new(events: RadioSender) -> RadioResult<Self> {
        let session = bluer::Session::new()
            .await
            .map_err(|e| RadioError::SessionInitFailed {
                message: e.to_string(),
            })?;
        let adapter = session
            .default_adapter()
            .await
            .map_err(|_| RadioError::AdapterNotFound)?;

        let powered = adapter.is_powered().await.map_err(adapter_error)?;
        info!(adapter = %adapter.name(), powered, "Bluetooth adapter ready");
        let _ = events.send(RadioEvent::ReadinessChanged(powered));

        let adapter_events = adapter.events().await.map_err(adapter_error)?;
        let power_events = events.clone();
        let power_monitor = tokio::spawn(async move {
            pin_mut!(adapter_events);
            while let Some(event) = adapter_events.next().await {
                if let bluer::AdapterEvent::PropertyChanged(bluer::AdapterProperty::Powered(
                    powered,
                )) = event
                {
                    info!(powered, "Bluetooth adapter power changed");
                    if power_events.send(RadioEvent::ReadinessChanged(powered)).is_err() {
                        break;
                    }
                }
            }
        });

        Ok(Self {
            _session: session,
            adapter,
            events,
            power_monitor,
            discovery: None,
        })
    }
}

impl Radio for BluezRadio {
    fn request_scan(&mut self, filter: &ScanFilter) {
        if let Some(task) = self.discovery.take() {
            task.abort();
        }
        let adapter = self.adapter.clone();
        let events = self.events.clone();
        let filter = filter.clone();
        self.discovery = Some(tokio::spawn(async move {
            if let Err(e) = run_discovery(adapter, filter, events).await {
                warn!(error = %e, "Bluetooth discovery ended with an error");
            }
        }));
    }

    fn request_stop(&mut self) {
        if let Some(task) = self.discovery.take() {
            debug!("Stopping Bluetooth discovery");
            task.abort();
        }
    }
}

impl Drop for BluezRadio {
    fn drop(&mut self) {
        self.power_monitor.abort();
        if let Some(task) = self.discovery.take() {
            task.abort();
        }
    }
}

async fn run_discovery(
    adapter: bluer::Adapter,
    filter: ScanFilter,
    events: RadioSender,
) -> bluer::Result<()> {
    adapter
        .set_discovery_filter(bluer::DiscoveryFilter {
            uuids: filter.service_uuids.iter().copied().collect(),
            transport: bluer::DiscoveryTransport::Le,
            duplicate_data: filter.allow_duplicates,
            ..Default::default()
        })
        .await?;

    info!("Scanning for Eddystone beacons");
    let discovery = adapter.discover_devices_with_changes().await?;
    pin_mut!(discovery);

    while let Some(event) = discovery.next().await {
        let bluer::AdapterEvent::DeviceAdded(address) = event else {
            continue;
        };
        let device = adapter.device(address)?;

        let service_data = device.service_data().await.ok().flatten();
        let Some(data) = service_data.and_then(|mut map| {
            filter
                .service_uuids
                .iter()
                .find_map(|uuid| map.remove(uuid))
        }) else {
            debug!(%address, "Advertisement without Eddystone service data");
            continue;
        };
        let rssi = device
            .rssi()
            .await
            .ok()
            .flatten()
            .unwrap_or(RSSI_UNREADABLE);

        let advertisement = RawAdvertisement {
            device: DeviceId::new(address.to_string()),
            service_data: data,
            rssi,
        };
        if events.send(RadioEvent::Advertisement(advertisement)).is_err() {
            break;
        }
    }

    Ok(())
}

fn adapter_error(e: bluer::Error) -> RadioError {
    RadioError::Adapter {
        message: e.to_string(),
    }
}
