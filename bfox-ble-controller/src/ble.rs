//! BLE client for B-Fox beacons
//!
//! Beacons advertise a plain iBeacon frame, so they are recognised by their
//! manufacturer data rather than by name. Configuration goes through the
//! B-Fox GATT service.

use bfox_mcu::filter::AdvertisementFilter;
use bfox_mcu::registry::{BeaconRegistry, BeaconSighting};
use bfox_proto::ble::{SERVICE_UUID, SETTING_UUID, SLEEP_UUID, VOLTAGE_UUID, commands};
use bfox_proto::{
    BFOX_PROXIMITY_UUID, IBeacon, SettingsLayout, SettingsPayload, WireError,
    frame_from_manufacturer_data,
};
use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// How long `find_device` listens before giving up
const FIND_SCAN_SECS: u64 = 5;

/// How often `track` reports the ranked beacon list
pub const REFRESH_PERIOD: Duration = Duration::from_secs(1);

/// A discovered BLE device, with its beacon frame when it sent one
#[derive(Debug, Clone)]
pub struct BeaconDevice {
    pub name: String,
    pub address: String,
    pub rssi: Option<i16>,
    pub beacon: Option<IBeacon>,
}

impl BeaconDevice {
    pub fn is_bfox(&self) -> bool {
        self.beacon.is_some_and(|b| b.proximity_uuid == BFOX_PROXIMITY_UUID)
    }
}

/// Decode the iBeacon frame hidden in manufacturer specific data
pub fn beacon_from_manufacturer_data(data: &HashMap<u16, Vec<u8>>) -> Option<IBeacon> {
    data.iter()
        .filter_map(|(&company_id, payload)| frame_from_manufacturer_data(company_id, payload))
        .find_map(|frame| IBeacon::from_bytes(&frame).ok())
}

/// Run manufacturer data through the same filter a receiver uses
pub fn sighting_from_manufacturer_data(
    filter: &AdvertisementFilter,
    data: &HashMap<u16, Vec<u8>>,
    rssi: i16,
    now_ms: u64,
) -> Option<BeaconSighting> {
    data.iter()
        .filter_map(|(&company_id, payload)| frame_from_manufacturer_data(company_id, payload))
        .find_map(|frame| filter.accept(&frame, i32::from(rssi), now_ms))
}

/// Decode a setting read, accepting beacons that predate the interval field
pub fn decode_settings(data: &[u8]) -> Result<SettingsPayload, WireError> {
    SettingsPayload::from_bytes(data, SettingsLayout::Current)
        .or_else(|_| SettingsPayload::from_bytes(data, SettingsLayout::Legacy))
}

fn parse_uuid(s: &str) -> Result<Uuid, Box<dyn std::error::Error>> {
    Ok(Uuid::parse_str(s)?)
}

/// Get the default Bluetooth adapter
pub async fn get_adapter() -> Result<Adapter, Box<dyn std::error::Error>> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters.into_iter().next().ok_or_else(|| "No Bluetooth adapter found".into())
}

/// Scan for BLE devices
///
/// Returns everything seen; B-Fox beacons answer `true` to `is_bfox()`.
pub async fn scan(duration_secs: u64) -> Result<Vec<BeaconDevice>, Box<dyn std::error::Error>> {
    let adapter = get_adapter().await?;

    adapter.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(Duration::from_secs(duration_secs)).await;

    let peripherals = adapter.peripherals().await?;
    let mut devices = Vec::new();

    for peripheral in peripherals {
        if let Some(props) = peripheral.properties().await? {
            devices.push(BeaconDevice {
                name: props.local_name.unwrap_or_else(|| "Unknown".to_string()),
                address: peripheral.address().to_string(),
                rssi: props.rssi,
                beacon: beacon_from_manufacturer_data(&props.manufacturer_data),
            });
        }
    }

    adapter.stop_scan().await?;
    Ok(devices)
}

/// Track the beacons of one major for `duration_secs`
///
/// Sightings go through the receiver's filter and expiring registry;
/// `on_refresh` gets the ranked snapshot every `REFRESH_PERIOD`.
pub async fn track<F>(
    major: u16,
    duration_secs: u64,
    expiry_ms: u64,
    mut on_refresh: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnMut(&[BeaconSighting]),
{
    let adapter = get_adapter().await?;
    let filter = AdvertisementFilter::new(BFOX_PROXIMITY_UUID, major);
    let registry = BeaconRegistry::new(expiry_ms);

    let mut events = adapter.events().await?;
    adapter.start_scan(ScanFilter::default()).await?;

    let started = Instant::now();
    let now_ms = || started.elapsed().as_millis() as u64;
    let deadline = tokio::time::sleep(Duration::from_secs(duration_secs));
    tokio::pin!(deadline);
    let mut refresh = tokio::time::interval(REFRESH_PERIOD);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = refresh.tick() => {
                on_refresh(&registry.snapshot_sorted_by_rssi(now_ms()));
            }
            event = events.next() => {
                let Some(event) = event else { break };
                if let CentralEvent::ManufacturerDataAdvertisement {
                    id,
                    manufacturer_data,
                } = event
                {
                    // the event carries no RSSI, the peripheral's properties do
                    let rssi = match adapter.peripheral(&id).await {
                        Ok(peripheral) => peripheral
                            .properties()
                            .await
                            .ok()
                            .flatten()
                            .and_then(|props| props.rssi),
                        Err(_) => None,
                    };
                    if let Some(sighting) = rssi.and_then(|rssi| {
                        sighting_from_manufacturer_data(&filter, &manufacturer_data, rssi, now_ms())
                    }) {
                        registry.upsert(sighting);
                    }
                }
            }
        }
    }

    adapter.stop_scan().await?;
    Ok(())
}

/// Find a device by name/address pattern, or the first B-Fox beacon
pub async fn find_device(target: Option<&str>) -> Result<Peripheral, Box<dyn std::error::Error>> {
    let adapter = get_adapter().await?;

    adapter.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(Duration::from_secs(FIND_SCAN_SECS)).await;

    let peripherals = adapter.peripherals().await?;

    for peripheral in peripherals {
        if let Some(props) = peripheral.properties().await? {
            let name = props.local_name.unwrap_or_default();
            let addr = peripheral.address().to_string();

            let matches = match target {
                Some(t) => name.contains(t) || addr.contains(t),
                None => beacon_from_manufacturer_data(&props.manufacturer_data)
                    .is_some_and(|b| b.proximity_uuid == BFOX_PROXIMITY_UUID),
            };

            if matches {
                adapter.stop_scan().await?;
                return Ok(peripheral);
            }
        }
    }

    adapter.stop_scan().await?;
    Err("No B-Fox beacon found".into())
}

/// Connect and discover the B-Fox service
async fn connect(target: Option<&str>) -> Result<Peripheral, Box<dyn std::error::Error>> {
    let device = find_device(target).await?;

    device.connect().await?;
    device.discover_services().await?;

    let service_uuid = parse_uuid(SERVICE_UUID)?;
    if !device.services().iter().any(|s| s.uuid == service_uuid) {
        let _ = device.disconnect().await;
        return Err("B-Fox service not found".into());
    }

    Ok(device)
}

fn characteristic(
    device: &Peripheral,
    uuid: &str,
    what: &str,
) -> Result<Characteristic, Box<dyn std::error::Error>> {
    let uuid = parse_uuid(uuid)?;
    device
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == uuid)
        .ok_or_else(|| format!("{} characteristic not found", what).into())
}

/// Read the beacon's current setting
pub async fn read_settings(
    target: Option<&str>,
) -> Result<SettingsPayload, Box<dyn std::error::Error>> {
    let device = connect(target).await?;

    let setting_char = characteristic(&device, SETTING_UUID, "Setting")?;
    let data = device.read(&setting_char).await?;

    device.disconnect().await?;
    Ok(decode_settings(&data)?)
}

/// Write a new setting; the beacon restarts a few seconds later to apply it
pub async fn write_settings(
    target: Option<&str>,
    setting: &SettingsPayload,
) -> Result<(), Box<dyn std::error::Error>> {
    if setting.device_name.is_empty() {
        return Err("Device name must not be empty".into());
    }
    let payload = setting.to_bytes()?;

    let device = connect(target).await?;
    let setting_char = characteristic(&device, SETTING_UUID, "Setting")?;
    device.write(&setting_char, &payload, WriteType::WithResponse).await?;

    // the beacon drops the link when it restarts
    let _ = device.disconnect().await;
    Ok(())
}

/// Put the beacon into deep sleep
pub async fn deep_sleep(target: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let device = connect(target).await?;

    let sleep_char = characteristic(&device, SLEEP_UUID, "Sleep")?;
    device
        .write(&sleep_char, &[commands::DEEP_SLEEP], WriteType::WithResponse)
        .await?;

    let _ = device.disconnect().await;
    Ok(())
}

/// Read the battery voltage in volts
pub async fn read_voltage(target: Option<&str>) -> Result<f32, Box<dyn std::error::Error>> {
    let device = connect(target).await?;

    let voltage_char = characteristic(&device, VOLTAGE_UUID, "Voltage")?;
    let data = device.read(&voltage_char).await?;

    device.disconnect().await?;
    let raw: [u8; 2] = data
        .get(..2)
        .and_then(|b| b.try_into().ok())
        .ok_or("Voltage reading too short")?;
    Ok(f32::from(i16::from_le_bytes(raw)) / 100.0)
}
