//! iBeacon advertising and the beacon GATT service
//!
//! Runs a GATT server that allows BLE clients to:
//! - Read the battery voltage
//! - Read and write the beacon setting (applied after a restart)
//! - Put the beacon into deep sleep
//!
//! Characteristic behaviour lives in bfox_mcu::gatt; this module only wires
//! it to NimBLE.

use crate::nvs::NvsStorage;
use crate::system::{restart_after, EspPower};
use bfox_mcu::advertising::{AdvertisingPlan, BeaconAdvertiser};
use bfox_mcu::gatt::{BeaconService, Characteristic, WriteOutcome};
use bfox_mcu::system::PowerControl;
use bfox_mcu::tx_power::RadioPowerLevel;
use esp32_nimble::enums::{PowerLevel, PowerType};
use esp32_nimble::{uuid128, utilities::BleUuid, BLEDevice, NimbleProperties};
use log::*;
use std::sync::{Arc, Mutex};

// These must match bfox_proto::ble::{SERVICE_UUID, VOLTAGE_UUID, ...}
const SERVICE_UUID: BleUuid = uuid128!("347fd67c-9131-4ea0-b0a7-1886d8c0f0df");
const VOLTAGE_UUID: BleUuid = uuid128!("53bf4a46-41ba-46a3-b675-4fb7f0770905");
const SETTING_UUID: BleUuid = uuid128!("096a09d5-1b35-4c99-a483-8d0c34f70220");
const SLEEP_UUID: BleUuid = uuid128!("0cf26a7e-650e-4c18-9a30-bbbca50d88c1");

/// GATT state shared by every characteristic callback
pub type SharedService = Arc<Mutex<BeaconService<NvsStorage>>>;

fn ble_uuid(characteristic: Characteristic) -> BleUuid {
    match characteristic {
        Characteristic::Voltage => VOLTAGE_UUID,
        Characteristic::Setting => SETTING_UUID,
        Characteristic::DeepSleep => SLEEP_UUID,
    }
}

fn properties(characteristic: Characteristic) -> NimbleProperties {
    let mut properties = NimbleProperties::empty();
    if characteristic.readable() {
        properties |= NimbleProperties::READ;
    }
    if characteristic.writable() {
        properties |= NimbleProperties::WRITE;
    }
    properties
}

fn power_level(level: RadioPowerLevel) -> PowerLevel {
    match level {
        RadioPowerLevel::N12 => PowerLevel::N12,
        RadioPowerLevel::P3 => PowerLevel::P3,
        RadioPowerLevel::P6 => PowerLevel::P6,
        RadioPowerLevel::P9 => PowerLevel::P9,
    }
}

/// Register the B-Fox service, one characteristic per `Characteristic`
pub fn register_service(ble_device: &BLEDevice, service: SharedService, on_sleep: fn()) {
    let server = ble_device.get_server();

    server.on_connect(|_server, desc| {
        info!("BLE client connected: {:?}", desc.address());
    });

    server.on_disconnect(|_desc, reason| {
        info!("BLE client disconnected: {:?}", reason);
    });

    let gatt_service = server.create_service(SERVICE_UUID);

    for characteristic in Characteristic::ALL {
        let handle = gatt_service
            .lock()
            .create_characteristic(ble_uuid(characteristic), properties(characteristic));

        if characteristic.readable() {
            let read_state = service.clone();
            handle.lock().on_read(move |value, _desc| {
                let Ok(state) = read_state.lock() else {
                    error!("BLE: service state poisoned");
                    return;
                };
                match state.read(characteristic) {
                    Ok(data) => {
                        value.set_value(&data);
                    }
                    Err(e) => warn!("BLE: read {:?} failed: {}", characteristic, e),
                }
            });
        }

        if characteristic.writable() {
            let write_state = service.clone();
            handle.lock().on_write(move |args| {
                let outcome = match write_state.lock() {
                    Ok(mut state) => state.write(characteristic, args.recv_data()),
                    Err(_) => {
                        error!("BLE: service state poisoned");
                        return;
                    }
                };
                match outcome {
                    Ok(WriteOutcome::Ignored) => {}
                    Ok(WriteOutcome::RestartAfter(delay)) => restart_after(delay),
                    Ok(WriteOutcome::DeepSleep) => {
                        on_sleep();
                        EspPower.deep_sleep();
                    }
                    Err(e) => warn!("BLE: write {:?} failed: {}", characteristic, e),
                }
            });
        }
    }

    info!("BLE GATT service registered");
}

/// NimBLE advertiser carrying the raw iBeacon frame
pub struct NimbleAdvertiser {
    ble_device: &'static mut BLEDevice,
}

impl NimbleAdvertiser {
    pub fn new(ble_device: &'static mut BLEDevice) -> Self {
        Self { ble_device }
    }
}

impl BeaconAdvertiser for NimbleAdvertiser {
    type Error = anyhow::Error;

    fn start(&mut self, plan: &AdvertisingPlan) -> anyhow::Result<()> {
        BLEDevice::set_device_name(&plan.device_name)
            .map_err(|e| anyhow::anyhow!("set device name: {:?}", e))?;

        for power_type in [PowerType::Default, PowerType::Advertising] {
            self.ble_device
                .set_power(power_type, power_level(plan.power))
                .map_err(|e| anyhow::anyhow!("set tx power: {:?}", e))?;
        }

        let mut advertising = self.ble_device.get_advertising().lock();
        advertising
            .min_interval(plan.interval_units)
            .max_interval(plan.interval_units);
        advertising
            .set_raw_data(&plan.frame)
            .map_err(|e| anyhow::anyhow!("set advertising data: {:?}", e))?;
        advertising
            .start()
            .map_err(|e| anyhow::anyhow!("start advertising: {:?}", e))?;

        info!(
            "Advertising as '{}' every {} units at {} dBm",
            plan.device_name,
            plan.interval_units,
            plan.power.dbm()
        );
        Ok(())
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        self.ble_device
            .get_advertising()
            .lock()
            .stop()
            .map_err(|e| anyhow::anyhow!("stop advertising: {:?}", e))
    }
}
