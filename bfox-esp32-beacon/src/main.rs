//! B-Fox Beacon for ESP32
//!
//! Broadcasts an iBeacon advertisement and serves the B-Fox GATT service
//! so a phone or the `bfox-ble` tool can reconfigure it.

mod battery;
mod ble;
mod nvs;
mod system;

use bfox_mcu::advertising::{AdvertisingPlan, BeaconAdvertiser};
use bfox_mcu::battery::BatteryMonitor;
use bfox_mcu::config::BeaconConfig;
use bfox_mcu::gatt::BeaconService;
use bfox_mcu::settings::{DeviceSetting, NVS_NAMESPACE};
use bfox_mcu::system::PowerControl;
use bfox_proto::BFOX_PROXIMITY_UUID;
use esp32_nimble::BLEDevice;
use esp_idf_svc::{
    hal::{
        gpio::{Gpio17, Output, PinDriver},
        prelude::Peripherals,
    },
    nvs::EspDefaultNvsPartition,
};
use log::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use system::EspPower;

// Monitoring LED on D7
static LED: Mutex<Option<PinDriver<'static, Gpio17, Output>>> = Mutex::new(None);

/// Set the monitoring LED state
pub fn set_led(on: bool) {
    if let Ok(mut guard) = LED.lock() {
        if let Some(led) = guard.as_mut() {
            if on {
                let _ = led.set_high();
            } else {
                let _ = led.set_low();
            }
        }
    }
}

fn led_off() {
    set_led(false);
}

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("B-Fox Beacon v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let config = BeaconConfig::default();

    let led = PinDriver::output(peripherals.pins.gpio17)?;
    if let Ok(mut guard) = LED.lock() {
        *guard = Some(led);
    }

    // Battery first: a flat cell goes straight back to sleep
    let monitor = Arc::new(BatteryMonitor::new());
    let mut battery_channel = battery::open(peripherals.adc1, peripherals.pins.gpio0)?;
    match battery::measure(&mut battery_channel, &monitor) {
        Some(volts) if monitor.is_depleted() => {
            warn!("Battery voltage is low: {:.2}V", volts);
            EspPower.deep_sleep();
        }
        Some(volts) => info!("Battery {:.2}V", volts),
        None => warn!("Battery ADC read failed"),
    }
    battery::spawn_sampler(
        battery_channel,
        monitor.clone(),
        Duration::from_millis(config.battery_sample_ms),
        |_volts| {
            led_off();
            EspPower.deep_sleep();
        },
    );

    // XIAO ESP32C6: RF switch enable low, then select the external antenna
    let mut rf_switch = PinDriver::output(peripherals.pins.gpio3)?;
    rf_switch.set_low()?;
    std::thread::sleep(Duration::from_millis(100));
    let mut antenna_select = PinDriver::output(peripherals.pins.gpio14)?;
    antenna_select.set_high()?;

    let storage = nvs::NvsStorage::open(&nvs, NVS_NAMESPACE)?;
    let setting = DeviceSetting::load_or_default(&storage);
    info!(
        "Start BLE GATT name:{} major:{} minor:{}",
        setting.device_name, setting.major, setting.minor
    );

    let plan = AdvertisingPlan::from_setting(&setting, BFOX_PROXIMITY_UUID);
    let service = BeaconService::new(setting, storage, monitor)
        .with_restart_delay(Duration::from_millis(config.restart_delay_ms));

    let ble_device = BLEDevice::take();
    ble::register_service(ble_device, Arc::new(Mutex::new(service)), led_off);

    let mut advertiser = ble::NimbleAdvertiser::new(ble_device);
    advertiser.start(&plan)?;

    info!("B-Fox Beacon ready");

    loop {
        set_led(true);
        std::thread::sleep(Duration::from_millis(100));
        set_led(false);
        std::thread::sleep(Duration::from_millis(1900));
    }
}
