//! B-Fox Receiver for ESP32
//!
//! Passively scans for beacons of one major and shows the two strongest
//! on a 16x2 LCD. The D10 button changes the paired major.

mod battery;
mod button;
mod nvs;
mod scanner;
mod st7032;
mod system;

use bfox_mcu::battery::BatteryMonitor;
use bfox_mcu::config::ReceiverConfig;
use bfox_mcu::filter::AdvertisementFilter;
use bfox_mcu::receiver::Receiver;
use bfox_mcu::registry::BeaconRegistry;
use bfox_mcu::settings::{ReceiverSetting, NVS_NAMESPACE};
use bfox_mcu::system::PowerControl;
use bfox_proto::BFOX_PROXIMITY_UUID;
use esp32_nimble::BLEDevice;
use esp_idf_svc::{
    hal::{
        gpio::PinDriver,
        i2c::{I2cConfig, I2cDriver},
        prelude::*,
    },
    nvs::EspDefaultNvsPartition,
};
use log::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use system::EspPower;

/// LCD contrast, 0..=63
const LCD_CONTRAST: u8 = 40;

/// D1, pulled low by the button to wake from deep sleep
const WAKEUP_GPIO: i32 = 1;

/// How long the low battery notice stays up before sleeping
const LOW_BATTERY_NOTICE_MS: u64 = 3000;

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("B-Fox Receiver v{}", env!("CARGO_PKG_VERSION"));

    let boot = Instant::now();
    let now_ms = move || boot.elapsed().as_millis() as u64;

    let peripherals = Peripherals::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let config = ReceiverConfig::default();

    let storage = nvs::NvsStorage::open(&nvs, NVS_NAMESPACE)?;
    let setting = ReceiverSetting::load_or_default(&storage);

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio22,
        peripherals.pins.gpio23,
        &I2cConfig::new().baudrate(100.kHz().into()),
    )?;
    let mut lcd = st7032::St7032::new(i2c, st7032::DEFAULT_ADDRESS)?;
    lcd.set_contrast(LCD_CONTRAST)?;

    if let Err(e) = system::enable_wakeup_on_low(WAKEUP_GPIO) {
        warn!("Failed to enable button wakeup: {:?}", e);
    }

    let buttons = button::spawn_watcher(
        peripherals.pins.gpio18,
        Duration::from_millis(config.button_sample_ms),
    )?;
    let mut receiver = Receiver::new(setting, &config, now_ms(), storage, EspPower, lcd, buttons);

    let monitor = BatteryMonitor::new();
    let mut battery_channel = battery::open(peripherals.adc1, peripherals.pins.gpio0)?;
    let volts = match battery::measure(&mut battery_channel, &monitor) {
        Some(volts) if monitor.is_depleted() => {
            warn!("Battery voltage is low: {:.2}V", volts);
            receiver.show_low_battery(volts);
            std::thread::sleep(Duration::from_millis(LOW_BATTERY_NOTICE_MS));
            EspPower.deep_sleep();
            volts
        }
        Some(volts) => {
            info!("Battery {:.2}V", volts);
            volts
        }
        None => {
            warn!("Battery ADC read failed");
            0.0
        }
    };

    // XIAO ESP32C6: RF switch enable low, then select the external antenna
    let mut rf_switch = PinDriver::output(peripherals.pins.gpio3)?;
    rf_switch.set_low()?;
    std::thread::sleep(Duration::from_millis(100));
    let mut antenna_select = PinDriver::output(peripherals.pins.gpio14)?;
    antenna_select.set_high()?;

    let splash_ms = receiver.show_splash(volts);
    std::thread::sleep(Duration::from_millis(splash_ms));

    let registry = Arc::new(BeaconRegistry::new(config.expiry_ms));
    scanner::start(
        BLEDevice::take(),
        AdvertisementFilter::new(BFOX_PROXIMITY_UUID, receiver.major()),
        registry.clone(),
        scanner::ScanSettings {
            interval_ms: config.scan_interval_ms,
            window_ms: config.scan_window_ms,
            queue_capacity: config.scan_queue_capacity,
        },
        boot,
    );

    info!("B-Fox Receiver ready, major {}", receiver.major());

    loop {
        let step = receiver.step(now_ms(), &registry);
        std::thread::sleep(Duration::from_millis(step.next_frame_ms));
    }
}
