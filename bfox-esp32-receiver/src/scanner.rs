//! Passive BLE scanning into the beacon registry
//!
//! The NimBLE callback only filters and queues. A second thread moves
//! queued sightings into the registry.

use bfox_mcu::filter::AdvertisementFilter;
use bfox_mcu::registry::BeaconRegistry;
use bfox_mcu::scan::scan_channel;
use esp32_nimble::{BLEDevice, BLEScan};
use esp_idf_svc::hal::task::block_on;
use log::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Length of one scan call; scanning restarts immediately after
const SCAN_DURATION_MS: i32 = 60_000;

/// Scan timing in milliseconds; NimBLE converts to radio units itself
pub struct ScanSettings {
    pub interval_ms: u16,
    pub window_ms: u16,
    pub queue_capacity: usize,
}

/// Start the scan and consumer threads
///
/// `boot` is the clock origin shared with the main loop.
pub fn start(
    ble_device: &'static BLEDevice,
    filter: AdvertisementFilter,
    registry: Arc<BeaconRegistry>,
    settings: ScanSettings,
    boot: Instant,
) {
    let (sender, receiver) = scan_channel(filter, settings.queue_capacity);

    let consumer = std::thread::Builder::new()
        .name("scan-consumer".into())
        .stack_size(4096)
        .spawn(move || receiver.run(&registry));
    if let Err(e) = consumer {
        error!("Failed to spawn scan consumer: {}", e);
        return;
    }

    let scanner = std::thread::Builder::new()
        .name("scan".into())
        .stack_size(8192)
        .spawn(move || {
            let mut ble_scan = BLEScan::new();
            ble_scan
                .active_scan(false)
                .filter_duplicates(false)
                .interval(settings.interval_ms)
                .window(settings.window_ms);
            info!("Passive scan started for major {}", filter.target_major());

            loop {
                let result = block_on(ble_scan.start(ble_device, SCAN_DURATION_MS, |device, data| {
                    let now_ms = boot.elapsed().as_millis() as u64;
                    sender.offer(data.payload(), device.rssi() as i32, now_ms);
                    None::<()>
                }));
                if let Err(e) = result {
                    error!("Scan error: {:?}", e);
                    std::thread::sleep(Duration::from_secs(1));
                }
            }
        });
    if let Err(e) = scanner {
        error!("Failed to spawn scanner: {}", e);
    }
}
