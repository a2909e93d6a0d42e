//! Chip restart and deep sleep

use bfox_mcu::system::PowerControl;
use log::*;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct EspPower;

impl PowerControl for EspPower {
    fn restart(&mut self) {
        info!("Restarting now");
        unsafe { esp_idf_svc::sys::esp_restart() };
    }

    fn deep_sleep(&mut self) {
        info!("Entering deep sleep");
        unsafe { esp_idf_svc::sys::esp_deep_sleep_start() };
    }
}

/// Restart from a separate thread once `delay` has passed
///
/// Used from BLE callbacks, which must return before the restart so the
/// write response still reaches the client.
pub fn restart_after(delay: Duration) {
    info!("Restarting in {} ms", delay.as_millis());
    let spawned = std::thread::Builder::new()
        .name("restart".into())
        .stack_size(4096)
        .spawn(move || {
            std::thread::sleep(delay);
            EspPower.restart();
        });
    if let Err(e) = spawned {
        error!("Failed to spawn restart thread: {}, restarting now", e);
        EspPower.restart();
    }
}
