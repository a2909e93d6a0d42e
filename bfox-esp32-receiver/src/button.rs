//! Major select button on D10 (GPIO18), polled every few milliseconds

use bfox_mcu::button::Debouncer;
use bfox_mcu::mode::ButtonEvent;
use esp_idf_svc::hal::gpio::{Gpio18, PinDriver, Pull};
use esp_idf_svc::sys::EspError;
use log::*;
use std::sync::mpsc::{sync_channel, Receiver, TrySendError};
use std::time::Duration;

/// Pending gestures the main loop has not picked up yet
const EVENT_QUEUE_LEN: usize = 4;

/// Start polling the button, returning the event queue
pub fn spawn_watcher(
    pin: Gpio18,
    sample_period: Duration,
) -> Result<Receiver<ButtonEvent>, EspError> {
    let mut input = PinDriver::input(pin)?;
    input.set_pull(Pull::Up)?;

    let (tx, rx) = sync_channel(EVENT_QUEUE_LEN);
    let spawned = std::thread::Builder::new()
        .name("button".into())
        .stack_size(4096)
        .spawn(move || {
            let mut debouncer = Debouncer::default();
            loop {
                if let Some(event) = debouncer.sample(input.is_high()) {
                    match tx.try_send(event) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            warn!("Button queue full, dropped {:?}", event)
                        }
                        Err(TrySendError::Disconnected(_)) => break,
                    }
                }
                std::thread::sleep(sample_period);
            }
        });
    if let Err(e) = spawned {
        error!("Failed to spawn button watcher: {}", e);
    }

    Ok(rx)
}
