//! Receiver main loop
//!
//! The firmware calls `Receiver::step` forever, sleeping for the returned
//! interval in between. Everything with side effects (display, storage,
//! restart) goes through the traits so the loop runs the same under test.

use crate::config::ReceiverConfig;
use crate::display::{self, LineDisplay, Screen};
use crate::mode::{ButtonEvent, ModeAction, ModeMachine};
use crate::registry::BeaconRegistry;
use crate::settings::ReceiverSetting;
use crate::storage::Storage;
use crate::system::PowerControl;
use log::{error, info, warn};
use std::sync::mpsc;

/// Result of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub action: ModeAction,
    /// Sleep this long before the next step
    pub next_frame_ms: u64,
}

pub struct Receiver<S: Storage, P: PowerControl, D: LineDisplay> {
    machine: ModeMachine,
    storage: S,
    power: P,
    display: D,
    buttons: mpsc::Receiver<ButtonEvent>,
    restart_notice_ms: u64,
    splash_ms: u64,
    /// A restart notice is on screen; the next restart action is final
    restart_pending: bool,
}

impl<S: Storage, P: PowerControl, D: LineDisplay> Receiver<S, P, D> {
    pub fn new(
        setting: ReceiverSetting,
        config: &ReceiverConfig,
        now_ms: u64,
        storage: S,
        power: P,
        display: D,
        buttons: mpsc::Receiver<ButtonEvent>,
    ) -> Self {
        Self {
            machine: ModeMachine::new(setting.major, now_ms, config),
            storage,
            power,
            display,
            buttons,
            restart_notice_ms: config.restart_notice_ms,
            splash_ms: config.splash_ms,
            restart_pending: false,
        }
    }

    pub fn machine(&self) -> &ModeMachine {
        &self.machine
    }

    pub fn major(&self) -> u16 {
        self.machine.major()
    }

    /// Boot banner, returns how long to leave it up
    pub fn show_splash(&mut self, volts: f32) -> u64 {
        self.show(&display::splash_screen(self.machine.major(), volts));
        self.splash_ms
    }

    /// Tell the user the battery is flat before sleeping
    pub fn show_low_battery(&mut self, volts: f32) {
        self.show(&display::low_battery_screen(volts));
    }

    /// Run one iteration at `now_ms`
    pub fn step(&mut self, now_ms: u64, registry: &BeaconRegistry) -> Step {
        while let Ok(event) = self.buttons.try_recv() {
            if self.machine.on_button(event, now_ms) {
                info!("Button {:?}, mode {:?}", event, self.machine.mode());
            }
        }

        let action = self.machine.poll(now_ms);
        let mut next_frame_ms = self.machine.frame_interval_ms();
        match action {
            ModeAction::ShowBeacons => {
                let beacons = registry.snapshot_sorted_by_rssi(now_ms);
                self.show(&display::beacons_screen(&beacons));
            }
            ModeAction::ShowSetting { major } => {
                self.show(&display::setting_screen(major));
            }
            ModeAction::SaveAndRestart { major } => {
                match (ReceiverSetting { major }).save(&mut self.storage) {
                    Ok(()) => info!("Saved receiver major {}", major),
                    Err(e) => error!("Failed to save receiver setting: {}", e),
                }
                self.show(&display::saved_screen(major));
                self.restart_pending = true;
                next_frame_ms = self.restart_notice_ms;
            }
            ModeAction::Restart if !self.restart_pending => {
                info!("Setting mode timed out");
                self.show(&display::restart_screen());
                self.restart_pending = true;
                next_frame_ms = self.restart_notice_ms;
            }
            ModeAction::Restart => {
                info!("Restart");
                self.blank();
                self.power.restart();
            }
            ModeAction::DeepSleep => {
                info!("No activity, entering deep sleep");
                self.blank();
                self.power.deep_sleep();
            }
        }

        Step {
            action,
            next_frame_ms,
        }
    }

    fn show(&mut self, screen: &Screen) {
        if let Err(e) = self.display.show(screen) {
            warn!("Display update failed: {:?}", e);
        }
    }

    fn blank(&mut self) {
        if let Err(e) = self.display.clear() {
            warn!("Display clear failed: {:?}", e);
        }
    }
}
