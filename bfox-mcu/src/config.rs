//! Runtime tunables
//!
//! Firmware builds these once at boot; tests override single fields.

use crate::registry::DEFAULT_EXPIRY_MS;
use crate::scan::DEFAULT_QUEUE_CAPACITY;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Deep sleep after this long in search mode without a button press
    pub search_idle_ms: u64,
    /// Restart after this long in setting mode without a button press
    pub setting_idle_ms: u64,
    pub search_frame_ms: u64,
    pub setting_frame_ms: u64,
    /// How long the boot banner stays up
    pub splash_ms: u64,
    /// How long a restart notice stays up before the restart
    pub restart_notice_ms: u64,
    /// Drop beacons not heard from for this long
    pub expiry_ms: u64,
    pub scan_queue_capacity: usize,
    /// Scan interval and window, milliseconds
    pub scan_interval_ms: u16,
    pub scan_window_ms: u16,
    /// Button sampling period
    pub button_sample_ms: u64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            search_idle_ms: 30_000,
            setting_idle_ms: 10_000,
            search_frame_ms: 2000,
            setting_frame_ms: 100,
            splash_ms: 2000,
            restart_notice_ms: 2000,
            expiry_ms: DEFAULT_EXPIRY_MS,
            scan_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            scan_interval_ms: 100,
            scan_window_ms: 100,
            button_sample_ms: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconConfig {
    /// Battery sampling period
    pub battery_sample_ms: u64,
    /// Delay between a settings write and the restart that applies it
    pub restart_delay_ms: u64,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            battery_sample_ms: 60_000,
            restart_delay_ms: bfox_proto::ble::SETTING_RESTART_DELAY_MS,
        }
    }
}
