//! BLE GATT Service Protocol Constants for B-Fox Beacons
//!
//! This module defines the BLE service UUIDs and command bytes used to read
//! battery voltage, read/write beacon settings and put a beacon to sleep.

/// BLE Service UUID: 347fd67c-9131-4ea0-b0a7-1886d8c0f0df
pub const SERVICE_UUID: &str = "347fd67c-9131-4ea0-b0a7-1886d8c0f0df";

/// Battery Voltage Characteristic UUID (read, i16 LE, volts x 100)
pub const VOLTAGE_UUID: &str = "53bf4a46-41ba-46a3-b675-4fb7f0770905";

/// Beacon Setting Characteristic UUID (read/write, see `settings`)
pub const SETTING_UUID: &str = "096a09d5-1b35-4c99-a483-8d0c34f70220";

/// Deep Sleep Characteristic UUID (write)
pub const SLEEP_UUID: &str = "0cf26a7e-650e-4c18-9a30-bbbca50d88c1";

/// Delay between an accepted setting write and the restart that applies it
pub const SETTING_RESTART_DELAY_MS: u64 = 3000;

/// BLE Command bytes
pub mod commands {
    /// Enter deep sleep immediately, written to the sleep characteristic
    pub const DEEP_SLEEP: u8 = 0x01;
}
