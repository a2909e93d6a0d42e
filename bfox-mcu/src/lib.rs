//! B-Fox MCU Library
//!
//! Device logic shared by the B-Fox beacon and receiver firmware.
//!
//! This crate provides:
//! - Beacon tracking: advertisement filter, scan queue and the RSSI-ranked
//!   registry of beacons in range
//! - Settings persistence and the beacon GATT service
//! - The receiver's mode machine, main loop, display screens and button
//!   debouncer
//! - Traits for storage, display, advertising and power control
//!
//! # MCU implementations
//! - ESP32 beacon: see `bfox-esp32-beacon`
//! - ESP32 receiver: see `bfox-esp32-receiver`
//!
//! # Note
//! Nothing here touches hardware. Timestamps are passed in as monotonic
//! milliseconds so every module can be driven from tests.

pub mod advertising;
pub mod battery;
pub mod button;
pub mod config;
pub mod display;
pub mod filter;
pub mod gatt;
pub mod mode;
pub mod receiver;
pub mod registry;
pub mod scan;
pub mod settings;
pub mod storage;
pub mod system;
pub mod tx_power;

pub use advertising::{AdvertisingPlan, BeaconAdvertiser, interval_units};
pub use battery::BatteryMonitor;
pub use button::Debouncer;
pub use config::{BeaconConfig, ReceiverConfig};
pub use display::{LineDisplay, Screen};
pub use filter::{AdvertisementFilter, Rejection};
pub use gatt::{BeaconService, Characteristic, GattError, WriteOutcome};
pub use mode::{ButtonEvent, ModeAction, ModeMachine, ReceiverMode};
pub use receiver::{Receiver, Step};
pub use registry::{BeaconRegistry, BeaconSighting};
pub use scan::{SightingReceiver, SightingSender, scan_channel};
pub use settings::{DeviceSetting, ReceiverSetting, SettingsError};
pub use storage::{Storage, StorageError};
pub use system::PowerControl;
pub use tx_power::{RadioPowerLevel, TxPower, radio_power_level};
