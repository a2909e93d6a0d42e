//! B-Fox wire protocol - iBeacon framing, setting payloads and GATT constants
//!
//! Everything here is pure byte-level packing, shared by the ESP32 firmware
//! and the desktop controller. Nothing relies on struct layout.

pub mod ble;
pub mod ibeacon;
pub mod settings;

pub use ibeacon::{
    AdvertisementError, BFOX_PROXIMITY_UUID, IBEACON_HEADER, IBEACON_LEN, IBeacon, ProximityUuid,
    frame_from_manufacturer_data, swap16,
};
pub use settings::{SettingsLayout, SettingsPayload, WireError};
