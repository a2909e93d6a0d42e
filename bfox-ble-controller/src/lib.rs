//! B-Fox BLE Controller
//!
//! Desktop BLE client for B-Fox beacons: find them, track them the way a
//! receiver does, and read or change their settings over GATT.
//!
//! # Example
//!
//! ```ignore
//! use bfox_ble_controller::ble;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // List beacons in range
//!     for device in ble::scan(5).await? {
//!         if let Some(beacon) = device.beacon.filter(|_| device.is_bfox()) {
//!             println!("{} major:{} minor:{}", device.name, beacon.major, beacon.minor);
//!         }
//!     }
//!
//!     // Move a beacon to another group
//!     let mut setting = ble::read_settings(Some("BFOX")).await?;
//!     setting.major = 3;
//!     ble::write_settings(Some("BFOX"), &setting).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod ble;
