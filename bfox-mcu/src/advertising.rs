//! Beacon advertising parameters

use crate::settings::DeviceSetting;
use crate::tx_power::RadioPowerLevel;
use bfox_proto::{IBEACON_LEN, ProximityUuid};

/// Advertising interval unit of the BLE controller, microseconds
const INTERVAL_UNIT_US: u32 = 625;

/// Shortest and longest intervals the controller accepts, in units
const MIN_INTERVAL_UNITS: u16 = 0x0020;
const MAX_INTERVAL_UNITS: u16 = 0x4000;

/// Milliseconds to 0.625 ms controller units, clamped to the legal range
pub fn interval_units(ms: u16) -> u16 {
    let units = u32::from(ms) * 1000 / INTERVAL_UNIT_US;
    units.clamp(MIN_INTERVAL_UNITS.into(), MAX_INTERVAL_UNITS.into()) as u16
}

/// Everything the radio needs to start advertising
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingPlan {
    pub frame: [u8; IBEACON_LEN],
    pub interval_units: u16,
    pub power: RadioPowerLevel,
    pub device_name: String,
}

impl AdvertisingPlan {
    pub fn from_setting(setting: &DeviceSetting, proximity_uuid: ProximityUuid) -> Self {
        Self {
            frame: setting.ibeacon(proximity_uuid).to_bytes(),
            interval_units: interval_units(setting.adv_interval_ms),
            power: setting.radio_power_level(),
            device_name: setting.device_name.clone(),
        }
    }
}

/// Trait for the radio side of a beacon
pub trait BeaconAdvertiser {
    /// Error type for advertising operations
    type Error;

    /// Apply `plan` and start advertising
    fn start(&mut self, plan: &AdvertisingPlan) -> Result<(), Self::Error>;

    fn stop(&mut self) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx_power::TxPower;
    use bfox_proto::{BFOX_PROXIMITY_UUID, IBeacon};

    #[test]
    fn interval_conversion() {
        assert_eq!(interval_units(500), 800);
        assert_eq!(interval_units(100), 160);
        assert_eq!(interval_units(1), MIN_INTERVAL_UNITS);
        assert_eq!(interval_units(u16::MAX), MAX_INTERVAL_UNITS);
    }

    #[test]
    fn plan_from_setting() {
        let setting = DeviceSetting {
            major: 3,
            minor: 7,
            tx_power: TxPower::SuperLow.raw(),
            adv_interval_ms: 1000,
            ..Default::default()
        };
        let plan = AdvertisingPlan::from_setting(&setting, BFOX_PROXIMITY_UUID);

        let beacon = IBeacon::from_bytes(&plan.frame).unwrap();
        assert_eq!((beacon.major, beacon.minor), (3, 7));
        assert_eq!(beacon.measured_power, -59);
        assert_eq!(plan.interval_units, 1600);
        assert_eq!(plan.power, RadioPowerLevel::N12);
        assert_eq!(plan.device_name, "B-Fox Beacon");
    }

    #[test]
    fn bad_tx_power_still_advertises() {
        let setting = DeviceSetting {
            tx_power: 0,
            ..Default::default()
        };
        let plan = AdvertisingPlan::from_setting(&setting, BFOX_PROXIMITY_UUID);
        assert_eq!(plan.power, RadioPowerLevel::P9);
    }
}
