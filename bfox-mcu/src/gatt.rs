//! Beacon GATT service
//!
//! UUIDs and command bytes are in `bfox_proto::ble`. Each characteristic is
//! a `Characteristic` variant; the firmware registers `Characteristic::ALL`
//! with its BLE stack once and routes every access to `BeaconService`.

pub use bfox_proto::ble::{SERVICE_UUID, SETTING_UUID, SLEEP_UUID, VOLTAGE_UUID, commands};

use crate::battery::BatteryMonitor;
use crate::settings::DeviceSetting;
use crate::storage::Storage;
use bfox_proto::{SettingsLayout, SettingsPayload, WireError};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    /// Battery voltage, read only
    Voltage,
    /// Beacon setting, read and write
    Setting,
    /// Deep sleep command, write only
    DeepSleep,
}

impl Characteristic {
    pub const ALL: [Characteristic; 3] = [
        Characteristic::Voltage,
        Characteristic::Setting,
        Characteristic::DeepSleep,
    ];

    pub fn uuid(self) -> &'static str {
        match self {
            Characteristic::Voltage => VOLTAGE_UUID,
            Characteristic::Setting => SETTING_UUID,
            Characteristic::DeepSleep => SLEEP_UUID,
        }
    }

    pub fn from_uuid(uuid: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.uuid().eq_ignore_ascii_case(uuid))
    }

    pub fn readable(self) -> bool {
        matches!(self, Characteristic::Voltage | Characteristic::Setting)
    }

    pub fn writable(self) -> bool {
        matches!(self, Characteristic::Setting | Characteristic::DeepSleep)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GattError {
    #[error("{0:?} characteristic does not support this access")]
    NotPermitted(Characteristic),
    #[error("cannot encode current setting: {0}")]
    Encode(#[from] WireError),
}

/// What the firmware has to do after a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Nothing changed
    Ignored,
    /// New settings are stored; restart after the delay to apply them
    RestartAfter(Duration),
    /// Enter deep sleep now
    DeepSleep,
}

/// State behind the beacon's GATT characteristics
///
/// `setting` is the configuration the beacon is currently running with.
/// Writes go straight to storage and take effect after the restart.
pub struct BeaconService<S: Storage> {
    setting: DeviceSetting,
    storage: S,
    battery: Arc<BatteryMonitor>,
    layout: SettingsLayout,
    restart_delay: Duration,
}

impl<S: Storage> BeaconService<S> {
    pub fn new(setting: DeviceSetting, storage: S, battery: Arc<BatteryMonitor>) -> Self {
        Self {
            setting,
            storage,
            battery,
            layout: SettingsLayout::Current,
            restart_delay: Duration::from_millis(bfox_proto::ble::SETTING_RESTART_DELAY_MS),
        }
    }

    /// Speak the setting layout without the advertising interval
    pub fn with_layout(mut self, layout: SettingsLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    pub fn setting(&self) -> &DeviceSetting {
        &self.setting
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn read(&self, characteristic: Characteristic) -> Result<Vec<u8>, GattError> {
        match characteristic {
            Characteristic::Voltage => Ok(self.battery.centivolts().to_le_bytes().to_vec()),
            Characteristic::Setting => {
                let mut payload = self.setting.to_payload();
                if self.layout == SettingsLayout::Legacy {
                    payload.adv_interval_ms = None;
                }
                Ok(payload.to_bytes()?)
            }
            Characteristic::DeepSleep => Err(GattError::NotPermitted(characteristic)),
        }
    }

    pub fn write(
        &mut self,
        characteristic: Characteristic,
        data: &[u8],
    ) -> Result<WriteOutcome, GattError> {
        match characteristic {
            Characteristic::Voltage => Err(GattError::NotPermitted(characteristic)),
            Characteristic::Setting => Ok(self.write_setting(data)),
            Characteristic::DeepSleep => Ok(Self::write_sleep(data)),
        }
    }

    fn write_setting(&mut self, data: &[u8]) -> WriteOutcome {
        let payload = match SettingsPayload::from_bytes(data, self.layout) {
            Ok(payload) if payload.device_name.is_empty() => {
                error!("Rejected beacon setting write: empty device name");
                return WriteOutcome::Ignored;
            }
            Ok(payload) => payload,
            Err(e) => {
                error!("Rejected beacon setting write: {}", e);
                return WriteOutcome::Ignored;
            }
        };

        info!(
            "Write beacon setting: name={} major={} minor={} measured_power={} tx_power={} \
             interval={:?}",
            payload.device_name,
            payload.major,
            payload.minor,
            payload.measured_power,
            payload.tx_power,
            payload.adv_interval_ms
        );

        let setting = DeviceSetting::from_payload(payload);
        if let Err(e) = setting.save(&mut self.storage) {
            error!("Failed to save beacon setting: {}", e);
        }
        WriteOutcome::RestartAfter(self.restart_delay)
    }

    fn write_sleep(data: &[u8]) -> WriteOutcome {
        match data.first() {
            Some(&commands::DEEP_SLEEP) => {
                info!("Deep sleep command received");
                WriteOutcome::DeepSleep
            }
            Some(other) => {
                warn!("Unknown deep sleep command: 0x{:02x}", other);
                WriteOutcome::Ignored
            }
            None => WriteOutcome::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;
    use crate::tx_power::TxPower;

    fn service() -> BeaconService<MemoryStorage> {
        let setting = DeviceSetting {
            device_name: "Fox".to_string(),
            major: 1,
            minor: 2,
            measured_power: -59,
            tx_power: TxPower::Mid.raw(),
            adv_interval_ms: 500,
        };
        let battery = Arc::new(BatteryMonitor::new());
        battery.record_volts(3.7);
        BeaconService::new(setting, MemoryStorage::default(), battery)
    }

    fn setting_bytes(name: &str, major: u16) -> Vec<u8> {
        SettingsPayload {
            device_name: name.to_string(),
            major,
            minor: 8,
            measured_power: -61,
            tx_power: TxPower::Low.raw(),
            adv_interval_ms: Some(250),
        }
        .to_bytes()
        .unwrap()
    }

    #[test]
    fn uuid_table() {
        for c in Characteristic::ALL {
            assert_eq!(Characteristic::from_uuid(c.uuid()), Some(c));
        }
        assert_eq!(
            Characteristic::from_uuid(&SETTING_UUID.to_uppercase()),
            Some(Characteristic::Setting)
        );
        assert_eq!(Characteristic::from_uuid(SERVICE_UUID), None);
        assert!(!Characteristic::Voltage.writable());
        assert!(!Characteristic::DeepSleep.readable());
    }

    #[test]
    fn voltage_is_centivolts_le() {
        assert_eq!(service().read(Characteristic::Voltage).unwrap(), vec![0x72, 0x01]);
    }

    #[test]
    fn setting_read_is_current_layout() {
        let bytes = service().read(Characteristic::Setting).unwrap();
        assert_eq!(bytes.len(), 3 + 11);
        assert_eq!(bytes[0], 3);
        assert_eq!(&bytes[1..4], b"Fox");
        assert_eq!(&bytes[12..], &500u16.to_le_bytes());
    }

    #[test]
    fn legacy_layout_read() {
        let bytes = service()
            .with_layout(SettingsLayout::Legacy)
            .read(Characteristic::Setting)
            .unwrap();
        assert_eq!(bytes.len(), 3 + 9);
    }

    #[test]
    fn setting_write_persists_and_restarts() {
        let mut service = service();
        let outcome = service
            .write(Characteristic::Setting, &setting_bytes("Fox-9", 4))
            .unwrap();
        assert_eq!(outcome, WriteOutcome::RestartAfter(Duration::from_millis(3000)));

        let stored = DeviceSetting::load(service.storage()).unwrap();
        assert_eq!(stored.device_name, "Fox-9");
        assert_eq!(stored.major, 4);
        assert_eq!(stored.adv_interval_ms, 250);
        // running setting is untouched until restart
        assert_eq!(service.setting().major, 1);
    }

    #[test]
    fn malformed_setting_write_changes_nothing() {
        let mut service = service();

        let mut bytes = setting_bytes("abcde", 4);
        assert_eq!(bytes.len(), 16);
        bytes.pop();
        assert_eq!(
            service.write(Characteristic::Setting, &bytes).unwrap(),
            WriteOutcome::Ignored
        );
        assert_eq!(
            service.write(Characteristic::Setting, &[]).unwrap(),
            WriteOutcome::Ignored
        );
        assert_eq!(
            service.write(Characteristic::Setting, &setting_bytes("", 4)).unwrap(),
            WriteOutcome::Ignored
        );
        assert_eq!(service.storage().saves, 0);
    }

    #[test]
    fn failed_save_still_restarts() {
        let setting = service().setting().clone();
        let storage = MemoryStorage {
            fail_writes: true,
            ..Default::default()
        };
        let mut service = BeaconService::new(setting, storage, Arc::new(BatteryMonitor::new()))
            .with_restart_delay(Duration::from_millis(10));
        assert_eq!(
            service.write(Characteristic::Setting, &setting_bytes("Fox", 1)).unwrap(),
            WriteOutcome::RestartAfter(Duration::from_millis(10))
        );
    }

    #[test]
    fn deep_sleep_command() {
        let mut service = service();
        assert_eq!(
            service.write(Characteristic::DeepSleep, &[0x01]).unwrap(),
            WriteOutcome::DeepSleep
        );
        assert_eq!(
            service.write(Characteristic::DeepSleep, &[0x01, 0xff]).unwrap(),
            WriteOutcome::DeepSleep
        );
        assert_eq!(
            service.write(Characteristic::DeepSleep, &[0x02]).unwrap(),
            WriteOutcome::Ignored
        );
        assert_eq!(
            service.write(Characteristic::DeepSleep, &[]).unwrap(),
            WriteOutcome::Ignored
        );
    }

    #[test]
    fn access_outside_capabilities() {
        let mut service = service();
        assert!(matches!(
            service.write(Characteristic::Voltage, &[0x00]),
            Err(GattError::NotPermitted(Characteristic::Voltage))
        ));
        assert!(matches!(
            service.read(Characteristic::DeepSleep),
            Err(GattError::NotPermitted(Characteristic::DeepSleep))
        ));
    }
}
