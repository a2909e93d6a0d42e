//! Persisted beacon and receiver settings
//!
//! Records are stored as JSON so a dumped NVS partition stays readable.
//! A record is loaded whole or not at all.

use crate::storage::{Storage, StorageError};
use crate::tx_power::{RadioPowerLevel, TxPower, radio_power_level};
use bfox_proto::{IBeacon, ProximityUuid, SettingsPayload};
use log::{error, info, warn};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// NVS namespace holding every B-Fox record
pub const NVS_NAMESPACE: &str = "bfox";

const KEY_DEVICE_SETTING: &str = "setting";
const KEY_RECEIVER_SETTING: &str = "receiver";

pub const DEFAULT_DEVICE_NAME: &str = "B-Fox Beacon";
pub const DEFAULT_MEASURED_POWER: i16 = -59;
pub const DEFAULT_ADV_INTERVAL_MS: u16 = 500;

/// Longest name the setting payload can carry
pub const MAX_DEVICE_NAME_LEN: usize = u8::MAX as usize;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("no record stored under '{0}'")]
    NotFound(&'static str),
    #[error("storage error: {0}")]
    Storage(StorageError),
    #[error("corrupt settings record: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid settings record: {0}")]
    Invalid(&'static str),
}

impl SettingsError {
    /// First boot, nothing persisted yet
    pub fn is_not_found(&self) -> bool {
        matches!(self, SettingsError::NotFound(_))
    }
}

fn load_record<T: DeserializeOwned>(
    storage: &impl Storage,
    key: &'static str,
) -> Result<T, SettingsError> {
    let data = storage
        .load(key)
        .map_err(SettingsError::Storage)?
        .ok_or(SettingsError::NotFound(key))?;
    Ok(serde_json::from_slice(&data)?)
}

fn save_record<T: Serialize>(
    storage: &mut impl Storage,
    key: &'static str,
    record: &T,
) -> Result<(), SettingsError> {
    let data = serde_json::to_vec(record)?;
    storage.save(key, &data).map_err(SettingsError::Storage)
}

fn log_load_failure(what: &str, e: &SettingsError) {
    if e.is_not_found() {
        warn!("No stored {} (first boot?), using defaults", what);
    } else {
        error!("Failed to load {}: {}, using defaults", what, e);
    }
}

/// Beacon configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSetting {
    pub device_name: String,
    pub major: u16,
    pub minor: u16,
    #[serde(default = "default_measured_power")]
    pub measured_power: i16,
    /// Raw `TxPower` value, validated when mapped to the radio
    pub tx_power: i16,
    /// Added after the first release; older records lack it
    #[serde(default = "default_adv_interval_ms")]
    pub adv_interval_ms: u16,
}

fn default_measured_power() -> i16 {
    DEFAULT_MEASURED_POWER
}

fn default_adv_interval_ms() -> u16 {
    DEFAULT_ADV_INTERVAL_MS
}

impl Default for DeviceSetting {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            major: 0,
            minor: 0,
            measured_power: DEFAULT_MEASURED_POWER,
            tx_power: TxPower::High.raw(),
            adv_interval_ms: DEFAULT_ADV_INTERVAL_MS,
        }
    }
}

impl DeviceSetting {
    /// Load the stored record
    pub fn load(storage: &impl Storage) -> Result<Self, SettingsError> {
        let setting: Self = load_record(storage, KEY_DEVICE_SETTING)?;
        if setting.device_name.is_empty() {
            return Err(SettingsError::Invalid("empty device_name"));
        }
        if setting.device_name.len() > MAX_DEVICE_NAME_LEN {
            return Err(SettingsError::Invalid("device_name longer than 255 bytes"));
        }
        Ok(setting)
    }

    /// Load the stored record, falling back to defaults on any failure
    pub fn load_or_default(storage: &impl Storage) -> Self {
        match Self::load(storage) {
            Ok(setting) => {
                info!(
                    "Loaded beacon setting: name={} major={} minor={}",
                    setting.device_name, setting.major, setting.minor
                );
                setting
            }
            Err(e) => {
                log_load_failure("beacon setting", &e);
                Self::default()
            }
        }
    }

    pub fn save(&self, storage: &mut impl Storage) -> Result<(), SettingsError> {
        save_record(storage, KEY_DEVICE_SETTING, self)
    }

    pub fn delete(storage: &mut impl Storage) -> Result<(), SettingsError> {
        storage
            .remove(KEY_DEVICE_SETTING)
            .map_err(SettingsError::Storage)
    }

    /// Build from a setting characteristic write
    ///
    /// Legacy payloads carry no interval; the default applies.
    pub fn from_payload(payload: SettingsPayload) -> Self {
        Self {
            device_name: payload.device_name,
            major: payload.major,
            minor: payload.minor,
            measured_power: payload.measured_power,
            tx_power: payload.tx_power,
            adv_interval_ms: payload
                .adv_interval_ms
                .unwrap_or(DEFAULT_ADV_INTERVAL_MS),
        }
    }

    pub fn to_payload(&self) -> SettingsPayload {
        SettingsPayload {
            device_name: self.device_name.clone(),
            major: self.major,
            minor: self.minor,
            measured_power: self.measured_power,
            tx_power: self.tx_power,
            adv_interval_ms: Some(self.adv_interval_ms),
        }
    }

    pub fn radio_power_level(&self) -> RadioPowerLevel {
        radio_power_level(self.tx_power.into())
    }

    /// Advertisement for this beacon under the given family UUID
    pub fn ibeacon(&self, proximity_uuid: ProximityUuid) -> IBeacon {
        let measured_power = self
            .measured_power
            .clamp(i8::MIN.into(), i8::MAX.into()) as i8;
        IBeacon::new(proximity_uuid, self.major, self.minor, measured_power)
    }
}

/// Receiver configuration: which beacon group it is paired to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReceiverSetting {
    pub major: u16,
}

impl ReceiverSetting {
    pub fn load(storage: &impl Storage) -> Result<Self, SettingsError> {
        load_record(storage, KEY_RECEIVER_SETTING)
    }

    pub fn load_or_default(storage: &impl Storage) -> Self {
        match Self::load(storage) {
            Ok(setting) => {
                info!("Loaded receiver setting: major={}", setting.major);
                setting
            }
            Err(e) => {
                log_load_failure("receiver setting", &e);
                Self::default()
            }
        }
    }

    pub fn save(&self, storage: &mut impl Storage) -> Result<(), SettingsError> {
        save_record(storage, KEY_RECEIVER_SETTING, self)
    }

    pub fn delete(storage: &mut impl Storage) -> Result<(), SettingsError> {
        storage
            .remove(KEY_RECEIVER_SETTING)
            .map_err(SettingsError::Storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;

    #[test]
    fn first_boot_is_not_found() {
        let storage = MemoryStorage::default();
        let err = DeviceSetting::load(&storage).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(DeviceSetting::load_or_default(&storage), DeviceSetting::default());
    }

    #[test]
    fn save_then_load() {
        let mut storage = MemoryStorage::default();
        let setting = DeviceSetting {
            device_name: "Fox-2".to_string(),
            major: 4,
            minor: 12,
            measured_power: -62,
            tx_power: TxPower::Low.raw(),
            adv_interval_ms: 250,
        };
        setting.save(&mut storage).unwrap();
        assert_eq!(DeviceSetting::load(&storage).unwrap(), setting);
    }

    #[test]
    fn missing_interval_defaults() {
        let storage = MemoryStorage::with(
            "setting",
            r#"{"device_name":"BleRDF Beacon","major":1,"minor":2,"tx_power":3}"#,
        );
        let setting = DeviceSetting::load(&storage).unwrap();
        assert_eq!(setting.adv_interval_ms, DEFAULT_ADV_INTERVAL_MS);
        assert_eq!(setting.measured_power, DEFAULT_MEASURED_POWER);
        assert_eq!(setting.minor, 2);
    }

    #[test]
    fn missing_required_field_fails_whole_load() {
        let storage = MemoryStorage::with(
            "setting",
            r#"{"device_name":"Fox","major":1,"tx_power":1}"#,
        );
        assert!(matches!(
            DeviceSetting::load(&storage),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn wrong_typed_field_fails_whole_load() {
        let storage = MemoryStorage::with(
            "setting",
            r#"{"device_name":"Fox","major":"one","minor":2,"tx_power":1}"#,
        );
        assert!(matches!(
            DeviceSetting::load(&storage),
            Err(SettingsError::Parse(_))
        ));

        let out_of_range = MemoryStorage::with(
            "setting",
            r#"{"device_name":"Fox","major":70000,"minor":2,"tx_power":1}"#,
        );
        assert!(DeviceSetting::load(&out_of_range).is_err());
    }

    #[test]
    fn corrupt_json_falls_back_to_defaults() {
        let storage = MemoryStorage::with("setting", "{\"device_name\":");
        assert!(matches!(
            DeviceSetting::load(&storage),
            Err(SettingsError::Parse(_))
        ));
        assert_eq!(DeviceSetting::load_or_default(&storage), DeviceSetting::default());
    }

    #[test]
    fn empty_name_is_invalid() {
        let storage = MemoryStorage::with(
            "setting",
            r#"{"device_name":"","major":1,"minor":2,"tx_power":1}"#,
        );
        assert!(matches!(
            DeviceSetting::load(&storage),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn overlong_name_is_invalid() {
        let record = |len: usize| {
            format!(
                r#"{{"device_name":"{}","major":1,"minor":2,"tx_power":1}}"#,
                "x".repeat(len)
            )
        };

        let storage = MemoryStorage::with("setting", &record(MAX_DEVICE_NAME_LEN + 1));
        assert!(matches!(
            DeviceSetting::load(&storage),
            Err(SettingsError::Invalid(_))
        ));

        let storage = MemoryStorage::with("setting", &record(MAX_DEVICE_NAME_LEN));
        assert_eq!(
            DeviceSetting::load(&storage).unwrap().device_name.len(),
            MAX_DEVICE_NAME_LEN
        );
    }

    #[test]
    fn failed_write_is_reported() {
        let mut storage = MemoryStorage {
            fail_writes: true,
            ..Default::default()
        };
        let err = DeviceSetting::default().save(&mut storage).unwrap_err();
        assert!(matches!(err, SettingsError::Storage(_)));
        assert!(storage.values.is_empty());
    }

    #[test]
    fn delete_removes_record() {
        let mut storage = MemoryStorage::default();
        DeviceSetting::default().save(&mut storage).unwrap();
        DeviceSetting::delete(&mut storage).unwrap();
        assert!(DeviceSetting::load(&storage).unwrap_err().is_not_found());
    }

    #[test]
    fn legacy_payload_gets_default_interval() {
        let payload = SettingsPayload {
            device_name: "Fox".to_string(),
            major: 1,
            minor: 9,
            measured_power: -70,
            tx_power: 2,
            adv_interval_ms: None,
        };
        let setting = DeviceSetting::from_payload(payload);
        assert_eq!(setting.adv_interval_ms, DEFAULT_ADV_INTERVAL_MS);
        assert_eq!(setting.to_payload().adv_interval_ms, Some(DEFAULT_ADV_INTERVAL_MS));
    }

    #[test]
    fn ibeacon_clamps_measured_power() {
        let setting = DeviceSetting {
            measured_power: -300,
            ..Default::default()
        };
        assert_eq!(setting.ibeacon(bfox_proto::BFOX_PROXIMITY_UUID).measured_power, i8::MIN);
    }

    #[test]
    fn receiver_setting_round_trip() {
        let mut storage = MemoryStorage::default();
        assert_eq!(ReceiverSetting::load_or_default(&storage).major, 0);

        ReceiverSetting { major: 7 }.save(&mut storage).unwrap();
        assert_eq!(storage.values["receiver"], br#"{"major":7}"#.to_vec());
        assert_eq!(ReceiverSetting::load(&storage).unwrap().major, 7);

        ReceiverSetting::delete(&mut storage).unwrap();
        assert!(ReceiverSetting::load(&storage).unwrap_err().is_not_found());
    }
}
