//! Settings storage in ESP32 NVS (Non-Volatile Storage)

use bfox_mcu::storage::{Storage, StorageError};
use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};

/// Upper bound for one stored JSON record
const MAX_RECORD_LEN: usize = 2048;

pub struct NvsStorage {
    nvs: EspNvs<NvsDefault>,
}

impl NvsStorage {
    pub fn open(partition: &EspNvsPartition<NvsDefault>, namespace: &str) -> anyhow::Result<Self> {
        let nvs = EspNvs::new(partition.clone(), namespace, true)?;
        Ok(Self { nvs })
    }
}

impl Storage for NvsStorage {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let mut buf = vec![0u8; MAX_RECORD_LEN];
        Ok(self.nvs.get_blob(key, &mut buf)?.map(<[u8]>::to_vec))
    }

    fn save(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.nvs.set_blob(key, value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.nvs.remove(key)?;
        Ok(())
    }
}
