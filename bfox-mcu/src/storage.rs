//! Persistent Storage Abstraction Traits
//!
//! Traits for non-volatile storage of configuration records.

/// Boxed error surfaced by storage backends
pub type StorageError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Trait for persistent key/value storage
///
/// MCU-specific crates implement this trait using their storage backend
/// (NVS for ESP32). Keys are short ASCII names within one namespace.
pub trait Storage {
    /// Read the value stored under `key`, `None` if never written
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the value stored under `key`
    fn save(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Remove `key`, succeeding if it was absent
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for &mut S {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).load(key)
    }

    fn save(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        (**self).save(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::{Storage, StorageError};
    use std::collections::HashMap;

    /// In-memory storage that counts writes and can be told to fail
    #[derive(Debug, Default)]
    pub struct MemoryStorage {
        pub values: HashMap<String, Vec<u8>>,
        pub saves: usize,
        pub fail_writes: bool,
    }

    impl MemoryStorage {
        pub fn with(key: &str, value: &str) -> Self {
            let mut storage = Self::default();
            storage.values.insert(key.to_string(), value.as_bytes().to_vec());
            storage
        }
    }

    impl Storage for MemoryStorage {
        fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            Ok(self.values.get(key).cloned())
        }

        fn save(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
            self.saves += 1;
            if self.fail_writes {
                return Err("flash write failed".into());
            }
            self.values.insert(key.to_string(), value.to_vec());
            Ok(())
        }

        fn remove(&mut self, key: &str) -> Result<(), StorageError> {
            if self.fail_writes {
                return Err("flash write failed".into());
            }
            self.values.remove(key);
            Ok(())
        }
    }
}
