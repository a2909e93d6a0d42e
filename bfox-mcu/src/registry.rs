//! Live table of beacons currently in range
//!
//! Written from the scan consumer, read from the display loop. One mutex
//! guards the table and is held only while inserting, pruning or copying;
//! sorting and everything downstream works on the copy.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Entries unseen for longer than this are dropped
pub const DEFAULT_EXPIRY_MS: u64 = 2000;

/// Last observation of one transmitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconSighting {
    pub minor: u16,
    pub rssi: i32,
    /// Monotonic milliseconds since boot
    pub last_seen_ms: u64,
}

/// Beacons keyed by minor
///
/// Only the minor identifies a transmitter, so every admitted advertisement
/// must already be filtered down to a single UUID and major.
#[derive(Debug)]
pub struct BeaconRegistry {
    items: Mutex<BTreeMap<u16, BeaconSighting>>,
    expiry_ms: u64,
}

impl Default for BeaconRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY_MS)
    }
}

impl BeaconRegistry {
    pub fn new(expiry_ms: u64) -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            expiry_ms,
        }
    }

    pub fn expiry_ms(&self) -> u64 {
        self.expiry_ms
    }

    fn items(&self) -> MutexGuard<'_, BTreeMap<u16, BeaconSighting>> {
        // every critical section leaves the map consistent, so a panic
        // elsewhere while holding the lock does not invalidate it
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a sighting, replacing any earlier one for the same minor
    ///
    /// The newest sighting wins even if the earlier one was stronger.
    pub fn upsert(&self, sighting: BeaconSighting) {
        self.items().insert(sighting.minor, sighting);
    }

    /// Drop expired entries and return the rest, strongest signal first
    ///
    /// Equal RSSI keeps ascending minor order.
    pub fn snapshot_sorted_by_rssi(&self, now_ms: u64) -> Vec<BeaconSighting> {
        let mut list: Vec<BeaconSighting> = {
            let mut items = self.items();
            items.retain(|_, item| now_ms.saturating_sub(item.last_seen_ms) <= self.expiry_ms);
            items.values().copied().collect()
        };
        list.sort_by(|a, b| b.rssi.cmp(&a.rssi));
        list
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn clear(&self) {
        self.items().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sighting(minor: u16, rssi: i32, last_seen_ms: u64) -> BeaconSighting {
        BeaconSighting {
            minor,
            rssi,
            last_seen_ms,
        }
    }

    fn minors(list: &[BeaconSighting]) -> Vec<u16> {
        list.iter().map(|s| s.minor).collect()
    }

    #[test]
    fn latest_sighting_wins() {
        let registry = BeaconRegistry::default();
        registry.upsert(sighting(5, -70, 0));
        registry.upsert(sighting(5, -90, 10));

        let snapshot = registry.snapshot_sorted_by_rssi(10);
        assert_eq!(snapshot, vec![sighting(5, -90, 10)]);
    }

    #[test]
    fn expiry_window_is_inclusive() {
        let registry = BeaconRegistry::new(2000);
        registry.upsert(sighting(1, -60, 0));

        assert_eq!(registry.snapshot_sorted_by_rssi(1999).len(), 1);
        assert_eq!(registry.snapshot_sorted_by_rssi(2000).len(), 1);
        assert!(registry.snapshot_sorted_by_rssi(2001).is_empty());
        // pruned for good, not just hidden
        assert!(registry.is_empty());
    }

    #[test]
    fn clock_behind_last_seen_keeps_entry() {
        let registry = BeaconRegistry::new(2000);
        registry.upsert(sighting(1, -60, 5000));
        assert_eq!(registry.snapshot_sorted_by_rssi(100).len(), 1);
    }

    #[test]
    fn strongest_first() {
        let registry = BeaconRegistry::default();
        registry.upsert(sighting(1, -80, 0));
        registry.upsert(sighting(2, -50, 0));
        registry.upsert(sighting(3, -65, 0));

        assert_eq!(minors(&registry.snapshot_sorted_by_rssi(0)), vec![2, 3, 1]);
    }

    #[test]
    fn ties_break_by_minor() {
        let registry = BeaconRegistry::default();
        registry.upsert(sighting(9, -60, 0));
        registry.upsert(sighting(4, -60, 0));
        registry.upsert(sighting(6, -60, 0));

        assert_eq!(minors(&registry.snapshot_sorted_by_rssi(0)), vec![4, 6, 9]);
    }

    #[test]
    fn empty_registry_gives_empty_snapshot() {
        let registry = BeaconRegistry::default();
        assert!(registry.snapshot_sorted_by_rssi(0).is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn partial_expiry() {
        let registry = BeaconRegistry::new(2000);
        registry.upsert(sighting(1, -40, 0));
        registry.upsert(sighting(2, -90, 1500));

        assert_eq!(minors(&registry.snapshot_sorted_by_rssi(3000)), vec![2]);
    }

    #[test]
    fn concurrent_writers_and_reader() {
        let registry = Arc::new(BeaconRegistry::new(u64::MAX));
        let writers: Vec<_> = (0..4u16)
            .map(|w| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..250u16 {
                        registry.upsert(sighting(w * 1000 + i, -(i32::from(i % 90)), u64::from(i)));
                    }
                })
            })
            .collect();

        for _ in 0..50 {
            let snapshot = registry.snapshot_sorted_by_rssi(0);
            assert!(snapshot.windows(2).all(|w| w[0].rssi >= w[1].rssi));
        }

        for writer in writers {
            writer.join().unwrap();
        }
        assert_eq!(registry.len(), 1000);
    }
}
