//! Scan result delivery
//!
//! The radio stack calls back from its own host task for every
//! advertisement. That side only filters and queues; the registry is
//! updated by a consumer task reading the other end of the queue.

use crate::filter::AdvertisementFilter;
use crate::registry::{BeaconRegistry, BeaconSighting};
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, TrySendError, sync_channel};

/// Queue depth used by the receiver firmware
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Create a bounded sighting queue behind `filter`
pub fn scan_channel(
    filter: AdvertisementFilter,
    capacity: usize,
) -> (SightingSender, SightingReceiver) {
    let (tx, rx) = sync_channel(capacity);
    let dropped = Arc::new(AtomicUsize::new(0));
    (
        SightingSender {
            filter,
            tx,
            dropped: dropped.clone(),
        },
        SightingReceiver {
            rx,
            dropped,
            reported: 0,
        },
    )
}

/// Producer half, owned by the scan callback
#[derive(Debug, Clone)]
pub struct SightingSender {
    filter: AdvertisementFilter,
    tx: SyncSender<BeaconSighting>,
    dropped: Arc<AtomicUsize>,
}

impl SightingSender {
    /// Filter one advertisement and queue it if admitted
    ///
    /// Never blocks. Returns true only if a sighting was queued.
    pub fn offer(&self, payload: &[u8], rssi: i32, now_ms: u64) -> bool {
        let Some(sighting) = self.filter.accept(payload, rssi, now_ms) else {
            return false;
        };
        match self.tx.try_send(sighting) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Sightings lost to a full or closed queue since start
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer half, owned by the task that feeds the registry
#[derive(Debug)]
pub struct SightingReceiver {
    rx: Receiver<BeaconSighting>,
    dropped: Arc<AtomicUsize>,
    reported: usize,
}

impl SightingReceiver {
    /// Move everything queued so far into `registry` without blocking
    pub fn drain_into(&mut self, registry: &BeaconRegistry) -> usize {
        let mut count = 0;
        loop {
            match self.rx.try_recv() {
                Ok(sighting) => {
                    registry.upsert(sighting);
                    count += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        self.report_drops();
        count
    }

    /// Feed `registry` until every sender is gone
    pub fn run(mut self, registry: &BeaconRegistry) {
        while let Ok(sighting) = self.rx.recv() {
            registry.upsert(sighting);
            self.report_drops();
        }
        debug!("Scan queue closed");
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    fn report_drops(&mut self) {
        let dropped = self.dropped();
        if dropped > self.reported {
            warn!(
                "Scan queue full, dropped {} sightings",
                dropped - self.reported
            );
            self.reported = dropped;
        }
    }
}
