//! Admission of scanned advertisements into the beacon registry

use crate::registry::BeaconSighting;
use bfox_proto::{AdvertisementError, IBeacon, ProximityUuid};

/// Why an advertisement was not admitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotIBeacon(AdvertisementError),
    ForeignUuid,
    ForeignMajor(u16),
}

/// Accepts only iBeacons of one proximity UUID and one major
///
/// The major is fixed when the receiver is configured; this is what pairs a
/// receiver to one group of beacons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisementFilter {
    target_uuid: ProximityUuid,
    target_major: u16,
}

impl AdvertisementFilter {
    pub fn new(target_uuid: ProximityUuid, target_major: u16) -> Self {
        Self {
            target_uuid,
            target_major,
        }
    }

    pub fn target_major(&self) -> u16 {
        self.target_major
    }

    /// Run every check, cheapest first
    pub fn check(
        &self,
        payload: &[u8],
        rssi: i32,
        now_ms: u64,
    ) -> Result<BeaconSighting, Rejection> {
        let beacon = IBeacon::from_bytes(payload).map_err(Rejection::NotIBeacon)?;
        if beacon.proximity_uuid != self.target_uuid {
            return Err(Rejection::ForeignUuid);
        }
        if beacon.major != self.target_major {
            return Err(Rejection::ForeignMajor(beacon.major));
        }

        Ok(BeaconSighting {
            minor: beacon.minor,
            rssi,
            last_seen_ms: now_ms,
        })
    }

    pub fn accept(&self, payload: &[u8], rssi: i32, now_ms: u64) -> Option<BeaconSighting> {
        self.check(payload, rssi, now_ms).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfox_proto::BFOX_PROXIMITY_UUID;

    fn advert(major: u16, minor: u16) -> [u8; 30] {
        IBeacon::new(BFOX_PROXIMITY_UUID, major, minor, -59).to_bytes()
    }

    #[test]
    fn matching_beacon_is_admitted() {
        let filter = AdvertisementFilter::new(BFOX_PROXIMITY_UUID, 3);
        assert_eq!(
            filter.check(&advert(3, 17), -64, 1234),
            Ok(BeaconSighting {
                minor: 17,
                rssi: -64,
                last_seen_ms: 1234
            })
        );
    }

    #[test]
    fn wrong_length_is_rejected_regardless_of_tail() {
        let filter = AdvertisementFilter::new(BFOX_PROXIMITY_UUID, 3);
        let bytes = advert(3, 1);

        assert_eq!(
            filter.check(&bytes[..29], -50, 0),
            Err(Rejection::NotIBeacon(AdvertisementError::Length(29)))
        );

        let mut long = bytes.to_vec();
        long.push(0x00);
        assert_eq!(
            filter.check(&long, -50, 0),
            Err(Rejection::NotIBeacon(AdvertisementError::Length(31)))
        );
    }

    #[test]
    fn altered_header_is_rejected() {
        let filter = AdvertisementFilter::new(BFOX_PROXIMITY_UUID, 3);
        for i in 0..9 {
            let mut bytes = advert(3, 1);
            bytes[i] = bytes[i].wrapping_add(1);
            assert_eq!(
                filter.accept(&bytes, -50, 0),
                None,
                "header byte {i} altered"
            );
        }
    }

    #[test]
    fn foreign_uuid_is_rejected() {
        let filter = AdvertisementFilter::new(BFOX_PROXIMITY_UUID, 3);
        let other = IBeacon::new(ProximityUuid([0x11; 16]), 3, 1, -59).to_bytes();
        assert_eq!(filter.check(&other, -50, 0), Err(Rejection::ForeignUuid));
    }

    #[test]
    fn other_group_is_rejected() {
        let filter = AdvertisementFilter::new(BFOX_PROXIMITY_UUID, 3);
        assert_eq!(
            filter.check(&advert(4, 1), -50, 0),
            Err(Rejection::ForeignMajor(4))
        );
    }
}
