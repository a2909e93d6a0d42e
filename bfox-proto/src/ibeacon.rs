//! iBeacon advertisement framing
//!
//! The advertisement is a fixed 30 byte buffer: BLE flags, one manufacturer
//! specific AD structure with Apple's company id, and the iBeacon vendor block.
//! BLE is little-endian, but iBeacon carries major/minor in network order.

/// Total size of an encoded iBeacon advertisement
pub const IBEACON_LEN: usize = 30;

/// Size of the fixed header that every iBeacon advertisement starts with
pub const IBEACON_HEADER_LEN: usize = 9;

/// Apple company identifier
pub const APPLE_COMPANY_ID: u16 = 0x004C;

/// iBeacon sub-type and remaining length, `0x1502` little-endian
pub const IBEACON_BEACON_TYPE: u16 = 0x1502;

/// Flags (len 2, type 1, LE general discoverable + BR/EDR not supported),
/// AD length 0x1A, AD type 0xFF, company id, beacon type
pub const IBEACON_HEADER: [u8; IBEACON_HEADER_LEN] =
    [0x02, 0x01, 0x06, 0x1A, 0xFF, 0x4C, 0x00, 0x02, 0x15];

/// Proximity UUID shared by every B-Fox beacon and receiver
/// (C65B2C5D-9E53-46EC-8B8E-54D9E2F21188)
pub const BFOX_PROXIMITY_UUID: ProximityUuid = ProximityUuid([
    0xC6, 0x5B, 0x2C, 0x5D, 0x9E, 0x53, 0x46, 0xEC, 0x8B, 0x8E, 0x54, 0xD9, 0xE2, 0xF2, 0x11,
    0x88,
]);

/// Swap the two bytes of a u16
///
/// Converts between host order on a little-endian MCU and the network order
/// iBeacon uses for major/minor.
pub const fn swap16(x: u16) -> u16 {
    ((x & 0xff00) >> 8) | ((x & 0x00ff) << 8)
}

/// 128-bit proximity UUID, stored in transmission (big-endian) order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProximityUuid(pub [u8; 16]);

impl ProximityUuid {
    /// Copy at most 16 bytes out of `bytes`
    ///
    /// Excess bytes are ignored and a short slice leaves the tail zeroed.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut uuid = [0u8; 16];
        let n = bytes.len().min(16);
        uuid[..n].copy_from_slice(&bytes[..n]);
        Self(uuid)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<uuid::Uuid> for ProximityUuid {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(*uuid.as_bytes())
    }
}

impl From<ProximityUuid> for uuid::Uuid {
    fn from(uuid: ProximityUuid) -> Self {
        uuid::Uuid::from_bytes(uuid.0)
    }
}

impl std::fmt::Display for ProximityUuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:X}", uuid::Uuid::from(*self))
    }
}

/// Reasons a buffer is not a B-Fox compatible iBeacon advertisement
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdvertisementError {
    #[error("advertisement length {0}, expected {IBEACON_LEN}")]
    Length(usize),
    #[error("advertisement header does not match iBeacon template")]
    Header,
}

/// Decoded iBeacon fields, major/minor in host order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IBeacon {
    pub proximity_uuid: ProximityUuid,
    pub major: u16,
    pub minor: u16,
    pub measured_power: i8,
}

impl IBeacon {
    pub fn new(proximity_uuid: ProximityUuid, major: u16, minor: u16, measured_power: i8) -> Self {
        Self {
            proximity_uuid,
            major,
            minor,
            measured_power,
        }
    }

    /// Encode into the advertisement buffer handed to the radio
    pub fn to_bytes(&self) -> [u8; IBEACON_LEN] {
        let mut buf = [0u8; IBEACON_LEN];
        buf[..IBEACON_HEADER_LEN].copy_from_slice(&IBEACON_HEADER);
        buf[9..25].copy_from_slice(&self.proximity_uuid.0);
        buf[25..27].copy_from_slice(&swap16(self.major).to_le_bytes());
        buf[27..29].copy_from_slice(&swap16(self.minor).to_le_bytes());
        buf[29] = self.measured_power as u8;
        buf
    }

    /// Validate and decode a raw advertisement
    ///
    /// Length is checked before the header so foreign traffic is discarded
    /// with the least work.
    pub fn from_bytes(data: &[u8]) -> Result<Self, AdvertisementError> {
        if data.len() != IBEACON_LEN {
            return Err(AdvertisementError::Length(data.len()));
        }
        if data[..IBEACON_HEADER_LEN] != IBEACON_HEADER {
            return Err(AdvertisementError::Header);
        }

        Ok(Self {
            proximity_uuid: ProximityUuid::from_slice(&data[9..25]),
            major: swap16(u16::from_le_bytes([data[25], data[26]])),
            minor: swap16(u16::from_le_bytes([data[27], data[28]])),
            measured_power: data[29] as i8,
        })
    }
}

/// Rebuild the canonical advertisement from manufacturer specific data
///
/// Desktop BLE stacks hand out the manufacturer data already split into the
/// company id and the bytes following it (beacon type onwards).
pub fn frame_from_manufacturer_data(company_id: u16, payload: &[u8]) -> Option<[u8; IBEACON_LEN]> {
    if company_id != APPLE_COMPANY_ID || payload.len() != IBEACON_LEN - 7 {
        return None;
    }

    let mut frame = [0u8; IBEACON_LEN];
    frame[..7].copy_from_slice(&IBEACON_HEADER[..7]);
    frame[7..].copy_from_slice(payload);
    Some(frame)
}
