//! Beacon setting characteristic payload
//!
//! ```text
//! [1:name_len][name_len:device_name]
//! [2:major][2:minor][2:measured_power][2:tx_power][2:adv_interval_ms]
//! ```
//!
//! All integers are little-endian. The legacy layout stops after `tx_power`.

/// Bytes following the device name in the current layout
pub const SETTINGS_TAIL_LEN: usize = 10;

/// Bytes following the device name in the legacy layout (no interval)
pub const LEGACY_SETTINGS_TAIL_LEN: usize = 8;

/// Which revision of the payload a peer speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsLayout {
    /// With trailing `adv_interval_ms`
    #[default]
    Current,
    /// Without `adv_interval_ms`
    Legacy,
}

impl SettingsLayout {
    pub fn tail_len(self) -> usize {
        match self {
            SettingsLayout::Current => SETTINGS_TAIL_LEN,
            SettingsLayout::Legacy => LEGACY_SETTINGS_TAIL_LEN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("empty settings payload")]
    Empty,
    #[error("settings payload length {actual}, name length {name_len} requires {expected}")]
    Length {
        name_len: usize,
        expected: usize,
        actual: usize,
    },
    #[error("device name is not valid UTF-8")]
    InvalidName,
    #[error("device name is {0} bytes, at most 255 fit")]
    NameTooLong(usize),
}

/// Settings as exchanged over the setting characteristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsPayload {
    pub device_name: String,
    pub major: u16,
    pub minor: u16,
    pub measured_power: i16,
    pub tx_power: i16,
    /// `None` when the payload used the legacy layout
    pub adv_interval_ms: Option<u16>,
}

impl SettingsPayload {
    /// Encode using the layout implied by `adv_interval_ms`
    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        let name = self.device_name.as_bytes();
        let name_len = u8::try_from(name.len()).map_err(|_| WireError::NameTooLong(name.len()))?;

        let layout = match self.adv_interval_ms {
            Some(_) => SettingsLayout::Current,
            None => SettingsLayout::Legacy,
        };

        let mut buf = Vec::with_capacity(1 + name.len() + layout.tail_len());
        buf.push(name_len);
        buf.extend_from_slice(name);
        buf.extend_from_slice(&self.major.to_le_bytes());
        buf.extend_from_slice(&self.minor.to_le_bytes());
        buf.extend_from_slice(&self.measured_power.to_le_bytes());
        buf.extend_from_slice(&self.tx_power.to_le_bytes());
        if let Some(interval) = self.adv_interval_ms {
            buf.extend_from_slice(&interval.to_le_bytes());
        }
        Ok(buf)
    }

    /// Decode a payload in the given layout
    ///
    /// The declared name length must account for the payload exactly; a
    /// single byte of slack either way rejects the whole write.
    pub fn from_bytes(data: &[u8], layout: SettingsLayout) -> Result<Self, WireError> {
        let (&name_len, rest) = data.split_first().ok_or(WireError::Empty)?;
        let name_len = name_len as usize;

        let expected = 1 + name_len + layout.tail_len();
        if data.len() != expected {
            return Err(WireError::Length {
                name_len,
                expected,
                actual: data.len(),
            });
        }

        let (name, tail) = rest.split_at(name_len);
        let device_name = std::str::from_utf8(name)
            .map_err(|_| WireError::InvalidName)?
            .to_string();

        let u16_at = |i: usize| u16::from_le_bytes([tail[i], tail[i + 1]]);
        let i16_at = |i: usize| i16::from_le_bytes([tail[i], tail[i + 1]]);

        Ok(Self {
            device_name,
            major: u16_at(0),
            minor: u16_at(2),
            measured_power: i16_at(4),
            tx_power: i16_at(6),
            adv_interval_ms: match layout {
                SettingsLayout::Current => Some(u16_at(8)),
                SettingsLayout::Legacy => None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> SettingsPayload {
        SettingsPayload {
            device_name: "Fox-7".to_string(),
            major: 3,
            minor: 0x0102,
            measured_power: -59,
            tx_power: 2,
            adv_interval_ms: Some(500),
        }
    }

    #[test]
    fn bit_exact_layout() {
        let bytes = payload().to_bytes().unwrap();
        assert_eq!(
            bytes,
            vec![
                5, b'F', b'o', b'x', b'-', b'7', // name
                0x03, 0x00, // major
                0x02, 0x01, // minor
                0xC5, 0xFF, // measured power -59
                0x02, 0x00, // tx power
                0xF4, 0x01, // 500 ms
            ]
        );
        assert_eq!(bytes.len(), 5 + 11);
    }

    #[test]
    fn decode_current_layout() {
        let bytes = payload().to_bytes().unwrap();
        assert_eq!(
            SettingsPayload::from_bytes(&bytes, SettingsLayout::Current),
            Ok(payload())
        );
    }

    #[test]
    fn decode_legacy_layout() {
        let legacy = SettingsPayload {
            adv_interval_ms: None,
            ..payload()
        };
        let bytes = legacy.to_bytes().unwrap();
        assert_eq!(bytes.len(), 5 + 9);
        assert_eq!(
            SettingsPayload::from_bytes(&bytes, SettingsLayout::Legacy),
            Ok(legacy)
        );
        // a legacy payload is one field short for the current layout
        assert!(matches!(
            SettingsPayload::from_bytes(&bytes, SettingsLayout::Current),
            Err(WireError::Length { expected: 16, actual: 14, .. })
        ));
    }

    #[test]
    fn declared_name_length_must_match_total() {
        let mut bytes = payload().to_bytes().unwrap();
        bytes.push(0);
        assert_eq!(
            SettingsPayload::from_bytes(&bytes, SettingsLayout::Current),
            Err(WireError::Length {
                name_len: 5,
                expected: 16,
                actual: 17
            })
        );

        bytes.truncate(15);
        assert!(matches!(
            SettingsPayload::from_bytes(&bytes, SettingsLayout::Current),
            Err(WireError::Length { actual: 15, .. })
        ));

        // name length byte pointing past the end of the buffer
        let bogus = [200u8, 1, 2, 3];
        assert!(matches!(
            SettingsPayload::from_bytes(&bogus, SettingsLayout::Current),
            Err(WireError::Length { name_len: 200, .. })
        ));
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert_eq!(
            SettingsPayload::from_bytes(&[], SettingsLayout::Current),
            Err(WireError::Empty)
        );
    }

    #[test]
    fn invalid_utf8_name_is_rejected() {
        let mut bytes = payload().to_bytes().unwrap();
        bytes[1] = 0xFF;
        assert_eq!(
            SettingsPayload::from_bytes(&bytes, SettingsLayout::Current),
            Err(WireError::InvalidName)
        );
    }

    #[test]
    fn overlong_name_cannot_be_encoded() {
        let long = SettingsPayload {
            device_name: "x".repeat(256),
            ..payload()
        };
        assert_eq!(long.to_bytes(), Err(WireError::NameTooLong(256)));

        let max = SettingsPayload {
            device_name: "x".repeat(255),
            ..payload()
        };
        assert_eq!(max.to_bytes().unwrap().len(), 255 + 11);
    }
}
