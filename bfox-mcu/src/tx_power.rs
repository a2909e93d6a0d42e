//! Transmit power levels
//!
//! Settings carry an abstract level; the radio wants one of its own fixed
//! power steps.

use log::warn;

/// Transmit power as stored in settings and sent over the setting characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum TxPower {
    None = 0,
    /// +9 dBm (8 mW)
    High = 1,
    /// +6 dBm (4 mW)
    Mid = 2,
    /// +3 dBm (2 mW)
    Low = 3,
    /// -12 dBm (0.06 mW)
    SuperLow = 4,
}

impl TxPower {
    /// Number of entries in the power table
    pub const COUNT: i32 = 5;

    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(TxPower::None),
            1 => Some(TxPower::High),
            2 => Some(TxPower::Mid),
            3 => Some(TxPower::Low),
            4 => Some(TxPower::SuperLow),
            _ => None,
        }
    }

    pub fn raw(self) -> i16 {
        self as i16
    }
}

/// Radio output power steps used by this firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioPowerLevel {
    N12,
    P3,
    P6,
    P9,
}

impl RadioPowerLevel {
    pub fn dbm(self) -> i8 {
        match self {
            RadioPowerLevel::N12 => -12,
            RadioPowerLevel::P3 => 3,
            RadioPowerLevel::P6 => 6,
            RadioPowerLevel::P9 => 9,
        }
    }
}

const POWER_TABLE: [RadioPowerLevel; TxPower::COUNT as usize] = [
    RadioPowerLevel::P9,  // None
    RadioPowerLevel::P9,  // High
    RadioPowerLevel::P6,  // Mid
    RadioPowerLevel::P3,  // Low
    RadioPowerLevel::N12, // SuperLow
];

/// Map a raw tx power setting to the radio level
///
/// `None` and anything outside the table is not a usable setting; it falls
/// back to the `High` entry so a bad record never keeps the beacon dark.
pub fn radio_power_level(raw: i32) -> RadioPowerLevel {
    if raw <= 0 || raw >= TxPower::COUNT {
        warn!("Invalid Tx Power value {}, using high", raw);
        return POWER_TABLE[TxPower::High as usize];
    }
    POWER_TABLE[raw as usize]
}
