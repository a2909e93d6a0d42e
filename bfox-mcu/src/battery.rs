//! Battery voltage
//!
//! The cell is measured through a 1:2 resistor divider on an ADC pin.

use std::sync::atomic::{AtomicI32, Ordering};

/// Below this the cell is considered flat
pub const DISCHARGE_LIMIT_V: f32 = 3.2;

/// ADC readings averaged per measurement
pub const ADC_SAMPLES: usize = 10;

/// Cell voltage for a divider output in millivolts
pub fn volts_from_adc_mv(mv: u32) -> f32 {
    2.0 * mv as f32 / 1000.0
}

pub fn is_depleted(volts: f32) -> bool {
    volts <= DISCHARGE_LIMIT_V
}

/// Mean of a burst of ADC readings, `None` if the burst was empty
pub fn average_mv(readings: &[u32]) -> Option<u32> {
    if readings.is_empty() {
        return None;
    }
    let sum: u64 = readings.iter().map(|&mv| u64::from(mv)).sum();
    Some((sum / readings.len() as u64) as u32)
}

/// Latest battery reading, shared between the sampler and the GATT server
#[derive(Debug, Default)]
pub struct BatteryMonitor {
    centivolts: AtomicI32,
}

impl BatteryMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new measurement, returning the cell voltage
    pub fn record_mv(&self, mv: u32) -> f32 {
        let volts = volts_from_adc_mv(mv);
        self.record_volts(volts);
        volts
    }

    pub fn record_volts(&self, volts: f32) {
        self.centivolts
            .store((volts * 100.0).round() as i32, Ordering::Relaxed);
    }

    pub fn volts(&self) -> f32 {
        self.centivolts.load(Ordering::Relaxed) as f32 / 100.0
    }

    /// Voltage characteristic value: volts x 100 as `i16`
    pub fn centivolts(&self) -> i16 {
        self.centivolts
            .load(Ordering::Relaxed)
            .clamp(i16::MIN.into(), i16::MAX.into()) as i16
    }

    pub fn is_depleted(&self) -> bool {
        is_depleted(self.volts())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divider_math() {
        assert!((volts_from_adc_mv(2000) - 4.0).abs() < 1e-6);
        assert!((volts_from_adc_mv(1650) - 3.3).abs() < 1e-6);
        assert_eq!(volts_from_adc_mv(0), 0.0);
    }

    #[test]
    fn depletion_threshold() {
        assert!(is_depleted(3.2));
        assert!(is_depleted(2.9));
        assert!(!is_depleted(3.21));
    }

    #[test]
    fn averaging() {
        assert_eq!(average_mv(&[]), None);
        assert_eq!(average_mv(&[1600, 1700]), Some(1650));
        assert_eq!(average_mv(&[u32::MAX, u32::MAX]), Some(u32::MAX));
    }

    #[test]
    fn monitor_reports_centivolts() {
        let monitor = BatteryMonitor::new();
        assert_eq!(monitor.centivolts(), 0);
        assert!(monitor.is_depleted());

        let volts = monitor.record_mv(1945);
        assert!((volts - 3.89).abs() < 1e-6);
        assert_eq!(monitor.centivolts(), 389);
        assert!(!monitor.is_depleted());
        assert_eq!(monitor.centivolts().to_le_bytes(), [0x85, 0x01]);
    }
}
