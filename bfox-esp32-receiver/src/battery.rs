//! Battery voltage on A0 (GPIO0) through the 1:2 divider
//!
//! The receiver only checks the cell once at boot.

use bfox_mcu::battery::{average_mv, BatteryMonitor, ADC_SAMPLES};
use esp_idf_svc::hal::adc::attenuation::DB_11;
use esp_idf_svc::hal::adc::oneshot::config::{AdcChannelConfig, Calibration};
use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_svc::hal::adc::ADC1;
use esp_idf_svc::hal::gpio::Gpio0;
use esp_idf_svc::sys::EspError;

pub type BatteryChannel = AdcChannelDriver<'static, Gpio0, AdcDriver<'static, ADC1>>;

pub fn open(adc: ADC1, pin: Gpio0) -> Result<BatteryChannel, EspError> {
    let config = AdcChannelConfig {
        attenuation: DB_11,
        calibration: Calibration::Curve,
        ..Default::default()
    };
    AdcChannelDriver::new(AdcDriver::new(adc)?, pin, &config)
}

/// Average a burst of readings into `monitor`, returning the cell voltage
pub fn measure(channel: &mut BatteryChannel, monitor: &BatteryMonitor) -> Option<f32> {
    let readings: Vec<u32> = (0..ADC_SAMPLES)
        .filter_map(|_| channel.read().ok().map(u32::from))
        .collect();
    let mv = average_mv(&readings)?;
    Some(monitor.record_mv(mv))
}
