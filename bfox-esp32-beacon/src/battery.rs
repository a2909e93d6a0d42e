//! Battery voltage sampling on A0 (GPIO0) through the 1:2 divider

use bfox_mcu::battery::{average_mv, BatteryMonitor, ADC_SAMPLES};
use esp_idf_svc::hal::adc::attenuation::DB_11;
use esp_idf_svc::hal::adc::oneshot::config::{AdcChannelConfig, Calibration};
use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_svc::hal::adc::ADC1;
use esp_idf_svc::hal::gpio::Gpio0;
use esp_idf_svc::sys::EspError;
use log::*;
use std::sync::Arc;
use std::time::Duration;

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

/// Keep sampling every `period`; `on_depleted` runs once the cell is flat
pub fn spawn_sampler(
    mut channel: BatteryChannel,
    monitor: Arc<BatteryMonitor>,
    period: Duration,
    on_depleted: impl Fn(f32) + Send + 'static,
) {
    let spawned = std::thread::Builder::new()
        .name("battery".into())
        .stack_size(4096)
        .spawn(move || loop {
            match measure(&mut channel, &monitor) {
                Some(volts) if monitor.is_depleted() => {
                    warn!("Battery voltage is low: {:.2}V", volts);
                    on_depleted(volts);
                }
                Some(volts) => debug!("Battery {:.2}V", volts),
                None => warn!("Battery ADC read failed"),
            }
            std::thread::sleep(period);
        });
    if let Err(e) = spawned {
        error!("Failed to spawn battery sampler: {}", e);
    }
}
