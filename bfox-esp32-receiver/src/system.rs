//! Chip restart, deep sleep and the button wakeup source

use bfox_mcu::system::PowerControl;
use esp_idf_svc::sys::{
    esp, esp_sleep_enable_ext1_wakeup, esp_sleep_ext1_wakeup_mode_t_ESP_EXT1_WAKEUP_ANY_LOW,
    rtc_gpio_init, rtc_gpio_mode_t_RTC_GPIO_MODE_INPUT_ONLY, rtc_gpio_pulldown_dis,
    rtc_gpio_pullup_en, rtc_gpio_set_direction, EspError,
};
use log::*;

#[derive(Debug, Clone, Copy, Default)]
pub struct EspPower;

impl PowerControl for EspPower {
    fn restart(&mut self) {
        info!("Restarting now");
        unsafe { esp_idf_svc::sys::esp_restart() };
    }

    fn deep_sleep(&mut self) {
        info!("Entering deep sleep");
        unsafe { esp_idf_svc::sys::esp_deep_sleep_start() };
    }
}

/// Wake from deep sleep when `gpio` is pulled low
pub fn enable_wakeup_on_low(gpio: i32) -> Result<(), EspError> {
    esp!(unsafe { rtc_gpio_init(gpio) })?;
    esp!(unsafe { rtc_gpio_set_direction(gpio, rtc_gpio_mode_t_RTC_GPIO_MODE_INPUT_ONLY) })?;
    esp!(unsafe { rtc_gpio_pullup_en(gpio) })?;
    esp!(unsafe { rtc_gpio_pulldown_dis(gpio) })?;
    esp!(unsafe {
        esp_sleep_enable_ext1_wakeup(
            1u64 << gpio,
            esp_sleep_ext1_wakeup_mode_t_ESP_EXT1_WAKEUP_ANY_LOW,
        )
    })
}
