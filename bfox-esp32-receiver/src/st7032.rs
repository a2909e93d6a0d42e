//! ST7032 16x2 character LCD over I2C

use bfox_mcu::display::{LineDisplay, COLUMNS, ROWS};
use esp_idf_svc::hal::delay::{Ets, FreeRtos, BLOCK};
use esp_idf_svc::hal::i2c::I2cDriver;
use esp_idf_svc::sys::EspError;

pub const DEFAULT_ADDRESS: u8 = 0x3E;

// control byte prefixes
const CONTROL_COMMAND: u8 = 0x00;
const CONTROL_DATA: u8 = 0x40;

const CLEAR_DISPLAY: u8 = 0x01;
const ENTRY_MODE_SET: u8 = 0x04;
const DISPLAY_CONTROL: u8 = 0x08;
const FUNCTION_SET: u8 = 0x20;
const SET_DDRAM_ADDR: u8 = 0x80;

// extended instruction set (IS = 1)
const EX_INSTRUCTION: u8 = 0x01;
const EX_BIAS_OSC: u8 = 0x10;
const EX_POWER_ICON_CONTRAST_HIGH: u8 = 0x50;
const EX_FOLLOWER_CONTROL: u8 = 0x60;
const EX_CONTRAST_LOW: u8 = 0x70;

const ENTRY_LEFT: u8 = 0x02;
const DISPLAY_ON: u8 = 0x04;
const MODE_8BIT: u8 = 0x10;
const TWO_LINES: u8 = 0x08;
const BIAS_1_5: u8 = 0x00;
const OSC_183HZ: u8 = 0x04;
const FOLLOWER_ON: u8 = 0x08;
const RAB_2_00: u8 = 0x04;
const ICON_ON: u8 = 0x08;
const BOOST_ON: u8 = 0x04;

const ROW_OFFSETS: [u8; ROWS] = [0x00, 0x40];

pub struct St7032<'d> {
    i2c: I2cDriver<'d>,
    address: u8,
}

impl<'d> St7032<'d> {
    /// Run the power-on sequence for a two line, 5x8 dot panel
    pub fn new(i2c: I2cDriver<'d>, address: u8) -> Result<Self, EspError> {
        let mut lcd = Self { i2c, address };

        FreeRtos::delay_ms(40);
        lcd.normal_function_set()?;
        lcd.extended_function_set()?;
        lcd.command(EX_BIAS_OSC | BIAS_1_5 | OSC_183HZ)?;
        lcd.command(EX_FOLLOWER_CONTROL | FOLLOWER_ON | RAB_2_00)?;
        FreeRtos::delay_ms(200);
        lcd.normal_function_set()?;
        lcd.command(DISPLAY_CONTROL | DISPLAY_ON)?;
        lcd.clear()?;
        lcd.command(ENTRY_MODE_SET | ENTRY_LEFT)?;

        Ok(lcd)
    }

    /// Contrast is a 6 bit value
    pub fn set_contrast(&mut self, contrast: u8) -> Result<(), EspError> {
        self.extended_function_set()?;
        self.command(EX_CONTRAST_LOW | (contrast & 0x0f))?;
        self.command(EX_POWER_ICON_CONTRAST_HIGH | ICON_ON | BOOST_ON | ((contrast >> 4) & 0x03))?;
        self.normal_function_set()
    }

    pub fn set_cursor(&mut self, col: u8, row: usize) -> Result<(), EspError> {
        let offset = ROW_OFFSETS[row.min(ROWS - 1)];
        self.command(SET_DDRAM_ADDR | (col + offset))
    }

    fn normal_function_set(&mut self) -> Result<(), EspError> {
        self.command(FUNCTION_SET | MODE_8BIT | TWO_LINES)
    }

    fn extended_function_set(&mut self) -> Result<(), EspError> {
        self.command(FUNCTION_SET | MODE_8BIT | TWO_LINES | EX_INSTRUCTION)
    }

    fn command(&mut self, value: u8) -> Result<(), EspError> {
        self.i2c.write(self.address, &[CONTROL_COMMAND, value], BLOCK)?;
        Ets::delay_us(27);
        Ok(())
    }

    fn data(&mut self, value: u8) -> Result<(), EspError> {
        self.i2c.write(self.address, &[CONTROL_DATA, value], BLOCK)?;
        Ets::delay_us(27);
        Ok(())
    }
}

impl LineDisplay for St7032<'_> {
    type Error = EspError;

    fn clear(&mut self) -> Result<(), EspError> {
        self.command(CLEAR_DISPLAY)?;
        Ets::delay_us(2000);
        Ok(())
    }

    fn write_line(&mut self, row: usize, text: &str) -> Result<(), EspError> {
        self.set_cursor(0, row)?;
        for c in text.chars().take(COLUMNS) {
            // character ROM is ASCII compatible only below 0x80
            self.data(if c.is_ascii() { c as u8 } else { b'?' })?;
        }
        Ok(())
    }
}
