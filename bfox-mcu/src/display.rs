//! Character display output
//!
//! Screens are built as two 16-column lines; the `LineDisplay` trait only
//! knows how to put them on glass.

use crate::registry::BeaconSighting;
use std::fmt::Write;

pub const COLUMNS: usize = 16;
pub const ROWS: usize = 2;

/// Signal bar thresholds, one bar per entry the RSSI is above
const BAR_THRESHOLDS: [i32; 6] = [i32::MIN, -100, -80, -70, -60, -50];

/// Trait for two-line character displays
///
/// MCU-specific crates implement this for their LCD controller.
pub trait LineDisplay {
    /// Error type for display operations
    type Error: std::fmt::Debug;

    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Write `text` starting at column 0 of `row`
    fn write_line(&mut self, row: usize, text: &str) -> Result<(), Self::Error>;

    /// Replace the whole screen
    fn show(&mut self, screen: &Screen) -> Result<(), Self::Error> {
        self.clear()?;
        for (row, line) in screen.lines.iter().enumerate() {
            if !line.is_empty() {
                self.write_line(row, line)?;
            }
        }
        Ok(())
    }
}

/// Contents of the whole display
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screen {
    pub lines: [String; ROWS],
}

impl Screen {
    pub fn new(top: &str, bottom: &str) -> Self {
        Self {
            lines: [fit(top), fit(bottom)],
        }
    }
}

/// Truncate to the display width on a char boundary
fn fit(text: &str) -> String {
    text.chars().take(COLUMNS).collect()
}

/// Six character bar graph for an RSSI reading
pub fn signal_bars(rssi: i32) -> String {
    BAR_THRESHOLDS
        .iter()
        .map(|&threshold| if rssi > threshold { '#' } else { ' ' })
        .collect()
}

/// One beacon as `minor|bars|rssi dBm`
pub fn beacon_line(sighting: &BeaconSighting) -> String {
    let mut line = String::with_capacity(COLUMNS);
    let _ = write!(
        line,
        "{}|{}|{:<4}dBm",
        sighting.minor,
        signal_bars(sighting.rssi),
        sighting.rssi
    );
    line
}

/// The two strongest beacons, or the no signal notice
pub fn beacons_screen(sightings: &[BeaconSighting]) -> Screen {
    match sightings {
        [] => Screen::new("NO SIGNAL", ""),
        [only] => Screen::new(&beacon_line(only), ""),
        [first, second, ..] => Screen::new(&beacon_line(first), &beacon_line(second)),
    }
}

pub fn setting_screen(major: u16) -> Screen {
    Screen::new("Setting Mode", &format!(" Major:{}", major))
}

pub fn saved_screen(major: u16) -> Screen {
    Screen::new(&format!("Saved Major:{}", major), " Restart...")
}

pub fn restart_screen() -> Screen {
    Screen::new("Restart...", "")
}

pub fn splash_screen(major: u16, volts: f32) -> Screen {
    Screen::new("B-Fox Receiver", &format!(" Maj:{} Bat:{:.2}V", major, volts))
}

pub fn low_battery_screen(volts: f32) -> Screen {
    Screen::new(&format!("LowBattery:{:.2}V", volts), "")
}


#[cfg(test)]
mod tests {
    use super::fake::RecordingDisplay;
    use super::*;

    fn sighting(minor: u16, rssi: i32) -> BeaconSighting {
        BeaconSighting {
            minor,
            rssi,
            last_seen_ms: 0,
        }
    }

    #[test]
    fn bars_by_threshold() {
        assert_eq!(signal_bars(-45), "######");
        assert_eq!(signal_bars(-50), "##### ");
        assert_eq!(signal_bars(-65), "####  ");
        assert_eq!(signal_bars(-75), "###   ");
        assert_eq!(signal_bars(-90), "##    ");
        assert_eq!(signal_bars(-100), "#     ");
        assert_eq!(signal_bars(i32::MIN), "      ");
    }

    #[test]
    fn beacon_line_layout() {
        assert_eq!(beacon_line(&sighting(3, -65)), "3|####  |-65 dBm");
        assert_eq!(beacon_line(&sighting(12, -101)), "12|#     |-101dBm");
    }

    #[test]
    fn empty_snapshot_shows_no_signal() {
        assert_eq!(beacons_screen(&[]), Screen::new("NO SIGNAL", ""));
    }

    #[test]
    fn top_two_only() {
        let screen = beacons_screen(&[sighting(2, -50), sighting(3, -65), sighting(1, -80)]);
        assert_eq!(screen.lines[0], "2|##### |-50 dBm");
        assert_eq!(screen.lines[1], "3|####  |-65 dBm");

        let single = beacons_screen(&[sighting(9, -70)]);
        assert_eq!(single.lines[1], "");
    }

    #[test]
    fn lines_are_cut_to_width() {
        let screen = Screen::new("0123456789abcdefXYZ", "");
        assert_eq!(screen.lines[0], "0123456789abcdef");
        // five digit minor pushes the unit off the edge
        assert_eq!(beacon_line(&sighting(65535, -101)).chars().count(), 20);
        assert_eq!(
            beacons_screen(&[sighting(65535, -101)]).lines[0],
            "65535|#     |-101"
        );
    }

    #[test]
    fn fixed_screens() {
        assert_eq!(setting_screen(4), Screen::new("Setting Mode", " Major:4"));
        assert_eq!(saved_screen(9), Screen::new("Saved Major:9", " Restart..."));
        assert_eq!(restart_screen().lines[0], "Restart...");
        assert_eq!(
            splash_screen(2, 3.876),
            Screen::new("B-Fox Receiver", " Maj:2 Bat:3.88V")
        );
        assert_eq!(low_battery_screen(3.1), Screen::new("LowBattery:3.10V", ""));
    }

    #[test]
    fn show_writes_non_empty_rows() {
        let mut display = RecordingDisplay::default();
        display.show(&Screen::new("NO SIGNAL", "")).unwrap();
        assert_eq!(display.rows, ["NO SIGNAL".to_string(), String::new()]);

        display.show(&setting_screen(1)).unwrap();
        assert_eq!(display.history.len(), 1);
        assert_eq!(display.rows[1], " Major:1");
    }
}
