//! Push button debouncing
//!
//! The button pulls its pin low. The pin is sampled on a fixed period and
//! every sample is fed to `Debouncer::sample`.

use crate::mode::ButtonEvent;

/// Consecutive low samples needed for a press to count
pub const PRESS_SAMPLES: u32 = 3;

/// Consecutive low samples that make a long press
pub const LONG_PRESS_SAMPLES: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Counting low samples
    Idle(u32),
    /// An event fired; wait for the pin to go high again
    Latched,
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    state: State,
    press_samples: u32,
    long_press_samples: u32,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(PRESS_SAMPLES, LONG_PRESS_SAMPLES)
    }
}

impl Debouncer {
    pub fn new(press_samples: u32, long_press_samples: u32) -> Self {
        Self {
            state: State::Idle(0),
            press_samples,
            long_press_samples,
        }
    }

    /// Feed one pin sample (`level_high` is the raw pin level)
    ///
    /// A short press fires on release, a long press as soon as it has been
    /// held long enough. Nothing else fires until the pin is released.
    pub fn sample(&mut self, level_high: bool) -> Option<ButtonEvent> {
        match self.state {
            State::Idle(count) if !level_high => {
                let count = count + 1;
                if count >= self.long_press_samples {
                    self.state = State::Latched;
                    Some(ButtonEvent::Long)
                } else {
                    self.state = State::Idle(count);
                    None
                }
            }
            State::Idle(count) => {
                if count >= self.press_samples {
                    self.state = State::Latched;
                    Some(ButtonEvent::Short)
                } else {
                    self.state = State::Idle(0);
                    None
                }
            }
            State::Latched => {
                if level_high {
                    self.state = State::Idle(0);
                }
                None
            }
        }
    }
}
