//! Receiver operating mode
//!
//! ```text
//! Search --short--> Setting --short--> Setting (major + 1, mod 10)
//!                      |
//!                    long
//!                      v
//!                SettingFinish --> persist once, restart
//! ```
//!
//! Inactivity is tracked with an absolute deadline pushed forward by every
//! accepted button press, so it does not drift with loop latency.

use crate::config::ReceiverConfig;

/// Number of selectable majors in setting mode
pub const MAJOR_CHOICES: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverMode {
    Search,
    Setting,
    SettingFinish,
}

/// Debounced button gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Short,
    Long,
}

/// What the receiver should do on this iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeAction {
    ShowBeacons,
    ShowSetting { major: u16 },
    SaveAndRestart { major: u16 },
    Restart,
    DeepSleep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTimeouts {
    pub search_idle_ms: u64,
    pub setting_idle_ms: u64,
}

impl Default for ModeTimeouts {
    fn default() -> Self {
        Self {
            search_idle_ms: 30_000,
            setting_idle_ms: 10_000,
        }
    }
}

impl From<&ReceiverConfig> for ModeTimeouts {
    fn from(config: &ReceiverConfig) -> Self {
        Self {
            search_idle_ms: config.search_idle_ms,
            setting_idle_ms: config.setting_idle_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModeMachine {
    mode: ReceiverMode,
    major: u16,
    deadline_ms: u64,
    saved: bool,
    timeouts: ModeTimeouts,
    search_interval_ms: u64,
    setting_interval_ms: u64,
}

impl ModeMachine {
    /// Start in search mode with the stored `major`
    pub fn new(major: u16, now_ms: u64, config: &ReceiverConfig) -> Self {
        let timeouts = ModeTimeouts::from(config);
        Self {
            mode: ReceiverMode::Search,
            major,
            deadline_ms: now_ms.saturating_add(timeouts.search_idle_ms),
            saved: false,
            timeouts,
            search_interval_ms: config.search_frame_ms,
            setting_interval_ms: config.setting_frame_ms,
        }
    }

    pub fn mode(&self) -> ReceiverMode {
        self.mode
    }

    pub fn major(&self) -> u16 {
        self.major
    }

    pub fn deadline_ms(&self) -> u64 {
        self.deadline_ms
    }

    /// Apply a button gesture, returning true if it changed anything
    pub fn on_button(&mut self, event: ButtonEvent, now_ms: u64) -> bool {
        match (self.mode, event) {
            (ReceiverMode::Search, ButtonEvent::Short) => {
                self.mode = ReceiverMode::Setting;
                self.deadline_ms = now_ms.saturating_add(self.timeouts.setting_idle_ms);
                true
            }
            (ReceiverMode::Setting, ButtonEvent::Short) => {
                self.major = (self.major % MAJOR_CHOICES + 1) % MAJOR_CHOICES;
                self.deadline_ms = now_ms.saturating_add(self.timeouts.setting_idle_ms);
                true
            }
            (ReceiverMode::Setting, ButtonEvent::Long) => {
                self.mode = ReceiverMode::SettingFinish;
                true
            }
            (ReceiverMode::Search, ButtonEvent::Long) | (ReceiverMode::SettingFinish, _) => false,
        }
    }

    /// Decide the action for this iteration
    pub fn poll(&mut self, now_ms: u64) -> ModeAction {
        match self.mode {
            ReceiverMode::Search if now_ms >= self.deadline_ms => ModeAction::DeepSleep,
            ReceiverMode::Search => ModeAction::ShowBeacons,
            ReceiverMode::Setting if now_ms >= self.deadline_ms => ModeAction::Restart,
            ReceiverMode::Setting => ModeAction::ShowSetting { major: self.major },
            ReceiverMode::SettingFinish if !self.saved => {
                self.saved = true;
                ModeAction::SaveAndRestart { major: self.major }
            }
            ReceiverMode::SettingFinish => ModeAction::Restart,
        }
    }

    /// Pause before the next iteration
    pub fn frame_interval_ms(&self) -> u64 {
        match self.mode {
            ReceiverMode::Search => self.search_interval_ms,
            ReceiverMode::Setting | ReceiverMode::SettingFinish => self.setting_interval_ms,
        }
    }
}
