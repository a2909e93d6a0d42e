//! Restart and deep sleep

/// Trait for chip power control
///
/// On hardware neither call returns. Test doubles record the request and
/// return so the caller can be observed.
pub trait PowerControl {
    fn restart(&mut self);

    /// Enter deep sleep until the configured wakeup source fires
    fn deep_sleep(&mut self);
}

#[cfg(test)]
pub(crate) mod fake {
    use super::PowerControl;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PowerRequest {
        Restart,
        DeepSleep,
    }

    #[derive(Debug, Default)]
    pub struct RecordingPower {
        pub requests: Vec<PowerRequest>,
    }

    impl PowerControl for RecordingPower {
        fn restart(&mut self) {
            self.requests.push(PowerRequest::Restart);
        }

        fn deep_sleep(&mut self) {
            self.requests.push(PowerRequest::DeepSleep);
        }
    }
}
