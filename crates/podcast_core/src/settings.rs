use std::time::Duration;

/// Poll cadence and the wall-clock budget the controller allows a job.
///
/// The attempt budget is derived from both values so that changing the
/// interval keeps the overall timeout unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSettings {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// 60 polls, 5 seconds apart.
    pub fn remote() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(300))
    }

    /// 30 polls, 2 seconds apart.
    pub fn simulated() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(60))
    }

    pub fn max_attempts(&self) -> u32 {
        let interval = self.interval.as_millis().max(1);
        let attempts = self.timeout.as_millis().div_ceil(interval);
        attempts.clamp(1, u128::from(u32::MAX)) as u32
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::remote()
    }
}
