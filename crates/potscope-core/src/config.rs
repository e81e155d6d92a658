//! Run configuration for one monitoring session.

use std::time::Duration;

use crate::error::ConfigError;
use crate::window::DEFAULT_WINDOW_CAPACITY;

/// Default render cadence.
pub const DEFAULT_REFRESH_PERIOD_MS: u64 = 50;

/// Default bound on a single blocking read.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Baud rate the reference firmware prints at.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Parameters consumed by [`crate::Monitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Records kept in the sliding window.
    pub window_capacity: usize,
    /// Period between render ticks.
    pub refresh_period: Duration,
    /// Bound on one read from the byte stream. Applied by whoever opens the
    /// stream; carried here so the whole run is described in one place.
    pub read_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            refresh_period: Duration::from_millis(DEFAULT_REFRESH_PERIOD_MS),
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
        }
    }
}

impl MonitorConfig {
    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = capacity;
        self
    }

    pub fn with_refresh_period(mut self, period: Duration) -> Self {
        self.refresh_period = period;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Reject zero capacity, zero refresh period and zero read timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.refresh_period.is_zero() {
            return Err(ConfigError::ZeroRefreshPeriod);
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::ZeroReadTimeout);
        }
        Ok(())
    }
}
