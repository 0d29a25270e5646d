//! Configuration types for the coordinator components.
//!
//! Each config struct handles one concern and carries sensible defaults;
//! components depend on the structs rather than raw parameters.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use sitesync::config::{AutosaveConfig, CoordinatorConfig, PollingConfig};
//!
//! let config = CoordinatorConfig::default()
//!     .with_autosave(AutosaveConfig::new(Duration::from_secs(2)))
//!     .with_polling(PollingConfig::default().with_max_poll_failures(10));
//! ```

use std::time::Duration;

/// Default quiescence window before a dirty document is persisted (2 seconds).
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_secs(2);

/// Default interval between job status polls (3 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default maximum consecutive poll failures before a job is declared failed.
pub const DEFAULT_MAX_POLL_FAILURES: u32 = 5;

/// Default network request timeout (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Autosave timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    /// Quiescence window: a save fires only after this long without edits.
    pub debounce_window: Duration,
}

impl AutosaveConfig {
    /// Creates an autosave configuration with the given quiescence window.
    pub fn new(debounce_window: Duration) -> Self {
        Self { debounce_window }
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}

/// Job polling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Fixed interval between status polls.
    pub interval: Duration,

    /// Consecutive transport failures tolerated before the job is declared
    /// failed client-side. A successful poll resets the counter.
    pub max_poll_failures: u32,
}

impl PollingConfig {
    /// Creates a polling configuration with the given interval and failure
    /// budget.
    pub fn new(interval: Duration, max_poll_failures: u32) -> Self {
        Self {
            interval,
            max_poll_failures,
        }
    }

    /// Returns a copy with a different poll interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Returns a copy with a different failure budget.
    pub fn with_max_poll_failures(mut self, max: u32) -> Self {
        self.max_poll_failures = max;
        self
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_MAX_POLL_FAILURES)
    }
}

/// Top-level coordinator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordinatorConfig {
    /// Autosave timing.
    pub autosave: AutosaveConfig,

    /// Job polling behavior.
    pub polling: PollingConfig,
}

impl CoordinatorConfig {
    /// Returns a copy with a different autosave configuration.
    pub fn with_autosave(mut self, autosave: AutosaveConfig) -> Self {
        self.autosave = autosave;
        self
    }

    /// Returns a copy with a different polling configuration.
    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.autosave.debounce_window, DEFAULT_DEBOUNCE_WINDOW);
        assert_eq!(config.polling.interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.polling.max_poll_failures, DEFAULT_MAX_POLL_FAILURES);
    }

    #[test]
    fn test_builder_methods() {
        let config = CoordinatorConfig::default()
            .with_autosave(AutosaveConfig::new(Duration::from_millis(500)))
            .with_polling(
                PollingConfig::default()
                    .with_interval(Duration::from_millis(100))
                    .with_max_poll_failures(3),
            );

        assert_eq!(config.autosave.debounce_window, Duration::from_millis(500));
        assert_eq!(config.polling.interval, Duration::from_millis(100));
        assert_eq!(config.polling.max_poll_failures, 3);
    }
}
