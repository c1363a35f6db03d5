//! Application configuration.

use core::time::Duration;

/// Default deadline for the whole start phase.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(30);

/// Default deadline for the whole stop phase.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeouts used by [`App::run`](crate::App::run).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use trellis_app::AppConfig;
///
/// let config = AppConfig::default()
///     .with_start_timeout(Duration::from_secs(5))
///     .with_stop_timeout(Duration::from_secs(10));
///
/// assert_eq!(config.start_timeout, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppConfig {
    /// Deadline for the whole start phase. Rollback gets the same duration
    /// again.
    pub start_timeout: Duration,
    /// Deadline for the whole stop phase.
    pub stop_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            start_timeout: DEFAULT_START_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

impl AppConfig {
    /// Creates a configuration with the default timeouts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the start phase deadline.
    #[must_use]
    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    /// Sets the stop phase deadline.
    #[must_use]
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_thirty_seconds() {
        let config = AppConfig::new();
        assert_eq!(config.start_timeout, Duration::from_secs(30));
        assert_eq!(config.stop_timeout, Duration::from_secs(30));
    }

    #[test]
    fn builders_override_one_field() {
        let config = AppConfig::default().with_stop_timeout(Duration::from_millis(10));
        assert_eq!(config.start_timeout, DEFAULT_START_TIMEOUT);
        assert_eq!(config.stop_timeout, Duration::from_millis(10));
    }
}
