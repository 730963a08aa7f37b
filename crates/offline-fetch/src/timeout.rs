//! Timeout configuration for fetch operations.

use std::time::Duration;

use offline_core::FetchSettings;

/// Timeout configuration for a fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Connection timeout.
    pub connect: Duration,
    /// Total time allowed for one attempt, including the body.
    pub total: Duration,
}

impl TimeoutConfig {
    /// Create a new timeout configuration.
    pub fn new(connect: Duration, total: Duration) -> Self {
        Self { connect, total }
    }

    /// Create from a single total timeout.
    pub fn from_total(total: Duration) -> Self {
        Self {
            connect: Duration::from_millis(total.as_millis() as u64 / 4),
            total,
        }
    }

    /// Build from fetch settings.
    pub fn from_settings(settings: &FetchSettings) -> Self {
        Self {
            connect: Duration::from_millis(settings.connect_timeout_ms),
            total: Duration::from_millis(settings.timeout_ms),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self::from_settings(&FetchSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_total_splits_connect() {
        let config = TimeoutConfig::from_total(Duration::from_millis(800));
        assert_eq!(config.connect, Duration::from_millis(200));
        assert_eq!(config.total, Duration::from_millis(800));
    }

    #[test]
    fn test_default_follows_settings() {
        let config = TimeoutConfig::default();
        assert_eq!(config.total, Duration::from_secs(5));
        assert_eq!(config.connect, Duration::from_secs(2));
    }
}
