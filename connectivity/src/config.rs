//! Configuration for connectivity probing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default polling interval, in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Default per-endpoint probe timeout, in milliseconds.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2000;

/// Configuration for the connectivity monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between polls.
    pub interval_secs: u64,

    /// Timeout for each endpoint, in milliseconds.
    pub probe_timeout_ms: u64,

    /// Endpoints tried in order; the first that answers marks the device online.
    pub endpoints: Vec<String>,
}

impl MonitorConfig {
    /// Polling interval.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Per-endpoint timeout.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Replace the probed endpoints.
    pub fn with_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    /// Set the polling interval.
    pub fn with_interval_secs(mut self, secs: u64) -> Self {
        self.interval_secs = secs;
        self
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            endpoints: vec![
                "https://clients3.google.com/generate_204".to_string(),
                "https://1.1.1.1".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(10));
        assert_eq!(config.probe_timeout(), Duration::from_secs(2));
        assert_eq!(config.endpoints.len(), 2);
    }

    #[test]
    fn test_builder() {
        let config = MonitorConfig::default()
            .with_endpoints(["http://localhost:1"])
            .with_interval_secs(30);
        assert_eq!(config.endpoints, vec!["http://localhost:1".to_string()]);
        assert_eq!(config.interval_secs, 30);
    }
}
