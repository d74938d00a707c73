use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Placeholder address used when `DEVICE` is not set.
pub const DEFAULT_DEVICE_ADDRESS: &str = "a0:9e:1a:70:54:5e";

/// How long a single notification wait blocks before the shutdown signal is checked again.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// How long the transport looks for the device before giving up on a connect attempt.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// MAC-style address of the peripheral.
    pub address: String,

    pub poll_interval_ms: u64,

    pub connect_timeout_secs: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            address: DEFAULT_DEVICE_ADDRESS.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl DeviceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
