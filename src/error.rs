//! Error types shared across the bridge

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Failures of the Bluetooth link.
///
/// Every variant is recoverable: the reconnect loop drops the current session
/// and starts a new one.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device {address} did not show up within {timeout:?}")]
    ConnectTimeout { address: String, timeout: Duration },

    #[error("Service not found: {0}")]
    ServiceNotFound(Uuid),

    #[error("Characteristic not found: {0}")]
    CharacteristicNotFound(Uuid),

    #[error("Client characteristic configuration descriptor not found for {0}")]
    DescriptorNotFound(Uuid),

    #[error("Unknown attribute handle: {0:#06x}")]
    UnknownHandle(u16),

    #[error("Device disconnected")]
    Disconnected,

    #[cfg(feature = "ble")]
    #[error(transparent)]
    Bluetooth(#[from] bluest::Error),
}

/// Invalid or unreadable configuration. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
