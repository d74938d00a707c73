//! StreamPulse bridge library
//! Keeps a BLE heart-rate monitor connected and republishes its battery and
//! heart-rate readings to an MQTT broker.

// Module declarations
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod publisher;

pub use config::BridgeConfig;
pub use error::{ConfigError, LinkError};
