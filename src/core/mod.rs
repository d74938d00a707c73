//! Core functionality for the bridge
//! This module contains the connection lifecycle and the measurement handling.

pub mod bluetooth;
pub mod measurement;

// Re-export commonly used types
pub use bluetooth::{BridgeManager, ConnectionSession, SessionEnd};
#[cfg(feature = "ble")]
pub use bluetooth::BluestTransport;
