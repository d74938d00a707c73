//! Bluetooth functionality for the bridge
//! This module handles connecting to the heart-rate monitor, subscribing to
//! its characteristics and dispatching the notifications it pushes.

#[cfg(feature = "ble")]
mod bluest_transport;
mod connection;
mod constants;
mod manager;
mod notification;
mod peripheral;
mod types;

// Re-export types that should be publicly accessible
#[cfg(feature = "ble")]
pub use bluest_transport::{BluestLink, BluestTransport};
pub use connection::{ConnectionSession, SessionEnd};
pub use constants::*; // Re-export all constants
pub use manager::BridgeManager;
pub use notification::{Callback, Subscription, SubscriptionTable, Transform};
pub use peripheral::{BleTransport, PeripheralLink};
pub use types::{CharacteristicHandle, CharacteristicRef, DescriptorHandle, Notification};
