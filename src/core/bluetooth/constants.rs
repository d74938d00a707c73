//! Constants used throughout the bridge
//! This module contains the GATT UUIDs and protocol values the bridge relies on.

use uuid::Uuid;

/// Standard Bluetooth Service UUIDs
pub const UUID_BATTERY_SERVICE: Uuid = Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb);
pub const UUID_HEART_RATE_SERVICE: Uuid = Uuid::from_u128(0x0000180d_0000_1000_8000_00805f9b34fb);

/// Standard Bluetooth Characteristic UUIDs
pub const UUID_BATTERY_LEVEL: Uuid = Uuid::from_u128(0x00002a19_0000_1000_8000_00805f9b34fb);
pub const UUID_HEART_RATE_MEASUREMENT: Uuid =
    Uuid::from_u128(0x00002a37_0000_1000_8000_00805f9b34fb);

/// Standard Bluetooth Descriptor UUIDs
pub const UUID_CLIENT_CHARACTERISTIC_CONFIGURATION: Uuid =
    Uuid::from_u128(0x00002902_0000_1000_8000_00805f9b34fb);

/// Value written to the client characteristic configuration descriptor to enable notifications
pub const ENABLE_NOTIFICATION_VALUE: [u8; 2] = [0x01, 0x00];

/// Heart rate measurement flags bit: value is a little-endian u16 instead of a u8
pub const HEART_RATE_VALUE_FORMAT_U16: u8 = 0x01;

/// Capacity of the channel carrying notifications from the transport to the session
pub const NOTIFICATION_CHANNEL_CAPACITY: usize = 32;
