//! Defines shared data structures for the Bluetooth module.

use std::fmt;

use uuid::Uuid;

/// Transport-assigned handle of a resolved characteristic, valid for one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharacteristicHandle(pub u16);

impl fmt::Display for CharacteristicHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Transport-assigned handle of a resolved descriptor, valid for one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorHandle(pub u16);

impl fmt::Display for DescriptorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// A characteristic resolved on a live link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicRef {
    /// The service the characteristic belongs to
    pub service: Uuid,
    /// The characteristic UUID
    pub uuid: Uuid,
    /// The handle notifications for this characteristic arrive on
    pub handle: CharacteristicHandle,
}

/// A value pushed by the peripheral
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub handle: CharacteristicHandle,
    pub value: Vec<u8>,
}

impl Notification {
    pub fn new(handle: CharacteristicHandle, value: impl Into<Vec<u8>>) -> Self {
        Self {
            handle,
            value: value.into(),
        }
    }
}
