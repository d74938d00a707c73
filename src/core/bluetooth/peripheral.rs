//! Capabilities the bridge needs from a BLE stack
//!
//! The session only ever talks to these traits, so the real transport and the
//! scripted test transport are interchangeable.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::bluetooth::types::{CharacteristicRef, DescriptorHandle, Notification};
use crate::error::LinkError;

/// Opens links to a peripheral by address
#[async_trait]
pub trait BleTransport: Send + Sync {
    type Link: PeripheralLink;

    /// Connect to the peripheral at `address`
    async fn connect(&self, address: &str) -> Result<Self::Link, LinkError>;
}

/// A live connection to one peripheral
#[async_trait]
pub trait PeripheralLink: Send {
    /// Resolve a characteristic by service and characteristic UUID
    async fn characteristic(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<CharacteristicRef, LinkError>;

    /// Resolve the client characteristic configuration descriptor of a characteristic
    async fn config_descriptor(
        &mut self,
        characteristic: &CharacteristicRef,
    ) -> Result<DescriptorHandle, LinkError>;

    /// Read the current value of a characteristic
    async fn read(&mut self, characteristic: &CharacteristicRef) -> Result<Vec<u8>, LinkError>;

    /// Write a descriptor value
    async fn write_descriptor(
        &mut self,
        descriptor: DescriptorHandle,
        value: &[u8],
    ) -> Result<(), LinkError>;

    /// Wait up to `timeout` for the next notification.
    ///
    /// `Ok(None)` means the wait timed out with the link still up.
    async fn wait_for_notification(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<Notification>, LinkError>;

    /// Disconnect from the peripheral. Idempotent.
    async fn disconnect(&mut self) -> Result<(), LinkError>;
}
