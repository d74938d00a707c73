//! BLE transport backed by bluest
//! This module locates the configured peripheral, resolves GATT attributes and
//! forwards notifications into a single channel for the session to wait on.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bluest::{Adapter, Characteristic, Descriptor, Device};
use futures_util::{Stream, StreamExt};
use log::{debug, error, info};
use regex::Regex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::core::bluetooth::constants::{
    ENABLE_NOTIFICATION_VALUE, NOTIFICATION_CHANNEL_CAPACITY,
    UUID_CLIENT_CHARACTERISTIC_CONFIGURATION,
};
use crate::core::bluetooth::peripheral::{BleTransport, PeripheralLink};
use crate::core::bluetooth::types::{
    CharacteristicHandle, CharacteristicRef, DescriptorHandle, Notification,
};
use crate::error::LinkError;

static MAC_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})").expect("MAC address pattern is valid")
});

/// Opens links through the system's default Bluetooth adapter
pub struct BluestTransport {
    adapter: Adapter,
    connect_timeout: Duration,
}

impl BluestTransport {
    pub async fn new(connect_timeout: Duration) -> Result<Self> {
        let adapter = Adapter::default()
            .await
            .ok_or_else(|| anyhow!("No Bluetooth adapter found"))?;
        adapter.wait_available().await?;
        info!("Bluetooth adapter is available.");
        Ok(Self {
            adapter,
            connect_timeout,
        })
    }

    /// Finds the device among connected devices first, then by scanning.
    async fn find_device(&self, address: &str) -> Result<Device, LinkError> {
        for device in self.adapter.connected_devices().await? {
            if matches_address(&device, address) {
                info!("Device {} is already connected", address);
                return Ok(device);
            }
        }

        info!("Scanning for {}", address);
        let mut scan_stream = self.adapter.scan(&[]).await?;
        let found = tokio::time::timeout(self.connect_timeout, async {
            while let Some(discovered_device) = scan_stream.next().await {
                debug!(
                    "Found device - Device: {:?}, RSSI: {:?}",
                    discovered_device.device, discovered_device.rssi
                );
                if matches_address(&discovered_device.device, address) {
                    return Some(discovered_device.device);
                }
            }
            None
        })
        .await;

        match found {
            Ok(Some(device)) => Ok(device),
            Ok(None) => Err(LinkError::DeviceNotFound(address.to_string())),
            Err(_) => Err(LinkError::ConnectTimeout {
                address: address.to_string(),
                timeout: self.connect_timeout,
            }),
        }
    }
}

#[async_trait]
impl BleTransport for BluestTransport {
    type Link = BluestLink;

    async fn connect(&self, address: &str) -> Result<BluestLink, LinkError> {
        let device = self.find_device(address).await?;

        if !device.is_connected().await {
            info!("Initiating connection to {}...", device.id());
            self.adapter.connect_device(&device).await?;
        }
        Ok(BluestLink::new(self.adapter.clone(), device))
    }
}

/// A live bluest connection
pub struct BluestLink {
    adapter: Adapter,
    device: Device,
    characteristics: HashMap<CharacteristicHandle, Characteristic>,
    descriptors: HashMap<DescriptorHandle, (CharacteristicHandle, Descriptor)>,
    next_handle: u16,
    sender: mpsc::Sender<Result<Notification, LinkError>>,
    receiver: mpsc::Receiver<Result<Notification, LinkError>>,
    notify_tasks: HashMap<CharacteristicHandle, JoinHandle<()>>,
}

impl BluestLink {
    fn new(adapter: Adapter, device: Device) -> Self {
        let (sender, receiver) = mpsc::channel(NOTIFICATION_CHANNEL_CAPACITY);
        Self {
            adapter,
            device,
            characteristics: HashMap::new(),
            descriptors: HashMap::new(),
            next_handle: 1,
            sender,
            receiver,
            notify_tasks: HashMap::new(),
        }
    }

    fn allocate_handle(&mut self) -> u16 {
        let handle = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1);
        handle
    }

    fn characteristic_by_handle(
        &self,
        handle: CharacteristicHandle,
    ) -> Result<&Characteristic, LinkError> {
        self.characteristics
            .get(&handle)
            .ok_or(LinkError::UnknownHandle(handle.0))
    }

    /// Subscribes through the platform stack and forwards values on a background task.
    ///
    /// The platform writes the configuration descriptor itself when the
    /// subscription is opened, so this is what "enable notifications" means here.
    async fn start_notifications(&mut self, handle: CharacteristicHandle) -> Result<(), LinkError> {
        let characteristic = self.characteristic_by_handle(handle)?.clone();
        let sender = self.sender.clone();
        let (ready_tx, ready_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let notification_stream = match characteristic.notify().await {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            forward_notifications(handle, notification_stream, sender).await;
        });

        if let Some(previous) = self.notify_tasks.insert(handle, task) {
            previous.abort();
        }

        match ready_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(LinkError::Disconnected),
        }
    }

    fn stop_notifications(&mut self) {
        for (_, task) in self.notify_tasks.drain() {
            task.abort();
        }
    }
}

#[async_trait]
impl PeripheralLink for BluestLink {
    async fn characteristic(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<CharacteristicRef, LinkError> {
        let found_service = self
            .device
            .discover_services_with_uuid(service)
            .await?
            .into_iter()
            .next()
            .ok_or(LinkError::ServiceNotFound(service))?;

        let found = found_service
            .discover_characteristics_with_uuid(characteristic)
            .await?
            .into_iter()
            .next()
            .ok_or(LinkError::CharacteristicNotFound(characteristic))?;

        let handle = CharacteristicHandle(self.allocate_handle());
        info!("Found characteristic {} as handle {}", characteristic, handle);
        self.characteristics.insert(handle, found);

        Ok(CharacteristicRef {
            service,
            uuid: characteristic,
            handle,
        })
    }

    async fn config_descriptor(
        &mut self,
        characteristic: &CharacteristicRef,
    ) -> Result<DescriptorHandle, LinkError> {
        let descriptor = self
            .characteristic_by_handle(characteristic.handle)?
            .discover_descriptors()
            .await?
            .into_iter()
            .find(|d| d.uuid() == UUID_CLIENT_CHARACTERISTIC_CONFIGURATION)
            .ok_or(LinkError::DescriptorNotFound(characteristic.uuid))?;

        let handle = DescriptorHandle(self.allocate_handle());
        self.descriptors
            .insert(handle, (characteristic.handle, descriptor));
        Ok(handle)
    }

    async fn read(&mut self, characteristic: &CharacteristicRef) -> Result<Vec<u8>, LinkError> {
        Ok(self.characteristic_by_handle(characteristic.handle)?.read().await?)
    }

    async fn write_descriptor(
        &mut self,
        descriptor: DescriptorHandle,
        value: &[u8],
    ) -> Result<(), LinkError> {
        let (owner, found) = self
            .descriptors
            .get(&descriptor)
            .cloned()
            .ok_or(LinkError::UnknownHandle(descriptor.0))?;

        if value == ENABLE_NOTIFICATION_VALUE {
            return self.start_notifications(owner).await;
        }
        if let Some(task) = self.notify_tasks.remove(&owner) {
            task.abort();
        }
        Ok(found.write(value).await?)
    }

    async fn wait_for_notification(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<Notification>, LinkError> {
        match tokio::time::timeout(timeout, self.receiver.recv()).await {
            Ok(Some(Ok(notification))) => Ok(Some(notification)),
            Ok(Some(Err(e))) => Err(e),
            Ok(None) => Err(LinkError::Disconnected),
            Err(_) => {
                if self.device.is_connected().await {
                    Ok(None)
                } else {
                    Err(LinkError::Disconnected)
                }
            }
        }
    }

    async fn disconnect(&mut self) -> Result<(), LinkError> {
        self.stop_notifications();
        if self.device.is_connected().await {
            info!("Disconnecting from device {}", self.device.id());
            self.adapter.disconnect_device(&self.device).await?;
            info!("Successfully disconnected");
        } else {
            info!("Device {} not connected", self.device.id());
        }
        Ok(())
    }
}

impl Drop for BluestLink {
    fn drop(&mut self) {
        self.stop_notifications();
    }
}

/// Feeds a characteristic's notifications into the link's channel.
///
/// A failed or finished stream means that characteristic is silent for the rest
/// of the connection, so it is reported as a link error and the session ends.
async fn forward_notifications<S, E>(
    handle: CharacteristicHandle,
    stream: S,
    sender: mpsc::Sender<Result<Notification, LinkError>>,
) where
    S: Stream<Item = Result<Vec<u8>, E>>,
    E: Into<LinkError>,
{
    let mut stream = std::pin::pin!(stream);
    while let Some(result) = stream.next().await {
        match result {
            Ok(value) => {
                if sender.send(Ok(Notification::new(handle, value))).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                let e = e.into();
                error!("Error in notification stream for handle {}: {}", handle, e);
                let _ = sender.send(Err(e)).await;
                return;
            }
        }
    }
    debug!("Notification stream for handle {} ended", handle);
    let _ = sender.send(Err(LinkError::Disconnected)).await;
}

fn matches_address(device: &Device, address: &str) -> bool {
    let id = device.id().to_string();
    match extract_mac_address(&id) {
        Some(mac) => mac.replace('-', ":").eq_ignore_ascii_case(address),
        None => id.eq_ignore_ascii_case(address),
    }
}

fn extract_mac_address(device_id_str: &str) -> Option<String> {
    MAC_ADDRESS
        .find_iter(device_id_str)
        .last()
        .map(|m| m.as_str().to_uppercase())
}
