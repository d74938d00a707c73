//! Scripted BLE transport and recording publisher for the bridge scenarios

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use streampulse_bridge_lib::core::bluetooth::{
    BleTransport, CharacteristicHandle, CharacteristicRef, DescriptorHandle, Notification,
    PeripheralLink, UUID_BATTERY_LEVEL, UUID_BATTERY_SERVICE, UUID_HEART_RATE_MEASUREMENT,
    UUID_HEART_RATE_SERVICE,
};
use streampulse_bridge_lib::publisher::Publisher;
use streampulse_bridge_lib::LinkError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const BATTERY_HANDLE: u16 = 0x0010;
pub const HEART_RATE_HANDLE: u16 = 0x0020;

/// Everything observable, in the order it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ConnectAttempt,
    DescriptorWrite(u16, Vec<u8>),
    Read(u16),
    Disconnect,
    Publish {
        topic: String,
        payload: String,
        retain: bool,
    },
    PublisherStart,
    PublisherStop,
}

/// What a connected link does on each notification wait
#[derive(Debug, Clone)]
pub enum Step {
    Notify(u16, Vec<u8>),
    Idle,
    Drop,
}

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn publishes(&self) -> Vec<(String, String, bool)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Publish {
                    topic,
                    payload,
                    retain,
                } => Some((topic, payload, retain)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Event) -> usize {
        self.events().iter().filter(|e| *e == wanted).count()
    }

    pub fn count_publishes(&self, topic: &str, payload: &str) -> usize {
        self.publishes()
            .iter()
            .filter(|(t, p, _)| t == topic && p == payload)
            .count()
    }
}

pub struct Script {
    /// Connect attempts that fail before one succeeds
    pub connect_failures: usize,
    /// Config descriptor lookups that fail before they succeed
    pub descriptor_failures: usize,
    /// Value returned when the battery level is read
    pub battery_value: Vec<u8>,
    /// Characteristic discovery never completes
    pub stall_discovery: bool,
    /// One list of wait steps per successful connection
    pub sessions: VecDeque<Vec<Step>>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            connect_failures: 0,
            descriptor_failures: 0,
            battery_value: vec![87],
            stall_discovery: false,
            sessions: VecDeque::new(),
        }
    }
}

/// Transport whose links follow a script.
///
/// A link that runs out of steps cancels `shutdown`, simulating an interrupt
/// that arrives while waiting for notifications.
#[derive(Clone)]
pub struct MockTransport {
    script: Arc<Mutex<Script>>,
    log: EventLog,
    shutdown: CancellationToken,
}

impl MockTransport {
    pub fn new(script: Script, log: EventLog, shutdown: CancellationToken) -> Self {
        Self {
            script: Arc::new(Mutex::new(script)),
            log,
            shutdown,
        }
    }
}

#[async_trait]
impl BleTransport for MockTransport {
    type Link = MockLink;

    async fn connect(&self, address: &str) -> Result<MockLink, LinkError> {
        self.log.push(Event::ConnectAttempt);
        let mut script = self.script.lock().unwrap();
        if script.connect_failures > 0 {
            script.connect_failures -= 1;
            return Err(LinkError::DeviceNotFound(address.to_string()));
        }
        let steps = script.sessions.pop_front().unwrap_or_default();
        Ok(MockLink {
            script: self.script.clone(),
            log: self.log.clone(),
            shutdown: self.shutdown.clone(),
            steps: steps.into(),
            connected: true,
        })
    }
}

pub struct MockLink {
    script: Arc<Mutex<Script>>,
    log: EventLog,
    shutdown: CancellationToken,
    steps: VecDeque<Step>,
    connected: bool,
}

fn handle_for(service: Uuid, characteristic: Uuid) -> Option<u16> {
    if service == UUID_BATTERY_SERVICE && characteristic == UUID_BATTERY_LEVEL {
        Some(BATTERY_HANDLE)
    } else if service == UUID_HEART_RATE_SERVICE && characteristic == UUID_HEART_RATE_MEASUREMENT {
        Some(HEART_RATE_HANDLE)
    } else {
        None
    }
}

#[async_trait]
impl PeripheralLink for MockLink {
    async fn characteristic(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<CharacteristicRef, LinkError> {
        let stalled = self.script.lock().unwrap().stall_discovery;
        if stalled {
            std::future::pending::<()>().await;
        }
        let handle = handle_for(service, characteristic)
            .ok_or(LinkError::CharacteristicNotFound(characteristic))?;
        Ok(CharacteristicRef {
            service,
            uuid: characteristic,
            handle: CharacteristicHandle(handle),
        })
    }

    async fn config_descriptor(
        &mut self,
        characteristic: &CharacteristicRef,
    ) -> Result<DescriptorHandle, LinkError> {
        let mut script = self.script.lock().unwrap();
        if script.descriptor_failures > 0 {
            script.descriptor_failures -= 1;
            return Err(LinkError::DescriptorNotFound(characteristic.uuid));
        }
        Ok(DescriptorHandle(characteristic.handle.0 + 1))
    }

    async fn read(&mut self, characteristic: &CharacteristicRef) -> Result<Vec<u8>, LinkError> {
        self.log.push(Event::Read(characteristic.handle.0));
        match characteristic.handle.0 {
            BATTERY_HANDLE => Ok(self.script.lock().unwrap().battery_value.clone()),
            other => Ok(vec![0, other as u8]),
        }
    }

    async fn write_descriptor(
        &mut self,
        descriptor: DescriptorHandle,
        value: &[u8],
    ) -> Result<(), LinkError> {
        self.log
            .push(Event::DescriptorWrite(descriptor.0, value.to_vec()));
        Ok(())
    }

    async fn wait_for_notification(
        &mut self,
        _timeout: Duration,
    ) -> Result<Option<Notification>, LinkError> {
        if !self.connected {
            return Err(LinkError::Disconnected);
        }
        match self.steps.pop_front() {
            Some(Step::Notify(handle, value)) => {
                Ok(Some(Notification::new(CharacteristicHandle(handle), value)))
            }
            Some(Step::Idle) => Ok(None),
            Some(Step::Drop) => {
                self.connected = false;
                Err(LinkError::Disconnected)
            }
            None => {
                self.shutdown.cancel();
                Ok(None)
            }
        }
    }

    async fn disconnect(&mut self) -> Result<(), LinkError> {
        self.log.push(Event::Disconnect);
        self.connected = false;
        Ok(())
    }
}

/// Publisher that records every call into the shared event log
pub struct RecordingPublisher {
    log: EventLog,
}

impl RecordingPublisher {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    fn publish(&self, topic: &str, payload: String, retain: bool) {
        self.log.push(Event::Publish {
            topic: topic.to_string(),
            payload,
            retain,
        });
    }

    fn start(&self) {
        self.log.push(Event::PublisherStart);
    }

    async fn stop(&self) {
        self.log.push(Event::PublisherStop);
    }
}

pub fn publish(topic: &str, payload: &str, retain: bool) -> Event {
    Event::Publish {
        topic: topic.to_string(),
        payload: payload.to_string(),
        retain,
    }
}
