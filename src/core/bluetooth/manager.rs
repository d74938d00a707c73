//! Bridge manager
//! This module provides the reconnect loop that keeps the bridge attached to the peripheral.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use tokio_util::sync::CancellationToken;

use crate::config::device_config::DeviceConfig;
use crate::core::bluetooth::connection::{ConnectionSession, SessionEnd};
use crate::core::bluetooth::peripheral::BleTransport;
use crate::publisher::{Publisher, TopicPublisher};

/// Keeps connecting to the configured peripheral until shutdown
pub struct BridgeManager<T: BleTransport, P: Publisher> {
    /// BLE transport used to open each session's link
    transport: T,
    /// Shared with the subscription callbacks of every session
    publisher: Arc<TopicPublisher<P>>,
    address: String,
    poll_interval: Duration,
}

impl<T, P> BridgeManager<T, P>
where
    T: BleTransport,
    P: Publisher + 'static,
{
    pub fn new(transport: T, publisher: TopicPublisher<P>, config: &DeviceConfig) -> Self {
        Self {
            transport,
            publisher: Arc::new(publisher),
            address: config.address.clone(),
            poll_interval: config.poll_interval(),
        }
    }

    pub fn publisher(&self) -> &TopicPublisher<P> {
        &self.publisher
    }

    /// Runs sessions until `shutdown` is cancelled and returns the process exit code.
    ///
    /// Link failures are logged and retried immediately; the transport's own
    /// connect timeout paces the retries.
    pub async fn run(&self, shutdown: CancellationToken) -> i32 {
        self.publisher.start();

        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            info!("Starting session {} with {}", attempt, self.address);

            let session = ConnectionSession::new(
                &self.transport,
                &self.publisher,
                &self.address,
                self.poll_interval,
            );
            match session.run(&shutdown).await {
                SessionEnd::LinkDropped(e) => {
                    error!("Device connection error: {}", e);
                }
                SessionEnd::Interrupted => {
                    info!("Shutdown requested, leaving reconnect loop");
                    break;
                }
            }
        }

        self.publisher.stop().await;
        0
    }
}
