//! Bluetooth connection session for the heart-rate monitor
//! This module handles one connection attempt: connect, subscribe, wait for
//! notifications, and clean up however the attempt ends.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::notification::SubscriptionTable;
use crate::core::bluetooth::peripheral::{BleTransport, PeripheralLink};
use crate::core::measurement::{battery_subscription, heart_rate_subscription};
use crate::error::LinkError;
use crate::publisher::{Publisher, TopicPublisher};

/// How a session ended
#[derive(Debug)]
pub enum SessionEnd {
    /// The link failed or dropped; a new session should be started
    LinkDropped(LinkError),
    /// Shutdown was requested
    Interrupted,
}

/// Publishes `connected=false` when dropped, so every exit path reports it exactly once.
struct DisconnectReport<'a, P: Publisher> {
    publisher: &'a TopicPublisher<P>,
}

impl<'a, P: Publisher> DisconnectReport<'a, P> {
    fn new(publisher: &'a TopicPublisher<P>) -> Self {
        Self { publisher }
    }
}

impl<P: Publisher> Drop for DisconnectReport<'_, P> {
    fn drop(&mut self) {
        self.publisher.send_connected(false);
    }
}

/// One physical connection attempt
pub struct ConnectionSession<'a, T: BleTransport, P: Publisher> {
    transport: &'a T,
    publisher: &'a Arc<TopicPublisher<P>>,
    address: &'a str,
    poll_interval: Duration,
}

impl<'a, T, P> ConnectionSession<'a, T, P>
where
    T: BleTransport,
    P: Publisher + 'static,
{
    pub fn new(
        transport: &'a T,
        publisher: &'a Arc<TopicPublisher<P>>,
        address: &'a str,
        poll_interval: Duration,
    ) -> Self {
        Self {
            transport,
            publisher,
            address,
            poll_interval,
        }
    }

    /// Run the session until the link drops or `shutdown` is cancelled.
    ///
    /// The live link is always disconnected and `connected=false` is always
    /// published before this returns.
    pub async fn run(self, shutdown: &CancellationToken) -> SessionEnd {
        let _report = DisconnectReport::new(self.publisher.as_ref());
        let mut link = None;

        let end = match self.connect_and_listen(&mut link, shutdown).await {
            Ok(end) => end,
            Err(e) => SessionEnd::LinkDropped(e),
        };

        if let Some(link) = link.as_mut() {
            info!("Disconnecting from {}", self.address);
            if let Err(e) = link.disconnect().await {
                warn!("Failed to disconnect from {}: {}", self.address, e);
            }
        }
        end
    }

    async fn connect_and_listen(
        &self,
        slot: &mut Option<T::Link>,
        shutdown: &CancellationToken,
    ) -> Result<SessionEnd, LinkError> {
        debug!("Connecting to {}...", self.address);
        let link = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(SessionEnd::Interrupted),
            result = self.transport.connect(self.address) => result?,
        };
        let link = slot.insert(link);
        info!("Connected to {}, subscribing...", self.address);

        let mut subscriptions = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(SessionEnd::Interrupted),
            result = self.subscribe(link) => result?,
        };

        self.publisher.send_connected(true);
        info!("Subscribed to {} characteristics on {}", subscriptions.len(), self.address);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(SessionEnd::Interrupted),
                result = link.wait_for_notification(self.poll_interval) => {
                    if let Some(notification) = result? {
                        subscriptions.dispatch(notification.handle, &notification.value);
                    }
                }
            }
        }
    }

    /// Binds battery first, then heart rate.
    async fn subscribe(&self, link: &mut T::Link) -> Result<SubscriptionTable, LinkError> {
        let mut subscriptions = SubscriptionTable::new();
        subscriptions
            .bind(link, battery_subscription(self.publisher.clone()))
            .await?;
        subscriptions
            .bind(link, heart_rate_subscription(self.publisher.clone()))
            .await?;
        Ok(subscriptions)
    }
}
