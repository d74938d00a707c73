//! MQTT publisher backed by rumqttc

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, LastWill, MqttOptions, Outgoing, QoS};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::mqtt_config::{MqttConfig, DEFAULT_CLIENT_ID};
use crate::publisher::{full_topic, Publisher, CONNECTED_TOPIC};

/// Capacity of the request queue between the client and its event loop
const REQUEST_CHANNEL_CAPACITY: usize = 64;

/// Delay before the event loop retries after a connection error
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// How long `stop` lets pending messages drain before cancelling the event loop
const STOP_GRACE_PERIOD: Duration = Duration::from_secs(2);

pub struct MqttPublisher {
    client: AsyncClient,
    event_loop: Mutex<Option<EventLoop>>,
    cancel_token: CancellationToken,
    task_handle: Mutex<Option<JoinHandle<()>>>,
}

impl MqttPublisher {
    pub fn new(config: &MqttConfig) -> Self {
        let client_id = match config.client_id.trim() {
            "" => DEFAULT_CLIENT_ID,
            id => id,
        };
        let mut options = MqttOptions::new(client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive());
        if config.has_credentials() {
            options.set_credentials(&config.username, &config.password);
        }
        // The broker reports the bridge as gone if the process dies without cleanup
        options.set_last_will(LastWill::new(
            full_topic(&config.topic_prefix, CONNECTED_TOPIC),
            "false",
            QoS::AtLeastOnce,
            true,
        ));

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
        Self {
            client,
            event_loop: Mutex::new(Some(event_loop)),
            cancel_token: CancellationToken::new(),
            task_handle: Mutex::new(None),
        }
    }

    /// Drives the rumqttc event loop until it is cancelled or the disconnect goes out.
    async fn drive(mut event_loop: EventLoop, cancel_token: CancellationToken) {
        info!("MQTT event loop started");
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    break;
                }
                event = event_loop.poll() => {
                    match event {
                        Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
                            info!("Connected to MQTT broker: {:?}", ack.code);
                        }
                        Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                            info!("Disconnected from MQTT broker");
                            break;
                        }
                        Ok(event) => {
                            debug!("MQTT event: {:?}", event);
                        }
                        Err(e) => {
                            warn!("MQTT connection error: {}", e);
                            tokio::select! {
                                _ = cancel_token.cancelled() => break,
                                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                            }
                        }
                    }
                }
            }
        }
        info!("MQTT event loop stopped");
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    fn publish(&self, topic: &str, payload: String, retain: bool) {
        if let Err(e) = self
            .client
            .try_publish(topic, QoS::AtLeastOnce, retain, payload.into_bytes())
        {
            warn!("Dropping MQTT message for {}: {}", topic, e);
        }
    }

    fn start(&self) {
        let Some(event_loop) = self.event_loop.lock().ok().and_then(|mut guard| guard.take()) else {
            warn!("MQTT event loop already started");
            return;
        };

        let cancel_token = self.cancel_token.clone();
        let handle = tokio::spawn(Self::drive(event_loop, cancel_token));
        if let Ok(mut guard) = self.task_handle.lock() {
            *guard = Some(handle);
        }
    }

    async fn stop(&self) {
        let handle = self.task_handle.lock().ok().and_then(|mut guard| guard.take());
        let Some(mut handle) = handle else {
            info!("No active MQTT event loop to stop.");
            return;
        };

        // Disconnect is queued behind pending publishes, so they flush first
        if let Err(e) = self.client.try_disconnect() {
            warn!("Failed to queue MQTT disconnect: {}", e);
        }

        if tokio::time::timeout(STOP_GRACE_PERIOD, &mut handle).await.is_err() {
            info!("MQTT event loop did not finish in time, cancelling it.");
            self.cancel_token.cancel();
            if let Err(e) = handle.await {
                error!("MQTT event loop finished with an unexpected join error: {:?}", e);
            }
        }
    }
}
