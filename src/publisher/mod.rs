//! Publishing of readings and bridge status
//! This module defines the publisher capability and the topic layout built on top of it.

mod mqtt;

pub use mqtt::MqttPublisher;

use async_trait::async_trait;

/// Topic suffix carrying the bridge's connection status.
pub const CONNECTED_TOPIC: &str = "connected";
/// Topic suffix carrying the battery level in percent.
pub const BATTERY_TOPIC: &str = "battery";
/// Topic suffix carrying the heart rate in BPM.
pub const HEART_RATE_TOPIC: &str = "heart_rate";

/// Fire-and-forget message sink.
///
/// `publish` must never block the caller; delivery (QoS 1) and buffering are
/// the implementation's concern.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Queue a message for delivery
    fn publish(&self, topic: &str, payload: String, retain: bool);

    /// Start the background network processing
    fn start(&self);

    /// Stop the background network processing
    async fn stop(&self);
}

/// Joins `prefix` and `topic` the way every published topic is laid out.
pub fn full_topic(prefix: &str, topic: &str) -> String {
    [prefix, topic].join("/")
}

/// Applies the topic prefix and silently drops everything when no publisher is configured.
pub struct TopicPublisher<P: Publisher> {
    prefix: String,
    inner: Option<P>,
}

impl<P: Publisher> TopicPublisher<P> {
    pub fn new(prefix: impl Into<String>, inner: Option<P>) -> Self {
        Self {
            prefix: prefix.into(),
            inner,
        }
    }

    /// A publisher that drops every message.
    pub fn disabled(prefix: impl Into<String>) -> Self {
        Self::new(prefix, None)
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn inner(&self) -> Option<&P> {
        self.inner.as_ref()
    }

    pub fn send(&self, topic: &str, payload: impl ToString, retain: bool) {
        let Some(inner) = self.inner.as_ref() else {
            return;
        };
        inner.publish(&full_topic(&self.prefix, topic), payload.to_string(), retain);
    }

    /// Connection status is always retained.
    pub fn send_connected(&self, connected: bool) {
        self.send(CONNECTED_TOPIC, connected, true);
    }

    pub fn start(&self) {
        if let Some(inner) = self.inner.as_ref() {
            inner.start();
        }
    }

    pub async fn stop(&self) {
        if let Some(inner) = self.inner.as_ref() {
            inner.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        messages: Mutex<Vec<(String, String, bool)>>,
        started: Mutex<u32>,
        stopped: Mutex<u32>,
    }

    #[async_trait]
    impl Publisher for Recorder {
        fn publish(&self, topic: &str, payload: String, retain: bool) {
            self.messages
                .lock()
                .unwrap()
                .push((topic.to_string(), payload, retain));
        }

        fn start(&self) {
            *self.started.lock().unwrap() += 1;
        }

        async fn stop(&self) {
            *self.stopped.lock().unwrap() += 1;
        }
    }

    #[test]
    fn topics_are_prefixed() {
        assert_eq!(full_topic("streampulse", BATTERY_TOPIC), "streampulse/battery");
        assert_eq!(full_topic("home/hrm", HEART_RATE_TOPIC), "home/hrm/heart_rate");
    }

    #[test]
    fn sends_through_inner_publisher() {
        let publisher = TopicPublisher::new("pulse", Some(Recorder::default()));
        publisher.send(HEART_RATE_TOPIC, 64u8, false);
        publisher.send_connected(true);

        let messages = publisher.inner().unwrap().messages.lock().unwrap().clone();
        assert_eq!(
            messages,
            vec![
                ("pulse/heart_rate".to_string(), "64".to_string(), false),
                ("pulse/connected".to_string(), "true".to_string(), true),
            ]
        );
    }

    #[tokio::test]
    async fn disabled_publisher_is_a_no_op() {
        let publisher: TopicPublisher<Recorder> = TopicPublisher::disabled("pulse");
        assert!(!publisher.is_enabled());

        publisher.start();
        publisher.send_connected(false);
        publisher.stop().await;

        assert!(publisher.inner().is_none());
    }

    #[tokio::test]
    async fn start_and_stop_are_forwarded() {
        let publisher = TopicPublisher::new("pulse", Some(Recorder::default()));
        publisher.start();
        publisher.stop().await;

        let inner = publisher.inner().unwrap();
        assert_eq!(*inner.started.lock().unwrap(), 1);
        assert_eq!(*inner.stopped.lock().unwrap(), 1);
    }
}
