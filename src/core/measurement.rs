//! Measurement transforms and handlers
//! This module turns raw battery and heart-rate payloads into values and publishes them.

use std::sync::Arc;

use log::{debug, warn};

use crate::core::bluetooth::{
    Subscription, HEART_RATE_VALUE_FORMAT_U16, UUID_BATTERY_LEVEL, UUID_BATTERY_SERVICE,
    UUID_HEART_RATE_MEASUREMENT, UUID_HEART_RATE_SERVICE,
};
use crate::publisher::{Publisher, TopicPublisher, BATTERY_TOPIC, HEART_RATE_TOPIC};

/// Battery level in percent: byte 0 of the Battery Level characteristic.
pub fn battery_level(data: &[u8]) -> Option<u8> {
    data.first().copied()
}

/// Heart rate in BPM: byte 1 of the Heart Rate Measurement characteristic.
///
/// Byte 0 holds the measurement flags and is not interpreted. A sensor that
/// sets the 16-bit value format flag will have only the low byte reported.
pub fn heart_rate(data: &[u8]) -> Option<u8> {
    data.get(1).copied()
}

/// Whether the measurement flags declare a 16-bit heart-rate value.
pub fn has_u16_heart_rate(data: &[u8]) -> bool {
    data.first()
        .is_some_and(|flags| flags & HEART_RATE_VALUE_FORMAT_U16 != 0)
}

pub fn handle_battery<P: Publisher>(publisher: &TopicPublisher<P>, level: u8) {
    debug!("Battery Level: {}", level);
    publisher.send(BATTERY_TOPIC, level, true);
}

pub fn handle_heart_rate<P: Publisher>(publisher: &TopicPublisher<P>, rate: u8) {
    debug!("Heart Rate: {}", rate);
    publisher.send(HEART_RATE_TOPIC, rate, false);
}

/// Battery level subscription, primed with an initial read
pub fn battery_subscription<P: Publisher + 'static>(publisher: Arc<TopicPublisher<P>>) -> Subscription {
    Subscription::new(
        UUID_BATTERY_SERVICE,
        UUID_BATTERY_LEVEL,
        Box::new(battery_level),
        Box::new(move |level| handle_battery(&publisher, level)),
        true,
    )
}

/// Heart rate subscription, notification-driven only.
///
/// Warns once per subscription when the sensor switches to 16-bit values.
pub fn heart_rate_subscription<P: Publisher + 'static>(
    publisher: Arc<TopicPublisher<P>>,
) -> Subscription {
    let mut format_warned = false;
    Subscription::new(
        UUID_HEART_RATE_SERVICE,
        UUID_HEART_RATE_MEASUREMENT,
        Box::new(move |data: &[u8]| {
            if !format_warned && has_u16_heart_rate(data) {
                warn!("Heart rate sensor reports 16-bit values, only the low byte is published");
                format_warned = true;
            }
            heart_rate(data)
        }),
        Box::new(move |rate| handle_heart_rate(&publisher, rate)),
        false,
    )
}
