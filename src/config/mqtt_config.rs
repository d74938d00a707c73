use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MQTT_PORT: u16 = 1883;
pub const DEFAULT_TOPIC_PREFIX: &str = "streampulse";
pub const DEFAULT_CLIENT_ID: &str = "streampulse";
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker host. Empty disables publishing altogether.
    pub host: String,

    pub port: u16,

    /// Credentials are only sent when the user name is non-empty.
    pub username: String,

    pub password: String,

    pub topic_prefix: String,

    pub client_id: String,

    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        MqttConfig {
            host: String::new(),
            port: DEFAULT_MQTT_PORT,
            username: String::new(),
            password: String::new(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            keep_alive_secs: DEFAULT_KEEP_ALIVE_SECS,
        }
    }
}

impl MqttConfig {
    pub fn is_enabled(&self) -> bool {
        !self.host.is_empty()
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}
