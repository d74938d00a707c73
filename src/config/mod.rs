pub mod device_config;
pub mod mqtt_config;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::config::device_config::DeviceConfig;
use crate::config::mqtt_config::MqttConfig;
use crate::error::ConfigError;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_FILE_ENV: &str = "BRIDGE_CONFIG";

pub const ENV_DEVICE: &str = "DEVICE";
pub const ENV_MQTT_HOST: &str = "MQTT_HOST";
pub const ENV_MQTT_PORT: &str = "MQTT_PORT";
pub const ENV_MQTT_USER: &str = "MQTT_USER";
pub const ENV_MQTT_PASS: &str = "MQTT_PASS";
pub const ENV_MQTT_PREFIX: &str = "MQTT_PREFIX";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub device: DeviceConfig,
    pub mqtt: MqttConfig,
}

impl BridgeConfig {
    /// Loads the config from the optional JSON file, then applies environment overrides.
    pub async fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) if !path.is_empty() => Self::load_file(&path).await?,
            _ => Self::default(),
        };
        let config = base.with_overrides(|key| std::env::var(key).ok())?;

        if config.mqtt.is_enabled() {
            info!(
                "Publishing to mqtt://{}:{} under {:?}",
                config.mqtt.host, config.mqtt.port, config.mqtt.topic_prefix
            );
        } else {
            warn!("No MQTT host configured, readings will not be published.");
        }
        Ok(config)
    }

    /// Reads a JSON config file. Missing keys fall back to defaults.
    pub async fn load_file(path: &str) -> Result<Self, ConfigError> {
        let config_json = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_string(),
                source,
            })?;
        let config = Self::from_json(path, &config_json)?;
        info!("Config loaded from {:?}", path);
        Ok(config)
    }

    fn from_json(path: &str, config_json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(config_json).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Applies overrides looked up by environment variable name.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(address) = lookup(ENV_DEVICE) {
            self.device.address = address;
        }
        if let Some(host) = lookup(ENV_MQTT_HOST) {
            self.mqtt.host = host;
        }
        if let Some(port) = lookup(ENV_MQTT_PORT) {
            self.mqtt.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_MQTT_PORT,
                value: port.clone(),
            })?;
        }
        if let Some(username) = lookup(ENV_MQTT_USER) {
            self.mqtt.username = username;
        }
        if let Some(password) = lookup(ENV_MQTT_PASS) {
            self.mqtt.password = password;
        }
        if let Some(prefix) = lookup(ENV_MQTT_PREFIX) {
            self.mqtt.topic_prefix = prefix;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::device_config::DEFAULT_DEVICE_ADDRESS;
    use crate::config::mqtt_config::{DEFAULT_MQTT_PORT, DEFAULT_TOPIC_PREFIX};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_leave_publisher_disabled() {
        let config = BridgeConfig::default().with_overrides(env(&[])).unwrap();
        assert_eq!(config.device.address, DEFAULT_DEVICE_ADDRESS);
        assert_eq!(config.mqtt.port, DEFAULT_MQTT_PORT);
        assert_eq!(config.mqtt.topic_prefix, DEFAULT_TOPIC_PREFIX);
        assert!(!config.mqtt.is_enabled());
    }

    #[test]
    fn environment_overrides_every_field() {
        let config = BridgeConfig::default()
            .with_overrides(env(&[
                ("DEVICE", "11:22:33:44:55:66"),
                ("MQTT_HOST", "broker.local"),
                ("MQTT_PORT", "8883"),
                ("MQTT_USER", "pulse"),
                ("MQTT_PASS", "secret"),
                ("MQTT_PREFIX", "home/hrm"),
            ]))
            .unwrap();

        assert_eq!(config.device.address, "11:22:33:44:55:66");
        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.username, "pulse");
        assert_eq!(config.mqtt.password, "secret");
        assert_eq!(config.mqtt.topic_prefix, "home/hrm");
        assert!(config.mqtt.is_enabled());
    }

    #[test]
    fn empty_host_disables_publisher() {
        let config = BridgeConfig::default()
            .with_overrides(env(&[("MQTT_HOST", "")]))
            .unwrap();
        assert!(!config.mqtt.is_enabled());
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = BridgeConfig::default()
            .with_overrides(env(&[("MQTT_PORT", "eighteen")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: ENV_MQTT_PORT, .. }
        ));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = BridgeConfig::from_json(
            "bridge.json",
            r#"{ "mqtt": { "host": "10.0.0.2", "topic_prefix": "strap" } }"#,
        )
        .unwrap();

        assert_eq!(config.device, DeviceConfig::default());
        assert_eq!(config.mqtt.host, "10.0.0.2");
        assert_eq!(config.mqtt.topic_prefix, "strap");
        assert_eq!(config.mqtt.port, DEFAULT_MQTT_PORT);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = BridgeConfig::from_json("bridge.json", "{ device: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let err = BridgeConfig::load_file("/nonexistent/streampulse/bridge.json")
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
