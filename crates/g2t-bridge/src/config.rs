//! Bridge configuration, loadable from TOML with secrets from the environment.

use serde::Deserialize;
use thiserror::Error;

use g2t_mqtt_channel::MqttConfig;
use g2t_owner_api::OwnerApiConfig;

use crate::controller::WakeConfig;
use crate::mqtt_loop::ReconnectConfig;
use crate::scheduler::PreWakeupConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration for the bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// VIN of the vehicle to wake.
    pub vin: String,
    /// Token file path. Overridable with `TOKEN_FILE`.
    #[serde(default = "default_token_file")]
    pub token_file: String,
    pub mqtt: MqttConfig,
    pub charger: ChargerConfig,
    #[serde(default)]
    pub tesla: OwnerApiConfig,
    #[serde(default)]
    pub wake: WakeConfig,
    /// Daily pre-wakeup. Absent disables the scheduler.
    #[serde(default)]
    pub pre_wakeup: Option<PreWakeupConfig>,
    #[serde(default)]
    pub notifier: Option<NotifierConfig>,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargerConfig {
    /// Status topic, e.g. `go-eCharger/012345/status`.
    pub topic: String,
}

/// Where failure notifications go. Both sinks may be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub mqtt_topic: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

fn default_token_file() -> String {
    "/var/lib/goe2tesla/token.json".to_string()
}

impl BridgeConfig {
    /// Load from a TOML file, apply environment overrides and validate.
    pub fn from_file(path: &str) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let mut config: Self = toml::from_str(&contents)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overwrite secrets with values from `lookup` (the environment in
    /// production). Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("TESLA_EMAIL") {
            self.tesla.email = v;
        }
        if let Some(v) = get("TESLA_PASSWORD") {
            self.tesla.password = v;
        }
        if let Some(v) = get("TESLA_CLIENT_ID") {
            self.tesla.client_id = v;
        }
        if let Some(v) = get("TESLA_CLIENT_SECRET") {
            self.tesla.client_secret = v;
        }
        if let Some(v) = get("MQTT_USERNAME") {
            self.mqtt.username = Some(v);
        }
        if let Some(v) = get("MQTT_PASSWORD") {
            self.mqtt.password = Some(v);
        }
        if let Some(v) = get("TOKEN_FILE") {
            self.token_file = v;
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let required = [
            ("vin", &self.vin),
            ("charger.topic", &self.charger.topic),
            ("tesla.email", &self.tesla.email),
            ("tesla.password", &self.tesla.password),
            ("tesla.client_id", &self.tesla.client_id),
            ("tesla.client_secret", &self.tesla.client_secret),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("{name} must be set")));
        }

        if self.wake.max_wake_attempts == 0 {
            return Err(ConfigError::Invalid(
                "wake.max_wake_attempts must be at least 1".into(),
            ));
        }

        if let Some(pre) = &self.pre_wakeup {
            pre.at().map_err(|e| {
                ConfigError::Invalid(format!("pre_wakeup.time {:?}: {e}", pre.time))
            })?;
        }

        if self.reconnect.initial_backoff_secs == 0
            || self.reconnect.max_backoff_secs < self.reconnect.initial_backoff_secs
        {
            return Err(ConfigError::Invalid(
                "reconnect backoff must satisfy 0 < initial_backoff_secs <= max_backoff_secs".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r#"
vin = "5YJ3E1EA0KF000001"

[mqtt]
broker_host = "mqtt.local"

[charger]
topic = "go-eCharger/012345/status"

[tesla]
email = "owner@example.com"
password = "hunter2"
client_id = "cid"
client_secret = "csecret"
"#;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn deserialize_minimal_config() {
        let config: BridgeConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.vin, "5YJ3E1EA0KF000001");
        assert_eq!(config.token_file, "/var/lib/goe2tesla/token.json");
        assert_eq!(config.mqtt.broker_port, 1883);
        assert_eq!(config.tesla.base_url, "https://owner-api.teslamotors.com");
        assert_eq!(config.wake.max_wake_attempts, 3);
        assert_eq!(config.wake.settle_secs, 60);
        assert_eq!(config.reconnect.max_backoff_secs, 60);
        assert!(config.reconnect.max_attempts.is_none());
        assert!(config.pre_wakeup.is_none());
        assert!(config.notifier.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn deserialize_full_config() {
        let toml = format!(
            r#"{MINIMAL}
[wake]
max_wake_attempts = 5
settle_secs = 45
auth_cooldown_secs = 10
max_auth_retries = 2

[pre_wakeup]
time = "06:30"

[notifier]
mqtt_topic = "goe2tesla/notify"
webhook_url = "https://hooks.example.com/abc"

[reconnect]
initial_backoff_secs = 2
max_backoff_secs = 120
max_attempts = 50
"#
        );
        let config: BridgeConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config.wake.max_wake_attempts, 5);
        assert_eq!(config.wake.max_auth_retries, 2);
        assert_eq!(config.pre_wakeup.as_ref().unwrap().time, "06:30");
        let notifier = config.notifier.as_ref().unwrap();
        assert_eq!(notifier.mqtt_topic.as_deref(), Some("goe2tesla/notify"));
        assert!(notifier.webhook_url.is_some());
        assert_eq!(config.reconnect.max_attempts, Some(50));
        config.validate().unwrap();
    }

    #[test]
    fn env_overrides_secrets() {
        let mut config: BridgeConfig = toml::from_str(MINIMAL).unwrap();
        config.apply_overrides(env(&[
            ("TESLA_PASSWORD", "from-env"),
            ("TESLA_CLIENT_SECRET", "secret-env"),
            ("MQTT_USERNAME", "bridge"),
            ("MQTT_PASSWORD", "mqtt-pw"),
            ("TOKEN_FILE", "/tmp/token.json"),
            ("TESLA_EMAIL", ""),
        ]));
        assert_eq!(config.tesla.password, "from-env");
        assert_eq!(config.tesla.client_secret, "secret-env");
        assert_eq!(config.tesla.email, "owner@example.com");
        assert_eq!(config.mqtt.username.as_deref(), Some("bridge"));
        assert_eq!(config.mqtt.password.as_deref(), Some("mqtt-pw"));
        assert_eq!(config.token_file, "/tmp/token.json");
    }

    #[test]
    fn secrets_may_come_only_from_env() {
        let toml = r#"
vin = "5YJ3E1EA0KF000001"
[mqtt]
broker_host = "mqtt.local"
[charger]
topic = "go-eCharger/012345/status"
"#;
        let mut config: BridgeConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());

        config.apply_overrides(env(&[
            ("TESLA_EMAIL", "owner@example.com"),
            ("TESLA_PASSWORD", "pw"),
            ("TESLA_CLIENT_ID", "cid"),
            ("TESLA_CLIENT_SECRET", "cs"),
        ]));
        config.validate().unwrap();
    }

    #[test]
    fn missing_secret_is_named() {
        let mut config: BridgeConfig = toml::from_str(MINIMAL).unwrap();
        config.tesla.client_secret.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tesla.client_secret"));
    }

    #[test]
    fn rejects_bad_pre_wakeup_time() {
        let toml = format!("{MINIMAL}\n[pre_wakeup]\ntime = \"6.30am\"\n");
        let config: BridgeConfig = toml::from_str(&toml).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_zero_wake_attempts() {
        let mut config: BridgeConfig = toml::from_str(MINIMAL).unwrap();
        config.wake.max_wake_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = BridgeConfig::from_file("/nonexistent/goe2tesla.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
