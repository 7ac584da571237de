use serde::Deserialize;

/// MQTT broker connection configuration, loadable from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    /// MQTT broker hostname.
    pub broker_host: String,
    /// MQTT broker port (default 1883, use 8883 with TLS).
    #[serde(default = "default_port")]
    pub broker_port: u16,
    /// MQTT client ID.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Broker username. Overridable with `MQTT_USERNAME`.
    #[serde(default)]
    pub username: Option<String>,
    /// Broker password. Overridable with `MQTT_PASSWORD`.
    #[serde(default)]
    pub password: Option<String>,
    /// Enable TLS. When false, connects plaintext.
    #[serde(default)]
    pub use_tls: bool,
    /// Path to the CA certificate (PEM), required with TLS.
    #[serde(default)]
    pub ca_cert_path: String,
    /// Optional client certificate (PEM) for mutual TLS.
    #[serde(default)]
    pub client_cert_path: Option<String>,
    /// Optional client private key (PEM) for mutual TLS.
    #[serde(default)]
    pub client_key_path: Option<String>,
    /// Keep-alive interval in seconds.
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u16,
}

fn default_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "goe2tesla".to_string()
}

fn default_keepalive() -> u16 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_minimal() {
        let config: MqttConfig = toml::from_str(r#"broker_host = "mqtt.local""#).unwrap();
        assert_eq!(config.broker_host, "mqtt.local");
        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.client_id, "goe2tesla");
        assert!(!config.use_tls);
        assert!(config.username.is_none());
        assert_eq!(config.keepalive_secs, 30);
    }

    #[test]
    fn deserialize_tls_with_credentials() {
        let config: MqttConfig = toml::from_str(
            r#"
broker_host = "broker.example.com"
broker_port = 8883
username = "bridge"
password = "hunter2"
use_tls = true
ca_cert_path = "/etc/goe2tesla/ca.pem"
"#,
        )
        .unwrap();
        assert!(config.use_tls);
        assert_eq!(config.username.as_deref(), Some("bridge"));
        assert!(config.client_cert_path.is_none());
    }
}
