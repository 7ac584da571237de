//! TLS configuration for broker connections.
//!
//! Loads the CA certificate and, when both paths are configured, a client
//! certificate/key pair for mutual TLS.

use rumqttc::{TlsConfiguration, Transport};

use crate::config::MqttConfig;
use crate::error::{MqttError, MqttResult};

/// Build a TLS transport from certificate file paths in the config.
pub fn load_tls_transport(config: &MqttConfig) -> MqttResult<Transport> {
    let ca = std::fs::read(&config.ca_cert_path).map_err(|e| {
        MqttError::Tls(format!(
            "failed to read CA cert '{}': {e}",
            config.ca_cert_path
        ))
    })?;

    let client_auth = match (&config.client_cert_path, &config.client_key_path) {
        (Some(cert_path), Some(key_path)) => {
            let cert = std::fs::read(cert_path).map_err(|e| {
                MqttError::Tls(format!("failed to read client cert '{cert_path}': {e}"))
            })?;
            let key = std::fs::read(key_path).map_err(|e| {
                MqttError::Tls(format!("failed to read client key '{key_path}': {e}"))
            })?;
            Some((cert, key))
        }
        (None, None) => None,
        _ => {
            return Err(MqttError::Tls(
                "client_cert_path and client_key_path must be set together".into(),
            ));
        }
    };

    Ok(Transport::tls_with_config(TlsConfiguration::Simple {
        ca,
        alpn: None,
        client_auth,
    }))
}
