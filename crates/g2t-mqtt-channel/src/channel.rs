//! MQTT channel: async client for the charger's broker.
//!
//! Wraps `rumqttc::AsyncClient` with the two operations the bridge needs:
//! subscribing to the charger status topic and publishing plain-text
//! notifications.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};

use crate::config::MqttConfig;
use crate::error::{MqttError, MqttResult};
use crate::tls;

// ── Channel trait ─────────────────────────────────────────────

/// Abstraction for MQTT message publishing and subscribing.
///
/// Enables mocking in tests without a real MQTT broker.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Publish a raw payload to a topic.
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<()>;

    /// Queue a subscription without waiting for space in the request
    /// queue. Fails immediately when the queue is full.
    fn try_subscribe(&self, filter: &str, qos: QoS) -> MqttResult<()>;

    /// Publish a UTF-8 text message (notifications).
    async fn publish_text(&self, topic: &str, text: &str) -> MqttResult<()> {
        self.publish(topic, text.as_bytes(), QoS::AtLeastOnce).await
    }
}

#[async_trait]
impl<C: Channel + ?Sized> Channel for std::sync::Arc<C> {
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<()> {
        (**self).publish(topic, payload, qos).await
    }

    fn try_subscribe(&self, filter: &str, qos: QoS) -> MqttResult<()> {
        (**self).try_subscribe(filter, qos)
    }
}

// ── MqttChannel ───────────────────────────────────────────────

/// MQTT channel connected to the charger's broker.
///
/// Owns the `AsyncClient` for publishing/subscribing. The `EventLoop`
/// is returned separately from `new()`; the caller must drive it with
/// `eventloop.poll()`, which also performs reconnects.
#[derive(Clone)]
pub struct MqttChannel {
    client: AsyncClient,
}

impl MqttChannel {
    /// Create a channel from config. TLS is used when `use_tls` is set,
    /// credentials when `username` is set.
    pub fn new(config: &MqttConfig) -> MqttResult<(Self, EventLoop)> {
        let mut options =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(config.keepalive_secs.into()));
        options.set_clean_session(true);

        if let Some(username) = &config.username {
            options.set_credentials(
                username.clone(),
                config.password.clone().unwrap_or_default(),
            );
        }

        if config.use_tls {
            options.set_transport(tls::load_tls_transport(config)?);
        }

        tracing::debug!(
            host = %config.broker_host,
            port = config.broker_port,
            tls = config.use_tls,
            client_id = %config.client_id,
            "MQTT options prepared"
        );

        let (client, eventloop) = AsyncClient::new(options, 64);
        Ok((Self { client }, eventloop))
    }
}

#[async_trait]
impl Channel for MqttChannel {
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<()> {
        self.client
            .publish(topic, qos, false, payload)
            .await
            .map_err(|e| MqttError::Publish(e.to_string()))
    }

    fn try_subscribe(&self, filter: &str, qos: QoS) -> MqttResult<()> {
        self.client
            .try_subscribe(filter, qos)
            .map_err(|e| MqttError::Subscribe(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plaintext_config() -> MqttConfig {
        MqttConfig {
            broker_host: "localhost".into(),
            broker_port: 1883,
            client_id: "goe2tesla-test".into(),
            username: Some("bridge".into()),
            password: None,
            use_tls: false,
            ca_cert_path: String::new(),
            client_cert_path: None,
            client_key_path: None,
            keepalive_secs: 30,
        }
    }

    #[tokio::test]
    async fn plaintext_channel_builds_without_broker() {
        let (channel, _eventloop) = MqttChannel::new(&plaintext_config()).unwrap();
        // Requests are queued until the event loop is polled.
        channel
            .try_subscribe("go-eCharger/000001/status", QoS::AtMostOnce)
            .unwrap();
        channel.publish_text("goe2tesla/notify", "hello").await.unwrap();
    }

    #[tokio::test]
    async fn try_subscribe_fails_fast_on_full_queue() {
        let (channel, _eventloop) = MqttChannel::new(&plaintext_config()).unwrap();
        for n in 0..64 {
            channel
                .publish_text("goe2tesla/notify", &format!("queued {n}"))
                .await
                .unwrap();
        }
        assert!(matches!(
            channel.try_subscribe("go-eCharger/000001/status", QoS::AtMostOnce),
            Err(MqttError::Subscribe(_))
        ));
    }

    #[test]
    fn tls_channel_requires_ca_cert() {
        let mut config = plaintext_config();
        config.use_tls = true;
        config.ca_cert_path = "/nonexistent/ca.pem".into();
        assert!(matches!(MqttChannel::new(&config), Err(MqttError::Tls(_))));
    }
}
